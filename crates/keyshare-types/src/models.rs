use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Directory-assigned user identifier.
    UserId
);
string_id!(
    /// Directory-assigned device identifier.
    DeviceId
);
string_id!(
    /// Directory-assigned organization identifier.
    OrganizationId
);

/// Opaque bearer token for the current session. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Current algorithm version for grants produced by this crate family.
pub const GRANT_ALGORITHM_VERSION: u8 = 1;

// -- User --

/// A device as listed on the user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: DeviceId,
    #[serde(default)]
    pub public_key: Option<String>,
    /// True once the directory holds a copy of the user private key for this device.
    #[serde(default)]
    pub user_key_granted: bool,
}

/// The user as the directory reports it. Never carries a plaintext private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub emergency_kit_generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub organization_ids: Vec<OrganizationId>,
}

impl UserRecord {
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| d.id.clone()).collect()
    }

    /// Devices the directory reports as lacking an encrypted copy of the user key.
    pub fn devices_missing_user_key(&self) -> Vec<DeviceId> {
        self.devices
            .iter()
            .filter(|d| !d.user_key_granted)
            .map(|d| d.id.clone())
            .collect()
    }

    pub fn has_device_public_key(&self, public_key: &str) -> bool {
        self.devices
            .iter()
            .any(|d| d.public_key.as_deref() == Some(public_key))
    }
}

// -- Organization --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub public_key: Option<String>,
    /// True once the directory holds a copy of the org private key for this member.
    #[serde(default)]
    pub org_key_granted: bool,
}

impl MemberEntry {
    pub fn published_public_key(&self) -> Option<&str> {
        self.public_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// The organization as seen by the requesting user.
///
/// `private_key_encrypted` is the org private key encrypted under the
/// requesting user's public key, so it differs per caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: OrganizationId,
    pub slug: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub private_key_encrypted: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

impl OrganizationRecord {
    pub fn published_public_key(&self) -> Option<&str> {
        self.public_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn private_key_encrypted(&self) -> Option<&str> {
        self.private_key_encrypted.as_deref().filter(|k| !k.is_empty())
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    pub fn member(&self, user_id: &UserId) -> Option<&MemberEntry> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    /// Members the directory reports as lacking an encrypted copy of the org key.
    pub fn members_missing_org_key(&self) -> Vec<&MemberEntry> {
        self.members.iter().filter(|m| !m.org_key_granted).collect()
    }
}

// -- Grants --

/// An encrypted copy of a private key addressed to exactly one public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyGrant {
    pub recipient_public_key: String,
    pub ciphertext: String,
    pub algorithm_version: u8,
}

impl EncryptedKeyGrant {
    pub fn new(recipient_public_key: impl Into<String>, ciphertext: impl Into<String>) -> Self {
        Self {
            recipient_public_key: recipient_public_key.into(),
            ciphertext: ciphertext.into(),
            algorithm_version: GRANT_ALGORITHM_VERSION,
        }
    }
}

// -- Summary --

/// A teammate who could not receive the org key yet because they have
/// never published a public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMember {
    pub organization_slug: String,
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub username: String,
    pub emergency_kit_generated_at: Option<DateTime<Utc>>,
    pub organization_slugs: Vec<String>,
    pub selected_organization: OrganizationId,
    pub pending_members: Vec<PendingMember>,
}
