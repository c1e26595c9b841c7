use serde::{Deserialize, Serialize};

use crate::models::EncryptedKeyGrant;

// -- Devices --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterDeviceRequest {
    pub public_key: String,
    /// User private key encrypted under `public_key`.
    pub user_private_key_encrypted: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DevicePublicKeyResponse {
    pub public_key: Option<String>,
}

// -- Grants --

/// Body for both device and organization key grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyGrantRequest {
    pub public_key: String,
    pub private_key_encrypted: String,
    pub version: u8,
}

impl From<&EncryptedKeyGrant> for KeyGrantRequest {
    fn from(grant: &EncryptedKeyGrant) -> Self {
        Self {
            public_key: grant.recipient_public_key.clone(),
            private_key_encrypted: grant.ciphertext.clone(),
            version: grant.algorithm_version,
        }
    }
}

impl From<KeyGrantRequest> for EncryptedKeyGrant {
    fn from(req: KeyGrantRequest) -> Self {
        Self {
            recipient_public_key: req.public_key,
            ciphertext: req.private_key_encrypted,
            algorithm_version: req.version,
        }
    }
}

// -- Organizations --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationBootstrapRequest {
    pub public_key: String,
    /// Org private key encrypted under the originator's public key.
    pub private_key_encrypted: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyRequest {
    pub public_key: String,
}
