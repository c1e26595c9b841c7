use async_trait::async_trait;

use keyshare_types::{
    DeviceId, EncryptedKeyGrant, OrganizationId, OrganizationRecord, SessionToken, UserId,
    UserRecord,
};

use crate::error::DirectoryError;

/// The remote directory that stores public keys and encrypted grants.
///
/// Every mutating call returns the record as it stands after the write, so
/// callers continue from directory state rather than patching local copies.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn fetch_user(&self, token: &SessionToken) -> Result<UserRecord, DirectoryError>;

    /// Register this device along with its own encrypted copy of the user key.
    async fn register_device(
        &self,
        token: &SessionToken,
        device_public_key: &str,
        user_private_key_encrypted: &str,
    ) -> Result<UserRecord, DirectoryError>;

    /// `None` when the device has not published a public key.
    async fn fetch_device_public_key(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
    ) -> Result<Option<String>, DirectoryError>;

    async fn push_device_key_grant(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
        grant: &EncryptedKeyGrant,
    ) -> Result<UserRecord, DirectoryError>;

    async fn fetch_organization(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
    ) -> Result<OrganizationRecord, DirectoryError>;

    async fn push_organization_bootstrap(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        public_key: &str,
        private_key_encrypted: &str,
    ) -> Result<OrganizationRecord, DirectoryError>;

    async fn push_organization_user_public_key(
        &self,
        token: &SessionToken,
        public_key: &str,
    ) -> Result<UserRecord, DirectoryError>;

    async fn push_org_key_grant(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        member_id: &UserId,
        grant: &EncryptedKeyGrant,
    ) -> Result<OrganizationRecord, DirectoryError>;
}

#[async_trait]
impl<'a, T: DirectoryClient + ?Sized> DirectoryClient for &'a T {
    async fn fetch_user(&self, token: &SessionToken) -> Result<UserRecord, DirectoryError> {
        (**self).fetch_user(token).await
    }

    async fn register_device(
        &self,
        token: &SessionToken,
        device_public_key: &str,
        user_private_key_encrypted: &str,
    ) -> Result<UserRecord, DirectoryError> {
        (**self)
            .register_device(token, device_public_key, user_private_key_encrypted)
            .await
    }

    async fn fetch_device_public_key(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
    ) -> Result<Option<String>, DirectoryError> {
        (**self).fetch_device_public_key(token, device_id).await
    }

    async fn push_device_key_grant(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
        grant: &EncryptedKeyGrant,
    ) -> Result<UserRecord, DirectoryError> {
        (**self).push_device_key_grant(token, device_id, grant).await
    }

    async fn fetch_organization(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
    ) -> Result<OrganizationRecord, DirectoryError> {
        (**self).fetch_organization(token, org_id).await
    }

    async fn push_organization_bootstrap(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        public_key: &str,
        private_key_encrypted: &str,
    ) -> Result<OrganizationRecord, DirectoryError> {
        (**self)
            .push_organization_bootstrap(token, org_id, public_key, private_key_encrypted)
            .await
    }

    async fn push_organization_user_public_key(
        &self,
        token: &SessionToken,
        public_key: &str,
    ) -> Result<UserRecord, DirectoryError> {
        (**self).push_organization_user_public_key(token, public_key).await
    }

    async fn push_org_key_grant(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        member_id: &UserId,
        grant: &EncryptedKeyGrant,
    ) -> Result<OrganizationRecord, DirectoryError> {
        (**self).push_org_key_grant(token, org_id, member_id, grant).await
    }
}
