use tracing::{debug, info, warn};

use keyshare_crypto::{CryptoCapability, EciesCrypto, KeyPairHex, Zeroizing, secret_to_string};
use keyshare_types::{
    EncryptedKeyGrant, MemberEntry, OrganizationId, OrganizationRecord, PendingMember,
    SessionToken, SyncSummary, UserRecord,
};

use crate::directory::DirectoryClient;
use crate::error::SyncError;
use crate::http::{HttpConfig, HttpDirectory};
use crate::identity::LocalIdentity;

/// Drives one key-distribution pass: this user's devices first, then every
/// organization the user belongs to, strictly one after another.
pub struct Orchestrator<D, C, I> {
    directory: D,
    crypto: C,
    identity: I,
}

impl<I: LocalIdentity> Orchestrator<HttpDirectory, EciesCrypto, I> {
    /// Production wiring: HTTP directory at `endpoint`, ECIES crypto.
    pub fn connect(endpoint: &str, identity: I) -> Result<Self, SyncError> {
        Self::connect_with(HttpConfig::new(endpoint), identity)
    }

    pub fn connect_with(config: HttpConfig, identity: I) -> Result<Self, SyncError> {
        let directory = HttpDirectory::new(config)?;
        Ok(Self::new(directory, EciesCrypto, identity))
    }
}

impl<D, C, I> Orchestrator<D, C, I>
where
    D: DirectoryClient,
    C: CryptoCapability,
    I: LocalIdentity,
{
    pub fn new(directory: D, crypto: C, identity: I) -> Self {
        Self { directory, crypto, identity }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let token = self.identity.current_token()?;
        let device_keys = self.identity.device_keys()?;
        let user_keys = self.identity.user_keys()?;

        self.crypto
            .verify_key_pair(&user_keys.public_key, &user_keys.private_key)
            .map_err(|_| SyncError::DecryptionFailed { subject: "user keypair".into() })?;

        let user = self.directory.fetch_user(&token).await?;
        debug!(username = %user.username, devices = user.devices.len(), "Fetched user record");

        let user = self.sync_user_public_key(&token, user, &user_keys).await?;
        let mut user = self.sync_devices(&token, user, &device_keys, &user_keys).await?;

        if user.organization_ids.is_empty() {
            return Err(SyncError::MissingOrganization { username: user.username });
        }

        let selected = match self.identity.current_organization_selection()? {
            Some(org_id) => org_id,
            None => user.organization_ids[0].clone(),
        };

        let mut slugs = Vec::with_capacity(user.organization_ids.len());
        let mut pending = Vec::new();
        for org_id in user.organization_ids.clone() {
            let org = self
                .sync_organization(&token, &mut user, &user_keys, &org_id, &mut pending)
                .await?;
            slugs.push(org.slug);
        }

        self.identity.select_organization(&selected)?;

        info!(
            username = %user.username,
            organizations = slugs.len(),
            pending = pending.len(),
            "Sync complete"
        );

        Ok(SyncSummary {
            username: user.username,
            emergency_kit_generated_at: user.emergency_kit_generated_at,
            organization_slugs: slugs,
            selected_organization: selected,
            pending_members: pending,
        })
    }

    /// Publish the user public key on first sync. A directory that already
    /// holds a different one means the local user key is stale.
    async fn sync_user_public_key(
        &self,
        token: &SessionToken,
        user: UserRecord,
        user_keys: &KeyPairHex,
    ) -> Result<UserRecord, SyncError> {
        let published = user.public_key.as_deref().filter(|k| !k.is_empty()).map(str::to_owned);

        match published {
            Some(key) if key == user_keys.public_key => Ok(user),
            Some(_) => Err(SyncError::UserKeyMismatch { username: user.username }),
            None => {
                let user = self
                    .directory
                    .push_organization_user_public_key(token, &user_keys.public_key)
                    .await?;
                info!(username = %user.username, "Published user public key");
                Ok(user)
            }
        }
    }

    /// Register this device if needed, then hand every other device that
    /// lacks one a copy of the user private key.
    async fn sync_devices(
        &self,
        token: &SessionToken,
        mut user: UserRecord,
        device_keys: &KeyPairHex,
        user_keys: &KeyPairHex,
    ) -> Result<UserRecord, SyncError> {
        if !user.has_device_public_key(&device_keys.public_key) {
            let encrypted = self
                .crypto
                .encrypt(user_keys.private_key.as_bytes(), &device_keys.public_key)?;
            user = self
                .directory
                .register_device(token, &device_keys.public_key, &encrypted)
                .await?;
            info!(username = %user.username, "Registered this device");
        }

        if user.devices.is_empty() {
            return Err(SyncError::MissingDevice { username: user.username });
        }

        for device_id in user.devices_missing_user_key() {
            let Some(public_key) = self.directory.fetch_device_public_key(token, &device_id).await?
            else {
                warn!(device_id = %device_id, "Device has no published public key, skipping");
                continue;
            };

            let grant = self.grant_for(user_keys.private_key.as_bytes(), &public_key)?;
            user = self
                .directory
                .push_device_key_grant(token, &device_id, &grant)
                .await?;
            info!(device_id = %device_id, "Pushed user key grant to device");
        }

        Ok(user)
    }

    async fn sync_organization(
        &self,
        token: &SessionToken,
        user: &mut UserRecord,
        user_keys: &KeyPairHex,
        org_id: &OrganizationId,
        pending: &mut Vec<PendingMember>,
    ) -> Result<OrganizationRecord, SyncError> {
        let mut org = self.directory.fetch_organization(token, org_id).await?;
        debug!(org = %org.slug, members = org.members.len(), "Fetched organization");

        if org.published_public_key().is_none() {
            org = self.bootstrap_organization(token, &org, user_keys).await?;

            let published = org
                .member(&user.id)
                .and_then(MemberEntry::published_public_key)
                .is_some_and(|k| k == user_keys.public_key);
            if !published {
                *user = self
                    .directory
                    .push_organization_user_public_key(token, &user_keys.public_key)
                    .await?;
                info!(org = %org.slug, "Published user public key");
            }
        }

        let Some(encrypted) = org.private_key_encrypted() else {
            return Err(SyncError::MissingOrganizationPrivateKey { slug: org.slug.clone() });
        };
        let Some(org_public_key) = org.published_public_key() else {
            return Err(SyncError::DecryptionFailed { subject: org.slug.clone() });
        };
        let org_private_key = self.unlock_organization(&org.slug, org_public_key, encrypted, user_keys)?;

        let missing: Vec<MemberEntry> = org.members_missing_org_key().into_iter().cloned().collect();
        for member in missing {
            let Some(public_key) = member.published_public_key() else {
                warn!(
                    org = %org.slug,
                    username = %member.username,
                    "Teammate has no public key yet. They need to run [keyshare sync]"
                );
                pending.push(PendingMember {
                    organization_slug: org.slug.clone(),
                    user_id: member.user_id.clone(),
                    username: member.username.clone(),
                });
                continue;
            };

            let grant = self.grant_for(org_private_key.as_bytes(), public_key)?;
            org = self
                .directory
                .push_org_key_grant(token, &org.id, &member.user_id, &grant)
                .await?;
            info!(org = %org.slug, username = %member.username, "Pushed organization key grant to teammate");
        }

        Ok(org)
    }

    /// First member in: generate the organization keypair and keep a copy
    /// sealed for ourselves.
    async fn bootstrap_organization(
        &self,
        token: &SessionToken,
        org: &OrganizationRecord,
        user_keys: &KeyPairHex,
    ) -> Result<OrganizationRecord, SyncError> {
        let keypair = self.crypto.generate_keypair();
        let encrypted = self
            .crypto
            .encrypt(keypair.private_key.as_bytes(), &user_keys.public_key)?;

        let org = self
            .directory
            .push_organization_bootstrap(token, &org.id, &keypair.public_key, &encrypted)
            .await?;
        info!(org = %org.slug, "Bootstrapped organization keypair");
        Ok(org)
    }

    /// Decrypt the organization private key and prove it pairs with the
    /// published public key before anything is encrypted with it.
    fn unlock_organization(
        &self,
        slug: &str,
        org_public_key: &str,
        encrypted: &str,
        user_keys: &KeyPairHex,
    ) -> Result<Zeroizing<String>, SyncError> {
        let failed = || SyncError::DecryptionFailed { subject: slug.to_string() };

        let raw = self
            .crypto
            .decrypt(encrypted, &user_keys.private_key)
            .map_err(|_| failed())?;
        let org_private_key = secret_to_string(raw).map_err(|_| failed())?;

        self.crypto
            .verify_key_pair(org_public_key, &org_private_key)
            .map_err(|_| failed())?;

        Ok(org_private_key)
    }

    fn grant_for(&self, private_key: &[u8], recipient_public_key: &str) -> Result<EncryptedKeyGrant, SyncError> {
        let ciphertext = self.crypto.encrypt(private_key, recipient_public_key)?;
        Ok(EncryptedKeyGrant::new(recipient_public_key, ciphertext))
    }
}
