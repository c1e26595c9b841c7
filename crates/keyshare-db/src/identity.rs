use anyhow::{Context, Result, bail};
use tracing::info;

use keyshare_crypto::{CryptoCapability, EciesCrypto, KeyPairHex, Zeroizing, secret_to_string};
use keyshare_sync::{IdentityError, LocalIdentity};
use keyshare_types::{OrganizationId, SessionToken};

use crate::Database;

impl Database {
    /// Generate this device's keypair unless one exists. Returns the device
    /// public key either way.
    pub fn init_device(&self) -> Result<String> {
        if let Some(device) = self.get_device()? {
            return Ok(device.public_key);
        }

        let keypair = EciesCrypto.generate_keypair();
        self.save_device_keys(&keypair.public_key, &keypair.private_key)?;
        info!(public_key = %keypair.public_key, "Generated device keypair");
        Ok(keypair.public_key)
    }

    /// Store the user private key sealed under this device's public key.
    /// Returns the matching user public key.
    pub fn import_user_key(&self, private_key_hex: &str) -> Result<String> {
        let private_key = private_key_hex.trim();
        let public_key = EciesCrypto
            .public_key_for(private_key)
            .context("not a valid user private key")?;

        let Some(device) = self.get_device()? else {
            bail!("this device has no keypair. run [keyshare device init] first");
        };

        let sealed = EciesCrypto.encrypt(private_key.as_bytes(), &device.public_key)?;
        self.save_user_key(&public_key, &sealed)?;
        info!(public_key = %public_key, "Imported user key");
        Ok(public_key)
    }
}

impl LocalIdentity for Database {
    fn current_token(&self) -> Result<SessionToken, IdentityError> {
        let session = self.get_session()?.ok_or(IdentityError::NotAuthenticated)?;
        Ok(SessionToken::new(session.token))
    }

    fn current_organization_selection(&self) -> Result<Option<OrganizationId>, IdentityError> {
        Ok(self
            .get_session()?
            .and_then(|s| s.organization_id)
            .map(OrganizationId::new))
    }

    fn select_organization(&self, org_id: &OrganizationId) -> Result<(), IdentityError> {
        Ok(self.set_organization(org_id.as_str())?)
    }

    fn device_keys(&self) -> Result<KeyPairHex, IdentityError> {
        let device = self.get_device()?.ok_or(IdentityError::MissingDeviceKeys)?;
        Ok(KeyPairHex {
            public_key: device.public_key,
            private_key: Zeroizing::new(device.private_key),
        })
    }

    fn user_keys(&self) -> Result<KeyPairHex, IdentityError> {
        let device = self.device_keys()?;
        let row = self.get_user_key()?.ok_or(IdentityError::MissingUserKeys)?;

        let raw = EciesCrypto
            .decrypt(&row.private_key_encrypted, &device.private_key)
            .context("stored user key does not open with this device key")?;
        let private_key = secret_to_string(raw).context("stored user key is not hex")?;

        Ok(KeyPairHex {
            public_key: row.public_key,
            private_key,
        })
    }
}
