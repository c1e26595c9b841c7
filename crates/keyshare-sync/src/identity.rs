use keyshare_crypto::KeyPairHex;
use keyshare_types::{OrganizationId, SessionToken};

use crate::error::IdentityError;

/// Local session and key state for the machine running the sync.
///
/// `user_keys` hands out the user private key only after it has been
/// decrypted locally; it lives in memory for the duration of a run.
pub trait LocalIdentity: Send + Sync {
    fn current_token(&self) -> Result<SessionToken, IdentityError>;

    fn current_organization_selection(&self) -> Result<Option<OrganizationId>, IdentityError>;

    fn select_organization(&self, org_id: &OrganizationId) -> Result<(), IdentityError>;

    fn device_keys(&self) -> Result<KeyPairHex, IdentityError>;

    fn user_keys(&self) -> Result<KeyPairHex, IdentityError>;
}
