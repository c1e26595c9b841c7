use keyshare_crypto::CryptoError;
use thiserror::Error;

/// Failures talking to the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory rejected the session token")]
    Unauthorized,

    #[error("directory has no {0}")]
    NotFound(String),

    #[error("directory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failures reading local session and key state.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no active session")]
    NotAuthenticated,

    #[error("this device has no keypair")]
    MissingDeviceKeys,

    #[error("no user keypair stored for this device")]
    MissingUserKeys,

    #[error("local identity store: {0}")]
    Store(#[from] anyhow::Error),
}

/// Every way a sync run can fail. All of them abort the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not logged in. run [keyshare login] first")]
    NotAuthenticated,

    #[error("[{username}] has no registered device. complete device registration first")]
    MissingDevice { username: String },

    #[error("[{username}] directory holds a different user public key. re-import the user key with [keyshare user import]")]
    UserKeyMismatch { username: String },

    #[error("[{username}] does not belong to any organization. create or join one first")]
    MissingOrganization { username: String },

    #[error("[@{slug}] missing organization private key. ask a teammate to run [keyshare sync]")]
    MissingOrganizationPrivateKey { slug: String },

    #[error("[{subject}] decryption failed. key material is corrupted or mismatched")]
    DecryptionFailed { subject: String },

    #[error(transparent)]
    Identity(IdentityError),

    #[error(transparent)]
    Directory(DirectoryError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<IdentityError> for SyncError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotAuthenticated => SyncError::NotAuthenticated,
            other => SyncError::Identity(other),
        }
    }
}

impl From<DirectoryError> for SyncError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unauthorized => SyncError::NotAuthenticated,
            other => SyncError::Directory(other),
        }
    }
}
