//! Shared records and request bodies exchanged with the key directory.
//!
//! Nothing in here ever holds a plaintext private key: records carry public
//! keys and ciphertext only.

pub mod api;
pub mod models;

pub use models::{
    DeviceEntry, DeviceId, EncryptedKeyGrant, GRANT_ALGORITHM_VERSION, MemberEntry,
    OrganizationId, OrganizationRecord, PendingMember, SessionToken, SyncSummary, UserId,
    UserRecord,
};
