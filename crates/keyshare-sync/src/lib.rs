//! Keyshare sync
//!
//! Distributes encrypted copies of private keys so a user's key reaches all
//! of their devices and an organization's key reaches all of its members.
//! The directory only ever sees public keys and ciphertext.
//!
//! - `orchestrator`: the sync run, devices first and then each organization
//! - `directory`: what the remote directory must offer
//! - `identity`: what the local session/key store must offer
//! - `http`: `reqwest` implementation of the directory
//! - `error`: error enums

pub mod directory;
pub mod error;
pub mod http;
pub mod identity;
pub mod orchestrator;

pub use directory::DirectoryClient;
pub use error::{DirectoryError, IdentityError, SyncError};
pub use http::{HttpConfig, HttpDirectory};
pub use identity::LocalIdentity;
pub use orchestrator::Orchestrator;
