//! Keyshare crypto
//!
//! ECIES-style sealed boxes over X25519: an ephemeral key agreement per
//! message, HKDF-SHA256 key expansion, AES-256-GCM sealing. Keys and
//! ciphertext travel as lowercase hex.

pub mod capability;
pub mod encrypt;
pub mod error;
pub mod keys;

pub use capability::{CryptoCapability, EciesCrypto, VERIFICATION_PLAINTEXT};
pub use error::CryptoError;
pub use keys::{KeyPairHex, secret_to_string};
pub use zeroize::Zeroizing;
