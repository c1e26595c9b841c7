use zeroize::Zeroizing;

use crate::encrypt::{decrypt_with, encrypt_for};
use crate::error::CryptoError;
use crate::keys::{self, KeyPairHex};

/// Plaintext used for round-trip keypair verification.
pub const VERIFICATION_PLAINTEXT: &[u8] = b"true";

/// Asymmetric primitive consumed by the sync protocol. Implementations are
/// stateless; every call is a pure function of its inputs plus fresh randomness.
pub trait CryptoCapability: Send + Sync {
    fn generate_keypair(&self) -> KeyPairHex;

    /// Encrypt for a recipient. Returns hex ciphertext.
    fn encrypt(&self, plaintext: &[u8], recipient_public_key: &str) -> Result<String, CryptoError>;

    /// Fails with [`CryptoError::DecryptionFailed`] on malformed or mismatched input.
    fn decrypt(&self, ciphertext: &str, private_key: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    fn public_key_for(&self, private_key: &str) -> Result<String, CryptoError>;

    /// Prove `private_key` opens values sealed for `public_key`.
    fn verify_key_pair(&self, public_key: &str, private_key: &str) -> Result<(), CryptoError> {
        let probe = self.encrypt(VERIFICATION_PLAINTEXT, public_key)?;
        let opened = self.decrypt(&probe, private_key)?;
        if opened.as_slice() != VERIFICATION_PLAINTEXT {
            return Err(CryptoError::DecryptionFailed);
        }
        Ok(())
    }
}

/// X25519 + HKDF-SHA256 + AES-256-GCM sealed boxes, hex on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct EciesCrypto;

impl CryptoCapability for EciesCrypto {
    fn generate_keypair(&self) -> KeyPairHex {
        keys::generate_keypair()
    }

    fn encrypt(&self, plaintext: &[u8], recipient_public_key: &str) -> Result<String, CryptoError> {
        encrypt_for(plaintext, recipient_public_key)
    }

    fn decrypt(&self, ciphertext: &str, private_key: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        decrypt_with(ciphertext, private_key)
    }

    fn public_key_for(&self, private_key: &str) -> Result<String, CryptoError> {
        keys::public_key_for(private_key)
    }
}

impl<T: CryptoCapability + ?Sized> CryptoCapability for &T {
    fn generate_keypair(&self) -> KeyPairHex {
        (**self).generate_keypair()
    }

    fn encrypt(&self, plaintext: &[u8], recipient_public_key: &str) -> Result<String, CryptoError> {
        (**self).encrypt(plaintext, recipient_public_key)
    }

    fn decrypt(&self, ciphertext: &str, private_key: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        (**self).decrypt(ciphertext, private_key)
    }

    fn public_key_for(&self, private_key: &str) -> Result<String, CryptoError> {
        (**self).public_key_for(private_key)
    }
}
