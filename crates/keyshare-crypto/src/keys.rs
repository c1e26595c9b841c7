use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;

/// A hex-encoded X25519 keypair. The private half is wiped on drop.
#[derive(Clone)]
pub struct KeyPairHex {
    pub public_key: String,
    pub private_key: Zeroizing<String>,
}

impl std::fmt::Debug for KeyPairHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairHex")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh X25519 keypair from the OS RNG.
pub fn generate_keypair() -> KeyPairHex {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    let secret = StaticSecret::from(bytes);
    bytes.zeroize();

    let public = PublicKey::from(&secret);
    KeyPairHex {
        public_key: hex::encode(public.as_bytes()),
        private_key: Zeroizing::new(hex::encode(secret.to_bytes())),
    }
}

pub fn parse_public_key(public_key_hex: &str) -> Result<PublicKey, CryptoError> {
    let bytes = decode_32(public_key_hex, "public key")?;
    Ok(PublicKey::from(bytes))
}

pub fn parse_private_key(private_key_hex: &str) -> Result<StaticSecret, CryptoError> {
    let mut bytes = decode_32(private_key_hex, "private key")?;
    let secret = StaticSecret::from(bytes);
    bytes.zeroize();
    Ok(secret)
}

/// Derive the hex public key that pairs with a hex private key.
pub fn public_key_for(private_key_hex: &str) -> Result<String, CryptoError> {
    let secret = parse_private_key(private_key_hex)?;
    Ok(hex::encode(PublicKey::from(&secret).as_bytes()))
}

/// Turn decrypted key bytes into a string without leaving an unwiped copy
/// behind, on success or failure.
pub fn secret_to_string(mut raw: Zeroizing<Vec<u8>>) -> Result<Zeroizing<String>, CryptoError> {
    match String::from_utf8(std::mem::take(&mut *raw)) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(err) => {
            err.into_bytes().zeroize();
            Err(CryptoError::DecryptionFailed)
        }
    }
}

fn decode_32(encoded: &str, what: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    let mut bytes = hex::decode(encoded.trim())?;
    let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("{} must be {} bytes, got {}", what, KEY_LEN, bytes.len()))
    })?;
    bytes.zeroize();
    Ok(key)
}
