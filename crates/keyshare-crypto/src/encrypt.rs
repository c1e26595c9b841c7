use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;
use crate::keys::{KEY_LEN, parse_private_key, parse_public_key};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HKDF_INFO: &[u8] = b"keyshare-ecies-v1";

/// Seal `plaintext` for the holder of `recipient_public_key_hex`.
///
/// Output is hex of `ephemeral_public || nonce || ciphertext+tag`. A fresh
/// ephemeral key is drawn per call, so sealing the same value twice never
/// produces the same ciphertext.
pub fn encrypt_for(plaintext: &[u8], recipient_public_key_hex: &str) -> Result<String, CryptoError> {
    let recipient = parse_public_key(recipient_public_key_hex)?;

    let mut eph_bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut eph_bytes);
    let ephemeral = StaticSecret::from(eph_bytes);
    eph_bytes.zeroize();
    let ephemeral_public = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&recipient);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey("low-order recipient public key".into()));
    }
    let key = derive_key(shared.as_bytes(), &ephemeral_public, &recipient)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(KEY_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(hex::encode(out))
}

/// Open a value sealed by [`encrypt_for`] with the recipient's private key.
pub fn decrypt_with(ciphertext_hex: &str, private_key_hex: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let secret = parse_private_key(private_key_hex)?;
    let own_public = PublicKey::from(&secret);

    let raw = hex::decode(ciphertext_hex.trim()).map_err(|_| CryptoError::DecryptionFailed)?;
    if raw.len() < KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let (eph, rest) = raw.split_at(KEY_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let eph_bytes: [u8; KEY_LEN] = eph.try_into().map_err(|_| CryptoError::DecryptionFailed)?;
    let ephemeral_public = PublicKey::from(eph_bytes);

    let shared = secret.diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        return Err(CryptoError::DecryptionFailed);
    }
    let key = derive_key(shared.as_bytes(), &ephemeral_public, &own_public)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

/// HKDF-SHA256 over the DH output, salted with both public keys so a
/// ciphertext is bound to the recipient it was sealed for.
fn derive_key(
    shared: &[u8],
    ephemeral_public: &PublicKey,
    recipient: &PublicKey,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut salt = [0u8; KEY_LEN * 2];
    salt[..KEY_LEN].copy_from_slice(ephemeral_public.as_bytes());
    salt[KEY_LEN..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt[..]), shared);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, key.as_mut_slice())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}
