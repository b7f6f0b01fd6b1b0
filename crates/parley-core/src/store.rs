//! Encrypted profile storage
//!
//! Password-based authenticated encryption for profile save data at rest:
//! Argon2id for key derivation, ChaCha20-Poly1305 for the authenticated
//! cipher. The on-disk framing is
//!
//! ```text
//! magic (8) || salt (16) || nonce (12) || ciphertext+tag
//! ```
//!
//! and must be reproduced byte-for-byte so saves stay interchangeable between
//! installations. Plaintext saves carry no magic and are passed through
//! unchanged by the loader.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::Rng;
use tracing::warn;

use crate::errors::CryptoError;

/// Magic prefix marking a password-protected save (format version 1).
pub const MAGIC: [u8; 8] = *b"parleyE\x01";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Total framing overhead of an encrypted save over its plaintext.
pub const ENCRYPTION_EXTRA_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN + TAG_LEN;

/// Argon2 parameters (tuned for security vs. usability)
const ARGON2_MEMORY_KIB: u32 = 65536; // 64 MiB
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_LANES: u32 = 4;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

/// Check whether a save blob is password-protected.
pub fn is_encrypted(blob: &[u8]) -> bool {
    blob.len() >= MAGIC.len() && blob[..MAGIC.len()] == MAGIC
}

/// Encrypt a save blob with a key derived from `password` and a fresh salt.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);

    let key = derive_key(password, &salt)?;
    let cipher =
        ChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::Encryption)?;
    let ciphertext = cipher.encrypt(Nonce::from_slice(&nonce), plaintext).map_err(|_| {
        warn!("encryption of profile save failed");
        CryptoError::Encryption
    })?;

    let mut out = Vec::with_capacity(ENCRYPTION_EXTRA_LEN + plaintext.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a save blob produced by [`encrypt`].
///
/// The salt is read back from the header and the key re-derived from
/// `password`. A failed authentication tag means a wrong password or a
/// corrupted blob; callers cannot tell which.
pub fn decrypt(blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    if !is_encrypted(blob) {
        return Err(CryptoError::Malformed {
            reason: "missing magic header",
        });
    }
    if blob.len() < ENCRYPTION_EXTRA_LEN {
        return Err(CryptoError::Malformed {
            reason: "truncated header",
        });
    }

    let salt = &blob[MAGIC.len()..MAGIC.len() + SALT_LEN];
    let nonce = &blob[MAGIC.len() + SALT_LEN..MAGIC.len() + SALT_LEN + NONCE_LEN];
    let ciphertext = &blob[MAGIC.len() + SALT_LEN + NONCE_LEN..];

    let key = derive_key(password, salt)?;
    let cipher =
        ChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::Decryption)?;
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| {
        warn!("decryption failed");
        CryptoError::Decryption
    })
}

// ----------------------------------------------------------------------------
// Key Derivation
// ----------------------------------------------------------------------------

/// Derive the cipher key from a password and salt using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_LANES, Some(KEY_LEN))
        .map_err(|_| CryptoError::KeyDerivation)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(key)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PLAINTEXT: &[u8] = b"profile save data";
    const PASSWORD: &str = "test-password-123";

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let blob = encrypt(PLAINTEXT, PASSWORD).unwrap();
        assert_eq!(blob.len(), PLAINTEXT.len() + ENCRYPTION_EXTRA_LEN);
        assert_eq!(decrypt(&blob, PASSWORD).unwrap(), PLAINTEXT);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let blob = encrypt(PLAINTEXT, PASSWORD).unwrap();
        assert_eq!(decrypt(&blob, "wrong-password"), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_corrupted_ciphertext_rejected() {
        let mut blob = encrypt(PLAINTEXT, PASSWORD).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert_eq!(decrypt(&blob, PASSWORD), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_is_encrypted_detection() {
        let blob = encrypt(PLAINTEXT, PASSWORD).unwrap();
        assert!(is_encrypted(&blob));
        assert!(!is_encrypted(PLAINTEXT));
        assert!(!is_encrypted(b""));
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let blob = encrypt(PLAINTEXT, PASSWORD).unwrap();
        let err = decrypt(&blob[..MAGIC.len() + 4], PASSWORD).unwrap_err();
        assert!(matches!(err, CryptoError::Malformed { .. }));
    }

    #[test]
    fn test_fresh_salt_per_encryption() {
        let a = encrypt(PLAINTEXT, PASSWORD).unwrap();
        let b = encrypt(PLAINTEXT, PASSWORD).unwrap();
        assert_ne!(a, b);
    }
}
