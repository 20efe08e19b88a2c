// Email-at-rest encryption with AES-256-GCM.
//
// Stored form: base64(nonce[12] || ciphertext+tag). A fresh random nonce is
// drawn for every encryption, so the same address never encrypts to the same
// string twice.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use anyhow::{anyhow, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::RngCore;

/// Returned in place of an email whose ciphertext can't be decrypted.
pub const DECRYPTION_ERROR: &str = "decryption_error";

const NONCE_LEN: usize = 12;

pub struct EmailCipher {
    key: [u8; 32],
}

impl EmailCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Parse a base64 key (standard or URL-safe, padded or not) that decodes
    /// to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let bytes = [URL_SAFE, STANDARD, URL_SAFE_NO_PAD, STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(encoded).ok())
            .ok_or_else(|| anyhow!("ENCRYPTION_KEY is not valid base64"))?;

        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            anyhow!("ENCRYPTION_KEY must decode to 32 bytes, got {}", b.len())
        })?;
        Ok(Self::new(key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let combined = STANDARD
            .decode(stored)
            .map_err(|e| anyhow!("Stored email is not base64: {}", e))?;
        if combined.len() <= NONCE_LEN {
            return Err(anyhow!("Encrypted data too short"));
        }

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|e| anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(|e| anyhow!("Decrypted email is not UTF-8: {}", e))
    }

    /// Decrypt, or the `DECRYPTION_ERROR` sentinel if anything goes wrong.
    pub fn decrypt_or_sentinel(&self, stored: &str) -> String {
        self.decrypt(stored).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to decrypt stored email");
            DECRYPTION_ERROR.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> EmailCipher {
        EmailCipher::new([7u8; 32])
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let c = cipher();
        let stored = c.encrypt("ada@example.com").unwrap();
        assert_ne!(stored, "ada@example.com");
        assert_eq!(c.decrypt(&stored).unwrap(), "ada@example.com");
    }

    #[test]
    fn test_nonce_makes_ciphertexts_differ() {
        let c = cipher();
        assert_ne!(c.encrypt("a@b").unwrap(), c.encrypt("a@b").unwrap());
    }

    #[test]
    fn test_wrong_key_yields_sentinel() {
        let stored = cipher().encrypt("ada@example.com").unwrap();
        let other = EmailCipher::new([9u8; 32]);
        assert_eq!(other.decrypt_or_sentinel(&stored), DECRYPTION_ERROR);
    }

    #[test]
    fn test_plaintext_row_yields_sentinel() {
        assert_eq!(cipher().decrypt_or_sentinel("ada@example.com"), DECRYPTION_ERROR);
        assert_eq!(cipher().decrypt_or_sentinel(""), DECRYPTION_ERROR);
    }

    #[test]
    fn test_from_base64_accepts_urlsafe_key() {
        // 32 bytes of 0xfb encode with '-' and '_' in URL-safe base64.
        let key = URL_SAFE.encode([0xfbu8; 32]);
        assert!(EmailCipher::from_base64(&key).is_ok());
        let key = STANDARD.encode([0xfbu8; 32]);
        assert!(EmailCipher::from_base64(&key).is_ok());
    }

    #[test]
    fn test_from_base64_rejects_wrong_length() {
        let key = STANDARD.encode([1u8; 16]);
        assert!(EmailCipher::from_base64(&key).is_err());
        assert!(EmailCipher::from_base64("***").is_err());
    }
}
