//! AES-256-GCM credential cipher.
//!
//! Stored form is base64 over `nonce || ciphertext`; the nonce is random
//! per encryption, so encrypting the same credential twice yields
//! different stored values.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{CipherError, CredentialCipher};

/// Nonce length for AES-GCM (96 bits)
const NONCE_LEN: usize = 12;

/// AES-256-GCM implementation of the CredentialCipher port.
pub struct AesCredentialCipher {
    cipher: Aes256Gcm,
}

impl AesCredentialCipher {
    /// Builds a cipher from a 256-bit key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }
}

impl CredentialCipher for AesCredentialCipher {
    fn encrypt(&self, plaintext: &SecretString) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.expose_secret().as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(stored))
    }

    fn decrypt(&self, stored: &str) -> Result<SecretString, CipherError> {
        let bytes = BASE64
            .decode(stored)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        if bytes.len() <= NONCE_LEN {
            return Err(CipherError::DecryptionFailed(
                "stored value too short".to_string(),
            ));
        }

        let nonce_bytes: [u8; NONCE_LEN] = bytes[..NONCE_LEN]
            .try_into()
            .map_err(|_| CipherError::DecryptionFailed("invalid nonce length".to_string()))?;
        let nonce = Nonce::from(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(&nonce, &bytes[NONCE_LEN..])
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        let text = String::from_utf8(plaintext)
            .map_err(|_| CipherError::DecryptionFailed("plaintext is not UTF-8".to_string()))?;

        Ok(SecretString::new(text))
    }
}
