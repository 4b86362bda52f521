//! Credential cipher port.
//!
//! Symmetric encryption for router credentials at the persistence
//! boundary. Repositories encrypt before write and decrypt after read;
//! nothing above the repository ever sees ciphertext.

use secrecy::SecretString;
use thiserror::Error;

/// Errors from credential encryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("credential encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("credential decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Port for credential encryption at rest.
pub trait CredentialCipher: Send + Sync {
    /// Encrypts a secret to an opaque storable string.
    fn encrypt(&self, plaintext: &SecretString) -> Result<String, CipherError>;

    /// Decrypts a stored value back to a secret.
    fn decrypt(&self, ciphertext: &str) -> Result<SecretString, CipherError>;
}
