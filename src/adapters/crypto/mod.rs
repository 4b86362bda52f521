//! Credential encryption adapters.

mod aes_cipher;

pub use aes_cipher::AesCredentialCipher;
