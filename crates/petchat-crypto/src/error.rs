//! Errors from key parsing and strict decryption.

use thiserror::Error;

/// Errors raised by [`crate::MessageKey`] parsing and [`crate::open_sealed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key is not 16, 24 or 32 bytes.
    #[error("invalid key length: {0} bytes")]
    InvalidKeyLength(usize),

    /// A field was not valid standard base64.
    #[error("invalid base64 in {field}")]
    Base64 {
        /// Which part of the input failed to decode.
        field: &'static str,
    },

    /// Input has no `iv.ciphertext` separator.
    #[error("payload is not in iv.ciphertext form")]
    NotSealed,

    /// IV is not 16 bytes.
    #[error("invalid iv length: {0} bytes")]
    InvalidIvLength(usize),

    /// Ciphertext is empty or not a multiple of the block size.
    #[error("invalid ciphertext length: {0} bytes")]
    InvalidCiphertextLength(usize),

    /// Padding check failed, usually a wrong key.
    #[error("bad padding")]
    BadPadding,

    /// Decrypted bytes are not UTF-8.
    #[error("plaintext is not utf-8")]
    NotUtf8,

    /// Decrypted to an empty string.
    #[error("plaintext is empty")]
    EmptyPlaintext,
}
