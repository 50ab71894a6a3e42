//! Shared message key.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use zeroize::Zeroize;

use crate::CryptoError;

/// AES key shared with the backend.
///
/// Zeroized on drop. `Debug` never prints key material.
#[derive(Clone)]
pub enum MessageKey {
    /// AES-128.
    Aes128([u8; 16]),
    /// AES-192.
    Aes192([u8; 24]),
    /// AES-256.
    Aes256([u8; 32]),
}

impl MessageKey {
    /// Build a key from raw bytes.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidKeyLength` unless `bytes` is 16, 24 or 32 long
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        match bytes.len() {
            16 => Ok(Self::Aes128(to_array(bytes))),
            24 => Ok(Self::Aes192(to_array(bytes))),
            32 => Ok(Self::Aes256(to_array(bytes))),
            len => Err(CryptoError::InvalidKeyLength(len)),
        }
    }

    /// Parse a base64 key as found in configuration.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut raw =
            STANDARD.decode(encoded.trim()).map_err(|_| CryptoError::Base64 { field: "key" })?;
        let key = Self::from_bytes(&raw);
        raw.zeroize();
        key
    }

    /// Key length in bits.
    pub fn bits(&self) -> usize {
        self.as_bytes().len() * 8
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Aes128(k) => k,
            Self::Aes192(k) => k,
            Self::Aes256(k) => k,
        }
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        match self {
            Self::Aes128(k) => k.zeroize(),
            Self::Aes192(k) => k.zeroize(),
            Self::Aes256(k) => k.zeroize(),
        }
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageKey(AES-{}, <redacted>)", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_aes_key_sizes() {
        assert_eq!(MessageKey::from_bytes(&[1u8; 16]).unwrap().bits(), 128);
        assert_eq!(MessageKey::from_bytes(&[1u8; 24]).unwrap().bits(), 192);
        assert_eq!(MessageKey::from_bytes(&[1u8; 32]).unwrap().bits(), 256);
        assert_eq!(
            MessageKey::from_bytes(&[1u8; 20]).unwrap_err(),
            CryptoError::InvalidKeyLength(20)
        );
    }

    #[test]
    fn parses_base64_from_config() {
        let encoded = STANDARD.encode([7u8; 32]);
        let key = MessageKey::from_base64(&format!("{encoded}\n")).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; 32]);

        assert!(matches!(MessageKey::from_base64("!!!"), Err(CryptoError::Base64 { .. })));
    }

    #[test]
    fn debug_is_redacted() {
        let key = MessageKey::from_bytes(&[0xAB; 16]).unwrap();
        let shown = format!("{key:?}");
        assert!(shown.contains("redacted"));
        assert!(!shown.contains("171"));
    }
}
