//! Sealing and opening message bodies.
//!
//! Pure functions. The IV is supplied by the caller so tests are
//! deterministic.

use aes::{Aes128, Aes192, Aes256};
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{
    BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7, generic_array::GenericArray,
};
use tracing::warn;

use crate::{CryptoError, MessageKey};

/// CBC initialization vector size.
pub const IV_SIZE: usize = 16;

const BLOCK_SIZE: usize = 16;

/// How [`decrypt_message`] produced its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptStatus {
    /// Input had no `iv.ciphertext` shape and was passed through.
    Plaintext,
    /// Input was sealed and decrypted.
    Decrypted,
    /// Input looked sealed but could not be opened. Text is the input.
    Failed,
}

/// Result of the fail-open decrypt step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptOutcome {
    /// Display text.
    pub text: String,
    /// How `text` was obtained.
    pub status: DecryptStatus,
}

/// Seal `plaintext` under `key` with the given IV.
///
/// Returns the `base64(iv).base64(ciphertext)` wire form.
pub fn encrypt_message(key: &MessageKey, plaintext: &str, iv: [u8; IV_SIZE]) -> String {
    let data = plaintext.as_bytes();

    let block_iv = GenericArray::from(iv);
    let ciphertext = match key {
        MessageKey::Aes128(k) => {
            let enc = cbc::Encryptor::<Aes128>::new(k.into(), &block_iv);
            enc.encrypt_padded_vec_mut::<Pkcs7>(data)
        },
        MessageKey::Aes192(k) => {
            let enc = cbc::Encryptor::<Aes192>::new(k.into(), &block_iv);
            enc.encrypt_padded_vec_mut::<Pkcs7>(data)
        },
        MessageKey::Aes256(k) => {
            let enc = cbc::Encryptor::<Aes256>::new(k.into(), &block_iv);
            enc.encrypt_padded_vec_mut::<Pkcs7>(data)
        },
    };

    format!("{}.{}", STANDARD.encode(iv), STANDARD.encode(ciphertext))
}

/// Open a sealed payload, reporting why it failed.
///
/// # Errors
///
/// - `NotSealed` if there is no `.` separator
/// - `Base64` if either half is not standard base64
/// - `InvalidIvLength` / `InvalidCiphertextLength` on bad sizes
/// - `BadPadding` on a wrong key or corrupted ciphertext
/// - `NotUtf8` / `EmptyPlaintext` if the result is not displayable
pub fn open_sealed(key: &MessageKey, payload: &str) -> Result<String, CryptoError> {
    let (iv_b64, ct_b64) = payload.split_once('.').ok_or(CryptoError::NotSealed)?;

    let iv = STANDARD.decode(iv_b64).map_err(|_| CryptoError::Base64 { field: "iv" })?;
    let ciphertext =
        STANDARD.decode(ct_b64).map_err(|_| CryptoError::Base64 { field: "ciphertext" })?;

    if iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidIvLength(iv.len()));
    }
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(ciphertext.len()));
    }

    let opened = match key {
        MessageKey::Aes128(k) => cbc::Decryptor::<Aes128>::new_from_slices(k, &iv)
            .map(|dec| dec.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)),
        MessageKey::Aes192(k) => cbc::Decryptor::<Aes192>::new_from_slices(k, &iv)
            .map(|dec| dec.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)),
        MessageKey::Aes256(k) => cbc::Decryptor::<Aes256>::new_from_slices(k, &iv)
            .map(|dec| dec.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)),
    };

    let plaintext = opened
        .map_err(|_| CryptoError::InvalidIvLength(iv.len()))?
        .map_err(|_| CryptoError::BadPadding)?;

    let text = String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)?;
    if text.is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }

    Ok(text)
}

/// Fail-open decrypt step applied to every inbound message body.
///
/// - Empty input or input without `.` is returned as `Plaintext`.
/// - Sealed input that opens is returned as `Decrypted`.
/// - Anything else, including a missing key, returns the input unchanged as
///   `Failed` and logs a warning.
pub fn decrypt_message(key: Option<&MessageKey>, payload: &str) -> DecryptOutcome {
    if payload.is_empty() || !payload.contains('.') {
        return DecryptOutcome { text: payload.to_string(), status: DecryptStatus::Plaintext };
    }

    let Some(key) = key else {
        warn!("message key not configured, showing sealed payload");
        return DecryptOutcome { text: payload.to_string(), status: DecryptStatus::Failed };
    };

    match open_sealed(key, payload) {
        Ok(text) => DecryptOutcome { text, status: DecryptStatus::Decrypted },
        Err(err) => {
            warn!(error = %err, "message decryption failed, showing original payload");
            DecryptOutcome { text: payload.to_string(), status: DecryptStatus::Failed }
        },
    }
}
