//! Fuzz target for the fail-open decrypt step.
//!
//! # Strategy
//!
//! - Arbitrary payloads under an arbitrary (or missing) key
//! - Sealed payloads with one byte flipped
//! - Honest round trips of arbitrary plaintext
//!
//! # Invariants
//!
//! - `decrypt_message` never panics
//! - Anything not decrypted is returned unchanged
//! - A round trip of non-empty plaintext yields the plaintext

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use petchat_crypto::{DecryptStatus, MessageKey, decrypt_message, encrypt_message};

#[derive(Debug, Arbitrary)]
enum KeySize {
    Aes128([u8; 16]),
    Aes256([u8; 32]),
}

impl KeySize {
    fn key(&self) -> MessageKey {
        match self {
            Self::Aes128(bytes) => MessageKey::from_bytes(bytes).unwrap(),
            Self::Aes256(bytes) => MessageKey::from_bytes(bytes).unwrap(),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Input {
    Garbage { key: Option<KeySize>, payload: String },
    Tampered { key: KeySize, plaintext: String, iv: [u8; 16], flip: u16 },
    RoundTrip { key: KeySize, plaintext: String, iv: [u8; 16] },
}

fuzz_target!(|input: Input| {
    match input {
        Input::Garbage { key, payload } => {
            let key = key.map(|k| k.key());
            let outcome = decrypt_message(key.as_ref(), &payload);
            if outcome.status != DecryptStatus::Decrypted {
                assert_eq!(outcome.text, payload);
            }
        },
        Input::Tampered { key, plaintext, iv, flip } => {
            let key = key.key();
            let mut sealed = encrypt_message(&key, &plaintext, iv).into_bytes();
            if sealed.is_empty() {
                return;
            }
            let at = usize::from(flip) % sealed.len();
            sealed[at] ^= 0x01;
            let Ok(tampered) = String::from_utf8(sealed) else {
                return;
            };

            let outcome = decrypt_message(Some(&key), &tampered);
            if outcome.status != DecryptStatus::Decrypted {
                assert_eq!(outcome.text, tampered);
            }
        },
        Input::RoundTrip { key, plaintext, iv } => {
            let key = key.key();
            let sealed = encrypt_message(&key, &plaintext, iv);
            let outcome = decrypt_message(Some(&key), &sealed);

            if plaintext.is_empty() {
                assert_eq!(outcome.status, DecryptStatus::Failed);
            } else {
                assert_eq!(outcome.status, DecryptStatus::Decrypted);
                assert_eq!(outcome.text, plaintext);
            }
        },
    }
});
