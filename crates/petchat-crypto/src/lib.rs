//! Petchat Message Crypto
//!
//! Client side of the message encryption shared with the backend. Messages at
//! rest are sealed with AES-CBC and PKCS#7 padding under a single symmetric
//! key distributed through configuration.
//!
//! # Wire Form
//!
//! ```text
//! base64(iv) "." base64(ciphertext)
//! ```
//!
//! The IV is 16 random bytes. A string with no `.` is treated as plaintext.
//!
//! # Fail-open
//!
//! [`decrypt_message`] never errors. On any failure it returns the input
//! unchanged and sets [`DecryptStatus::Failed`] so the UI can mark the message
//! instead of hiding it. [`open_sealed`] is the strict variant for callers
//! that want the error.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod key;
mod seal;

pub use error::CryptoError;
pub use key::MessageKey;
pub use seal::{
    DecryptOutcome, DecryptStatus, IV_SIZE, decrypt_message, encrypt_message, open_sealed,
};
