//! Terminal output.

use std::io::{self, Write};

use petchat_client::ChatMessage;
use petchat_core::ConnectionStatus;
use petchat_crypto::DecryptStatus;

/// Write one line to stdout. A closed stdout is ignored.
pub fn line(args: std::fmt::Arguments<'_>) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{args}");
}

/// Render a chat message.
pub fn message(message: &ChatMessage) {
    let marker = match message.decrypt {
        DecryptStatus::Failed => " [undecryptable]",
        DecryptStatus::Plaintext | DecryptStatus::Decrypted => "",
    };
    line(format_args!("<{}> {}{}", message.author.username, message.body, marker));
}

/// Render a connection status change.
pub fn status(status: &ConnectionStatus) {
    match status {
        ConnectionStatus::Error { reason } => line(format_args!("* error: {reason}")),
        ConnectionStatus::AuthError => line(format_args!("* not authenticated, giving up")),
        other => line(format_args!("* {}", other.label())),
    }
}
