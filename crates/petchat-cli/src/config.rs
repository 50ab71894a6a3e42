//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use petchat_client::{ClientConfig, config::DEFAULT_WS_BASE, transport::RestClient};
use petchat_crypto::MessageKey;
use petchat_proto::{ChatId, RoomName, UserId};

use crate::CliError;

/// Default REST base of the development backend.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Pet Society chat client
#[derive(Parser, Debug)]
#[command(name = "petchat")]
#[command(about = "Terminal client for the Pet Society realtime chat")]
#[command(version)]
pub struct Args {
    /// Websocket base URL
    #[arg(long, env = "PETCHAT_WS_URL", default_value = DEFAULT_WS_BASE)]
    pub ws_url: String,

    /// REST API base URL
    #[arg(long, env = "PETCHAT_API_URL", default_value = DEFAULT_API_BASE)]
    pub api_url: String,

    /// Shared message key (base64, 128 or 256 bit)
    #[arg(long, env = "PETCHAT_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// API token sent as `Authorization: Token <token>`
    #[arg(long, env = "PETCHAT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Client state database (active chats)
    #[arg(long, env = "PETCHAT_STATE_DB", default_value = "petchat-state.redb")]
    pub state_db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// What to run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join a chat room and chat from stdin
    Room {
        /// Room name as used in the socket path
        name: String,

        /// Chat group id, enables history, REST fallback and read receipts
        #[arg(long)]
        chat_id: Option<u64>,
    },

    /// Watch cross-room notifications for a user
    Notifications {
        /// Authenticated user id
        #[arg(long)]
        user_id: u64,

        /// Seconds between keepalive pings
        #[arg(long, default_value = "30")]
        ping_secs: u64,
    },
}

/// Validated settings shared by both sessions.
#[derive(Debug)]
pub struct Settings {
    /// Socket configuration.
    pub client: ClientConfig,
    /// Shared message key.
    pub key: Option<MessageKey>,
    /// API token.
    pub token: Option<String>,
    /// REST client.
    pub rest: RestClient,
    /// State database path.
    pub state_db: PathBuf,
}

impl Settings {
    /// Validate `args`.
    pub fn from_args(args: &Args) -> Result<Self, CliError> {
        let client = ClientConfig::new(&args.ws_url)?;
        let key = args.encryption_key.as_deref().map(MessageKey::from_base64).transpose()?;

        Ok(Self {
            client,
            key,
            token: args.token.clone(),
            rest: RestClient::new(&args.api_url, args.token.clone()),
            state_db: args.state_db.clone(),
        })
    }
}

/// Parse a room argument.
pub fn room_target(
    name: &str,
    chat_id: Option<u64>,
) -> Result<(RoomName, Option<ChatId>), CliError> {
    Ok((RoomName::new(name)?, chat_id.map(ChatId)))
}

/// Parse a user argument.
pub fn user_target(user_id: u64) -> UserId {
    UserId(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn room_command_with_defaults() {
        let args = parse(&["petchat", "room", "dog-park", "--chat-id", "4"]);

        let Command::Room { name, chat_id } = &args.command else {
            panic!("expected room command");
        };
        assert_eq!(name, "dog-park");
        assert_eq!(*chat_id, Some(4));

        let settings = Settings::from_args(&args).unwrap();
        assert_eq!(settings.client.ws_base(), DEFAULT_WS_BASE);
        assert!(settings.key.is_none());
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let args = parse(&["petchat", "--ws-url", "http://example.com", "room", "x"]);
        assert!(matches!(Settings::from_args(&args), Err(CliError::Connection(_))));

        let args = parse(&["petchat", "--encryption-key", "c2hvcnQ=", "room", "x"]);
        assert!(matches!(Settings::from_args(&args), Err(CliError::Key(_))));

        assert!(matches!(room_target("no spaces", None), Err(CliError::Room(_))));
    }
}
