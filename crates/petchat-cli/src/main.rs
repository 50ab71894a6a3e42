//! Petchat terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Chat in a room, with history and REST fallback for chat group 4
//! PETCHAT_TOKEN=... petchat room dog-park --chat-id 4
//!
//! # Watch notifications for user 42
//! PETCHAT_TOKEN=... petchat notifications --user-id 42
//! ```
//!
//! Chat output goes to stdout, logs to stderr.

mod config;
mod error;
mod notifications;
mod output;
mod room;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{Args, Command, Settings},
    error::CliError,
};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = Settings::from_args(&args)?;
    tracing::info!(ws = settings.client.ws_base(), "petchat starting");

    match args.command {
        Command::Room { name, chat_id } => {
            let (room, chat) = config::room_target(&name, chat_id)?;
            room::run(settings, room, chat).await
        },
        Command::Notifications { user_id, ping_secs } => {
            let user = config::user_target(user_id);
            notifications::run(settings, user, std::time::Duration::from_secs(ping_secs.max(1)))
                .await
        },
    }
}
