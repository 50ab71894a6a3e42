//! Notification watcher.
//!
//! Prints notices for chats that are not open and keeps the socket alive
//! with periodic pings. Chats marked active by a room session in the same
//! state database are turned into read receipts instead.

use std::{sync::Arc, time::Duration};

use petchat_client::{
    ActiveChats, NewChatNotice, NotificationSocket, RedbStore,
    transport::{RestReceipts, Runtime, SystemEnv, WsDriver},
};
use petchat_core::Environment;
use petchat_proto::UserId;
use tracing::{info, warn};

use crate::{CliError, config::Settings, output};

/// Run until Ctrl-C or the driver shutting down.
pub async fn run(settings: Settings, user: UserId, ping_every: Duration) -> Result<(), CliError> {
    let store = RedbStore::open(&settings.state_db)?;
    let active = ActiveChats::load(store, Arc::new(RestReceipts::new(settings.rest.clone())))?;
    info!(active = ?active.snapshot(), "active chats loaded");

    match settings.rest.unread_count().await {
        Ok(count) => output::line(format_args!("* {count} unread message(s)")),
        Err(err) => warn!(error = %err, "unread count unavailable"),
    }

    let env = SystemEnv::new();
    let (driver, events) = WsDriver::new(env, settings.token.clone());
    let socket = NotificationSocket::new(driver, settings.client.clone(), active);

    let _statuses = socket.on_connection(output::status);
    let _messages = socket.on_message(|notice| {
        let author = notice.author.as_ref().map_or("someone", |a| a.username.as_str());
        output::line(format_args!("[{}] {author}: {}", notice.chat_name, notice.message));
    });
    let _chats = socket.on_new_chat(|notice| match notice {
        NewChatNotice::Created(frame) => {
            output::line(format_args!("* new chat {} ({})", frame.chat_name, frame.chat_id));
        },
        NewChatNotice::Invited(frame) => {
            let by = frame.invited_by.as_ref().map_or("someone", |u| u.username.as_str());
            output::line(format_args!(
                "* {by} invited you to {} ({})",
                frame.chat_name, frame.chat_id
            ));
        },
    });

    let mut runtime = Runtime::new(socket, events);
    runtime.socket_mut().connect(user);

    let mut ping = tokio::time::interval(ping_every);
    ping.tick().await;

    loop {
        tokio::select! {
            alive = runtime.turn() => {
                if !alive {
                    break;
                }
            },
            _ = ping.tick() => {
                runtime.socket_mut().ping(env.wall_clock_millis());
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            },
        }
    }

    Ok(())
}
