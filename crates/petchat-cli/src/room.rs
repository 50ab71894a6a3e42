//! Interactive room session.
//!
//! Lines typed on stdin are sent as messages. While the socket is down, and a
//! chat id is known, messages go over REST instead. Commands:
//!
//! - `/history` loads the page before the oldest message shown
//! - `/invite <username>` adds a user to the chat
//! - `/image <path>` uploads an image
//! - `/quit` leaves

use std::sync::Arc;

use petchat_client::{
    ActiveChats, ChatMessage, Conversation, RedbStore, RoomSocket,
    transport::{MessagePage, RestClient, RestReceipts, Runtime, SystemEnv, WsDriver},
};
use petchat_core::ConnectionStatus;
use petchat_crypto::MessageKey;
use petchat_proto::{ChatId, RoomName};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, warn};

use crate::{CliError, config::Settings, output};

enum Notice {
    Connected,
}

enum Flow {
    Continue,
    Quit,
}

struct Session {
    chat: Option<ChatId>,
    key: Option<MessageKey>,
    rest: RestClient,
    conversation: Conversation,
    resync: bool,
}

/// Run until `/quit`, end of input or the driver shutting down.
pub async fn run(settings: Settings, room: RoomName, chat: Option<ChatId>) -> Result<(), CliError> {
    let active = match chat {
        Some(chat) => {
            let store = RedbStore::open(&settings.state_db)?;
            let active =
                ActiveChats::load(store, Arc::new(RestReceipts::new(settings.rest.clone())))?;
            active.mark_active(chat)?;
            Some((active, chat))
        },
        None => None,
    };

    let result = session(settings, room, chat).await;

    if let Some((active, chat)) = active {
        active.mark_inactive(chat)?;
    }
    result
}

async fn session(settings: Settings, room: RoomName, chat: Option<ChatId>) -> Result<(), CliError> {
    let (driver, events) = WsDriver::new(SystemEnv::new(), settings.token.clone());
    let socket = RoomSocket::new(driver, settings.client.clone(), settings.key.clone());

    let mut session = Session {
        chat,
        key: settings.key,
        rest: settings.rest,
        conversation: Conversation::new(),
        resync: false,
    };

    let (notices, mut notice_rx) = mpsc::unbounded_channel();
    let (inbox, mut inbox_rx) = mpsc::unbounded_channel();

    let _statuses = socket.on_connection(move |status| {
        output::status(status);
        if *status == ConnectionStatus::Connected {
            let _ = notices.send(Notice::Connected);
        }
    });
    let _messages = socket.on_message(move |message| {
        let _ = inbox.send(message.clone());
    });
    let _typing = socket.on_typing(|frame| {
        if frame.is_typing {
            output::line(format_args!("* {} is typing", frame.username));
        }
    });
    let _users = socket.on_user_list_update(|users| {
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        output::line(format_args!("* online: {}", names.join(", ")));
    });
    let _errors = socket.on_server_error(|error| output::line(format_args!("* server: {error}")));

    let mut runtime = Runtime::new(socket, events);
    runtime.socket_mut().connect(room);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            alive = runtime.turn() => {
                if !alive {
                    break;
                }
            },
            Some(message) = inbox_rx.recv() => {
                if session.conversation.push(message.clone()) {
                    output::message(&message);
                }
            },
            Some(Notice::Connected) = notice_rx.recv() => session.on_connected().await,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Flow::Quit = session.on_line(runtime.socket_mut(), line.trim()).await {
                    break;
                }
            },
        }
    }

    Ok(())
}

impl Session {
    /// Load the latest page. After a reconnect this fills whatever was
    /// missed while the socket was down.
    async fn on_connected(&mut self) {
        let Some(chat) = self.chat else {
            return;
        };

        match self.fetch(chat, MessagePage::default()).await {
            Some(added) if self.resync && !added.is_empty() => {
                output::line(format_args!("* {} missed message(s)", added.len()));
                added.iter().for_each(output::message);
            },
            Some(added) => added.iter().for_each(output::message),
            None => {},
        }

        self.resync = true;
    }

    /// Fetch a page and merge it. Returns the messages that were new, in
    /// id order.
    async fn fetch(&mut self, chat: ChatId, page: MessagePage) -> Option<Vec<ChatMessage>> {
        let page = match self.rest.get_messages(chat, page).await {
            Ok(page) => page,
            Err(err) => {
                warn!(%chat, error = %err, "history fetch failed");
                return None;
            },
        };

        let mut added: Vec<ChatMessage> = page
            .into_iter()
            .map(|m| m.into_chat_message(self.key.as_ref()))
            .filter(|m| !self.conversation.contains(m.id))
            .collect();
        added.sort_by_key(|m| m.id);
        added.dedup_by_key(|m| m.id);

        let merged = self.conversation.merge_history(added.clone());
        debug!(%chat, merged, "history merged");
        Some(added)
    }

    async fn on_line(&mut self, socket: &mut RoomSocket<WsDriver<SystemEnv>>, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" => return Flow::Quit,
            "/history" => self.history().await,
            "/invite" => self.invite(rest.trim()).await,
            "/image" => self.image(rest.trim()).await,
            _ => self.send(socket, line).await,
        }

        Flow::Continue
    }

    async fn send(&mut self, socket: &mut RoomSocket<WsDriver<SystemEnv>>, text: &str) {
        if socket.send_message(text) {
            return;
        }

        let Some(chat) = self.chat else {
            output::line(format_args!("* not connected, message not sent"));
            return;
        };

        match self.rest.send_message(chat, text).await {
            Ok(sent) => {
                let message = sent.into_chat_message(self.key.as_ref());
                if self.conversation.push(message.clone()) {
                    output::message(&message);
                }
            },
            Err(err) => output::line(format_args!("* send failed: {err}")),
        }
    }

    async fn history(&mut self) {
        let Some(chat) = self.chat else {
            output::line(format_args!("* history needs --chat-id"));
            return;
        };

        let page = MessagePage {
            before_message_id: self.conversation.oldest_id(),
            ..MessagePage::default()
        };

        if let Some(added) = self.fetch(chat, page).await {
            output::line(format_args!("* --- {} older message(s) ---", added.len()));
            added.iter().for_each(output::message);
        }
    }

    async fn invite(&self, username: &str) {
        let Some(chat) = self.chat else {
            output::line(format_args!("* invite needs --chat-id"));
            return;
        };
        if username.is_empty() {
            output::line(format_args!("* usage: /invite <username>"));
            return;
        }

        match self.rest.invite_user(chat, username).await {
            Ok(()) => output::line(format_args!("* invited {username}")),
            Err(err) => output::line(format_args!("* invite failed: {err}")),
        }
    }

    async fn image(&mut self, path: &str) {
        let Some(chat) = self.chat else {
            output::line(format_args!("* image upload needs --chat-id"));
            return;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                output::line(format_args!("* cannot read {path}: {err}"));
                return;
            },
        };
        let file_name = std::path::Path::new(path)
            .file_name()
            .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned());

        match self.rest.send_image_message(chat, &file_name, bytes).await {
            Ok(sent) => {
                let message = sent.into_chat_message(self.key.as_ref());
                if self.conversation.push(message.clone()) {
                    output::message(&message);
                }
            },
            Err(err) => output::line(format_args!("* upload failed: {err}")),
        }
    }
}
