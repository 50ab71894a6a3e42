//! Production I/O on tokio.
//!
//! - [`WsDriver`]: [`crate::Driver`] over tokio-tungstenite. Each transport
//!   and each reconnect timer runs in its own task and posts [`DriverEvent`]s
//!   to one channel.
//! - [`Runtime`]: owns a socket client and that channel's receiver, feeds
//!   events back in, and disconnects the client when dropped.
//! - [`RestClient`]: the REST endpoints the sockets fall back on.
//! - [`SystemEnv`]: wall clock and tokio timers.

mod env;
mod rest;
mod runtime;
mod ws;

pub use env::SystemEnv;
pub use rest::{
    ChatGroup, LastMessage, MessagePage, RestClient, RestError, RestMessage, RestReceipts,
};
pub use runtime::{Runtime, Socket};
pub use ws::{DriverEvent, WsDriver};
