//! Petchat Core
//!
//! Transport-agnostic building blocks shared by the room and notification
//! socket clients:
//!
//! - [`Connection`]: a Sans-IO lifecycle state machine. It consumes transport
//!   events and returns [`ConnectionAction`]s for a driver to execute. It owns
//!   the reconnect policy and the epoch guard that keeps stale timers and
//!   replaced sockets from touching current state.
//! - [`EventBus`]: typed fan-out of events to handlers keyed by event kind,
//!   with [`Subscription`] tokens that unregister on drop.
//! - [`Environment`]: time and sleep, so drivers can run on a virtual clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bus;
pub mod connection;
pub mod env;
pub mod error;

pub use bus::{Event, EventBus, Subscription};
pub use connection::{
    Connection, ConnectionAction, ConnectionStatus, Epoch, LinkState, ReconnectPolicy, Target,
    TransportEvent,
};
pub use env::Environment;
pub use error::ConnectionError;
