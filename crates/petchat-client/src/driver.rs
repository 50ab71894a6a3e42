//! Driver trait for abstracting socket I/O.
//!
//! The socket clients never touch the network. They turn their connection's
//! actions into [`Driver`] calls and the driver reports what happened by
//! having the owner call `handle(epoch, event)` on the client.
//!
//! # Implementations
//!
//! - **Production**: [`crate::transport::WsDriver`] with tokio-tungstenite
//! - **Tests**: `SimDriver` in `petchat-harness`, which records every call

use std::time::Duration;

use petchat_core::{Connection, ConnectionAction, ConnectionStatus, Epoch, Target, TransportEvent};
use petchat_proto::CloseCode;
use tracing::debug;

use crate::ClientConfig;

/// Executes socket I/O on behalf of a client.
///
/// Every call carries the epoch the client issued it under. Events the
/// driver reports back must carry the same epoch.
pub trait Driver: Send {
    /// Open a transport to `url`.
    ///
    /// Must eventually report `Opened`, or `Failed` then `Closed`.
    fn open(&mut self, epoch: Epoch, url: &str);

    /// Send a text frame on the transport opened under `epoch`.
    ///
    /// Returns false if the frame could not be queued.
    fn send(&mut self, epoch: Epoch, text: String) -> bool;

    /// Close the transport opened under `epoch`. No further events for it.
    fn close(&mut self, epoch: Epoch, code: CloseCode, reason: &'static str);

    /// Report `ReconnectDue` under `epoch` after `delay`.
    fn schedule_reconnect(&mut self, epoch: Epoch, delay: Duration);

    /// Drop the timer scheduled under `epoch`.
    fn cancel_reconnect(&mut self, epoch: Epoch);
}

/// A connection bound to a driver.
///
/// Executes actions as they are produced and hands status transitions back
/// to the owning client for fan-out.
pub(crate) struct Link<T: Target, D: Driver> {
    pub(crate) conn: Connection<T>,
    pub(crate) driver: D,
    config: ClientConfig,
}

impl<T: Target, D: Driver> Link<T, D> {
    pub(crate) fn new(conn: Connection<T>, driver: D, config: ClientConfig) -> Self {
        Self { conn, driver, config }
    }

    pub(crate) fn connect(&mut self, target: T) -> Vec<ConnectionStatus> {
        let actions = self.conn.connect(target);
        self.execute(actions)
    }

    pub(crate) fn disconnect(&mut self) -> Vec<ConnectionStatus> {
        let actions = self.conn.disconnect();
        self.execute(actions)
    }

    pub(crate) fn handle(&mut self, epoch: Epoch, event: &TransportEvent) -> Vec<ConnectionStatus> {
        let actions = self.conn.handle(epoch, event);
        self.execute(actions)
    }

    /// Send on the current transport. False unless connected.
    pub(crate) fn send(&mut self, text: String) -> bool {
        if !self.conn.is_connected() {
            return false;
        }
        self.driver.send(self.conn.epoch(), text)
    }

    fn execute(&mut self, actions: Vec<ConnectionAction>) -> Vec<ConnectionStatus> {
        let mut statuses = Vec::new();

        for action in actions {
            match action {
                ConnectionAction::Open { epoch, path } => {
                    let url = self.config.endpoint(&path);
                    self.driver.open(epoch, &url);
                },
                ConnectionAction::Close { epoch, code, reason } => {
                    self.driver.close(epoch, code, reason);
                },
                ConnectionAction::ScheduleReconnect { epoch, delay, attempt } => {
                    debug!(epoch, attempt, ?delay, "reconnect scheduled");
                    self.driver.schedule_reconnect(epoch, delay);
                },
                ConnectionAction::CancelReconnect { epoch } => {
                    self.driver.cancel_reconnect(epoch);
                },
                ConnectionAction::Status(status) => statuses.push(status),
            }
        }

        statuses
    }
}
