//! Event pump for one socket client.

use petchat_core::{Epoch, TransportEvent};
use tokio::sync::mpsc;

use super::DriverEvent;
use crate::{Disconnect, Driver, NotificationSocket, RoomSocket};

/// A socket client that accepts transport events.
pub trait Socket: Disconnect {
    /// Feed one event reported under `epoch`.
    fn handle(&mut self, epoch: Epoch, event: TransportEvent);
}

impl<D: Driver> Socket for RoomSocket<D> {
    fn handle(&mut self, epoch: Epoch, event: TransportEvent) {
        RoomSocket::handle(self, epoch, event);
    }
}

impl<D: Driver> Socket for NotificationSocket<D> {
    fn handle(&mut self, epoch: Epoch, event: TransportEvent) {
        NotificationSocket::handle(self, epoch, event);
    }
}

/// Owns a socket client and the channel its driver reports on.
///
/// All state changes happen on the task that calls [`Runtime::turn`], so
/// handlers run there in transport order. Dropping the runtime disconnects
/// the client.
pub struct Runtime<S: Socket> {
    socket: S,
    events: mpsc::UnboundedReceiver<DriverEvent>,
}

impl<S: Socket> Runtime<S> {
    /// Wrap `socket`, whose driver posts to `events`.
    pub fn new(socket: S, events: mpsc::UnboundedReceiver<DriverEvent>) -> Self {
        Self { socket, events }
    }

    /// Wait for the next driver event and feed it to the client.
    ///
    /// Returns false once the driver is gone.
    pub async fn turn(&mut self) -> bool {
        match self.events.recv().await {
            Some(DriverEvent { epoch, event }) => {
                self.socket.handle(epoch, event);
                true
            },
            None => false,
        }
    }

    /// Feed every event that is already queued. Returns how many were fed.
    pub fn drain(&mut self) -> usize {
        let mut fed = 0;
        while let Ok(DriverEvent { epoch, event }) = self.events.try_recv() {
            self.socket.handle(epoch, event);
            fed += 1;
        }
        fed
    }

    /// The client.
    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// The client, mutably.
    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }
}

impl<S: Socket> Drop for Runtime<S> {
    fn drop(&mut self) {
        self.socket.disconnect();
    }
}
