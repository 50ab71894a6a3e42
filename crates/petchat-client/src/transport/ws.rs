//! WebSocket driver on tokio-tungstenite.
//!
//! One task per transport. The task owns the split stream and selects over
//! inbound frames and outbound commands; it never touches client state and
//! only posts [`DriverEvent`]s. A transport that ends on its own reports
//! `Failed` (if there was an error) then `Closed`; a transport closed by the
//! client ends silently, including one still in its handshake.

use std::{collections::HashMap, time::Duration};

use futures_util::{SinkExt, StreamExt};
use petchat_core::{Environment, Epoch, TransportEvent};
use petchat_proto::CloseCode;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
        protocol::{CloseFrame, frame::coding::CloseCode as WsCloseCode},
    },
};
use tracing::{debug, trace, warn};

use crate::Driver;

/// A transport event tagged with the epoch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverEvent {
    /// Epoch the transport or timer was created under.
    pub epoch: Epoch,
    /// What happened.
    pub event: TransportEvent,
}

enum Outgoing {
    Text(String),
    Close { code: CloseCode, reason: &'static str },
}

struct Transport {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    task: JoinHandle<()>,
}

/// [`Driver`] backed by tokio-tungstenite.
///
/// Must be created and used inside a tokio runtime.
pub struct WsDriver<E: Environment> {
    env: E,
    token: Option<String>,
    events: mpsc::UnboundedSender<DriverEvent>,
    transports: HashMap<Epoch, Transport>,
    timers: HashMap<Epoch, JoinHandle<()>>,
}

impl<E: Environment> WsDriver<E> {
    /// Create a driver and the receiver its events arrive on.
    ///
    /// `token`, if set, is sent as `Authorization: Token <token>` on every
    /// handshake.
    pub fn new(env: E, token: Option<String>) -> (Self, mpsc::UnboundedReceiver<DriverEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver =
            Self { env, token, events, transports: HashMap::new(), timers: HashMap::new() };
        (driver, rx)
    }

    /// Number of transports whose task is still running.
    pub fn live_transports(&self) -> usize {
        self.transports.values().filter(|t| !t.task.is_finished()).count()
    }

    fn request(
        &self,
        url: &str,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, String> {
        let mut request = url.into_client_request().map_err(|err| err.to_string())?;

        if let Some(token) = &self.token {
            let value =
                HeaderValue::from_str(&format!("Token {token}")).map_err(|err| err.to_string())?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        Ok(request)
    }
}

impl<E: Environment> Driver for WsDriver<E> {
    fn open(&mut self, epoch: Epoch, url: &str) {
        self.transports.retain(|_, t| !t.task.is_finished());

        let events = self.events.clone();
        let (outgoing, commands) = mpsc::unbounded_channel();

        let task = match self.request(url) {
            Ok(request) => {
                debug!(epoch, url, "opening websocket");
                tokio::spawn(run_transport(epoch, request, commands, events))
            },
            Err(reason) => {
                warn!(epoch, url, %reason, "cannot build websocket request");
                tokio::spawn(async move {
                    post(&events, epoch, TransportEvent::Failed { reason });
                    post(&events, epoch, TransportEvent::Closed { code: CloseCode::ABNORMAL });
                })
            },
        };

        self.transports.insert(epoch, Transport { outgoing, task });
    }

    fn send(&mut self, epoch: Epoch, text: String) -> bool {
        self.transports
            .get(&epoch)
            .is_some_and(|transport| transport.outgoing.send(Outgoing::Text(text)).is_ok())
    }

    fn close(&mut self, epoch: Epoch, code: CloseCode, reason: &'static str) {
        let Some(transport) = self.transports.remove(&epoch) else {
            return;
        };

        trace!(epoch, %code, reason, "closing websocket");
        if transport.outgoing.send(Outgoing::Close { code, reason }).is_err() {
            transport.task.abort();
        }
    }

    fn schedule_reconnect(&mut self, epoch: Epoch, delay: Duration) {
        self.timers.retain(|_, timer| !timer.is_finished());

        let env = self.env.clone();
        let events = self.events.clone();
        let timer = tokio::spawn(async move {
            env.sleep(delay).await;
            post(&events, epoch, TransportEvent::ReconnectDue);
        });

        if let Some(previous) = self.timers.insert(epoch, timer) {
            previous.abort();
        }
    }

    fn cancel_reconnect(&mut self, epoch: Epoch) {
        if let Some(timer) = self.timers.remove(&epoch) {
            timer.abort();
        }
    }
}

impl<E: Environment> Drop for WsDriver<E> {
    fn drop(&mut self) {
        for (_, transport) in self.transports.drain() {
            transport.task.abort();
        }
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

impl<E: Environment> std::fmt::Debug for WsDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsDriver")
            .field("transports", &self.transports.keys().collect::<Vec<_>>())
            .field("timers", &self.timers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn post(events: &mpsc::UnboundedSender<DriverEvent>, epoch: Epoch, event: TransportEvent) {
    // Receiver gone means the owner shut down.
    let _ = events.send(DriverEvent { epoch, event });
}

async fn run_transport(
    epoch: Epoch,
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    mut commands: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<DriverEvent>,
) {
    let handshake = connect_async(request);
    tokio::pin!(handshake);

    let stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok((stream, _response)) => break stream,
                Err(err) => {
                    debug!(epoch, error = %err, "websocket handshake failed");
                    post(&events, epoch, TransportEvent::Failed { reason: err.to_string() });
                    post(&events, epoch, TransportEvent::Closed { code: CloseCode::ABNORMAL });
                    return;
                },
            },
            command = commands.recv() => match command {
                Some(Outgoing::Text(_)) => trace!(epoch, "dropping frame queued before open"),
                Some(Outgoing::Close { .. }) | None => {
                    debug!(epoch, "websocket abandoned during handshake");
                    return;
                },
            },
        }
    };

    post(&events, epoch, TransportEvent::Opened);
    let (mut write, mut read) = stream.split();

    let code = loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    post(&events, epoch, TransportEvent::Text(text.as_str().to_owned()));
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map_or(CloseCode::NO_STATUS, |f| CloseCode(u16::from(f.code)));
                },
                Some(Ok(_)) => {},
                Some(Err(err)) => {
                    post(&events, epoch, TransportEvent::Failed { reason: err.to_string() });
                    break CloseCode::ABNORMAL;
                },
                None => break CloseCode::ABNORMAL,
            },
            command = commands.recv() => match command {
                Some(Outgoing::Text(text)) => {
                    if let Err(err) = write.send(Message::Text(text.into())).await {
                        post(&events, epoch, TransportEvent::Failed { reason: err.to_string() });
                        break CloseCode::ABNORMAL;
                    }
                },
                Some(Outgoing::Close { code, reason }) => {
                    let code = WsCloseCode::from(code.0);
                    let frame = CloseFrame { code, reason: reason.into() };
                    if let Err(err) = write.send(Message::Close(Some(frame))).await {
                        trace!(epoch, error = %err, "close frame not delivered");
                    }
                    return;
                },
                None => return,
            },
        }
    };

    debug!(epoch, %code, "websocket closed");
    post(&events, epoch, TransportEvent::Closed { code });
}
