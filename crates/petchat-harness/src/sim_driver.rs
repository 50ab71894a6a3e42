//! Recording driver.
//!
//! `SimDriver` stands in for the websocket driver in tests. It never reports
//! events on its own: the test decides when a transport opens, closes or a
//! timer fires, and feeds that to the client with `handle(epoch, event)`.
//! Clones share the same record, so a test can keep one clone while the
//! client owns another.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use petchat_client::Driver;
use petchat_core::Epoch;
use petchat_proto::CloseCode;

/// One call made on the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `open`
    Open {
        /// Epoch.
        epoch: Epoch,
        /// Full URL.
        url: String,
    },
    /// `send`
    Send {
        /// Epoch.
        epoch: Epoch,
        /// Frame text.
        text: String,
    },
    /// `close`
    Close {
        /// Epoch.
        epoch: Epoch,
        /// Close code.
        code: CloseCode,
        /// Close reason.
        reason: &'static str,
    },
    /// `schedule_reconnect`
    Schedule {
        /// Epoch.
        epoch: Epoch,
        /// Delay.
        delay: Duration,
    },
    /// `cancel_reconnect`
    Cancel {
        /// Epoch.
        epoch: Epoch,
    },
}

#[derive(Debug)]
struct SharedState {
    calls: Vec<DriverCall>,
    /// Transports opened and not yet closed.
    open: BTreeMap<Epoch, String>,
    /// Timers scheduled and not yet cancelled or taken.
    timers: BTreeMap<Epoch, Duration>,
    accept_sends: bool,
}

/// Driver that records calls instead of doing I/O.
#[derive(Debug, Clone)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a driver whose sends succeed.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SharedState {
                calls: Vec::new(),
                open: BTreeMap::new(),
                timers: BTreeMap::new(),
                accept_sends: true,
            })),
        }
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_accept_sends(&self, accept: bool) {
        self.state.lock().accept_sends = accept;
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Drain the call record.
    pub fn take_calls(&self) -> Vec<DriverCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Texts of every accepted send, oldest first.
    pub fn sent_frames(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// URLs of every `open`, oldest first.
    pub fn opened_urls(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Open { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Epochs of transports opened and not closed.
    pub fn open_transports(&self) -> Vec<Epoch> {
        self.state.lock().open.keys().copied().collect()
    }

    /// Outstanding timers as `(epoch, delay)`.
    pub fn pending_timers(&self) -> Vec<(Epoch, Duration)> {
        self.state.lock().timers.iter().map(|(e, d)| (*e, *d)).collect()
    }

    /// Remove and return the outstanding timer, as if it fired.
    pub fn fire_timer(&self) -> Option<Epoch> {
        self.state.lock().timers.pop_first().map(|(epoch, _)| epoch)
    }

    /// Forget a transport, as if it closed on its own.
    pub fn drop_transport(&self, epoch: Epoch) {
        self.state.lock().open.remove(&epoch);
    }
}

impl Driver for SimDriver {
    fn open(&mut self, epoch: Epoch, url: &str) {
        let mut state = self.state.lock();
        state.open.insert(epoch, url.to_string());
        state.calls.push(DriverCall::Open { epoch, url: url.to_string() });
    }

    fn send(&mut self, epoch: Epoch, text: String) -> bool {
        let mut state = self.state.lock();
        if !state.accept_sends || !state.open.contains_key(&epoch) {
            return false;
        }
        state.calls.push(DriverCall::Send { epoch, text });
        true
    }

    fn close(&mut self, epoch: Epoch, code: CloseCode, reason: &'static str) {
        let mut state = self.state.lock();
        state.open.remove(&epoch);
        state.calls.push(DriverCall::Close { epoch, code, reason });
    }

    fn schedule_reconnect(&mut self, epoch: Epoch, delay: Duration) {
        let mut state = self.state.lock();
        state.timers.insert(epoch, delay);
        state.calls.push(DriverCall::Schedule { epoch, delay });
    }

    fn cancel_reconnect(&mut self, epoch: Epoch) {
        let mut state = self.state.lock();
        state.timers.remove(&epoch);
        state.calls.push(DriverCall::Cancel { epoch });
    }
}
