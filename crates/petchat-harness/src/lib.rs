//! Test harness for the petchat socket clients.
//!
//! - [`SimDriver`]: a [`petchat_client::Driver`] that performs no I/O and
//!   records every call, so tests can assert on opened URLs, sent frames and
//!   timers, then inject the transport events a real socket would produce.
//! - [`SimEnv`]: a virtual clock that only moves when told to.
//! - [`RecordingReceipts`]: a read-receipt sink that remembers each request.
//! - [`frames`]: builders for the JSON frames the server pushes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod frames;
pub mod receipts;
pub mod sim_driver;
pub mod sim_env;

pub use receipts::RecordingReceipts;
pub use sim_driver::{DriverCall, SimDriver};
pub use sim_env::{SimEnv, SimInstant};
