//! Wake backend integration.
//!
//! Implements the `sake-core` network-adapter port against the
//! out-of-process wake server: a JSON request/response protocol keyed by
//! method name, multiplexing many sessions over one HTTP connection.

pub mod adapter;
pub mod client;
pub mod protocol;

pub use adapter::WakeAdapter;
pub use client::WakeClient;
pub use protocol::{BalanceEntry, WakeMethod, WakeRequest, WakeResponse};
