//! Orchestration layer of Sake.
//!
//! Wires the domain layer to its surroundings: the state bridge relaying
//! the active session to a detached UI, the transport abstraction over the
//! process boundary, and the `SakeContext` use-case object composing
//! registry, persistence, bridge and adapter factory.

pub mod bridge;
pub mod context;
pub mod message;
pub mod transport;

pub use crate::bridge::StateBridge;
pub use crate::context::{AdapterFactory, SakeContext, WakeAdapterFactory};
pub use crate::message::{StateId, UiMessage, UiRequest};
pub use crate::transport::{ChannelTransport, UiTransport};
