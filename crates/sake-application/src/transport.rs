//! UI transport abstraction.
//!
//! The bridge does not know what renders the UI; it hands every outbound
//! envelope to an injected transport. Delivery is fire-and-forget from the
//! bridge's point of view: a gone receiver must never fail a session
//! operation.

use crate::message::UiMessage;
use tokio::sync::mpsc;

/// Outbound half of the process boundary.
pub trait UiTransport: Send + Sync {
    fn send(&self, message: UiMessage);
}

/// Transport backed by an in-process channel.
///
/// The production host forwards the receiver's items over its actual IPC
/// mechanism; tests read them directly.
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<UiMessage>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl UiTransport for ChannelTransport {
    fn send(&self, message: UiMessage) {
        // Receiver gone means no UI is attached; skip silently.
        let _ = self.sender.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StateId;
    use serde_json::json;

    #[test]
    fn test_messages_arrive_in_send_order() {
        let (transport, mut receiver) = ChannelTransport::new();
        transport.send(UiMessage::StateUpdate {
            state_id: StateId::Accounts,
            payload: json!([1]),
        });
        transport.send(UiMessage::StateUpdate {
            state_id: StateId::History,
            payload: json!([2]),
        });

        let first = receiver.try_recv().unwrap();
        let second = receiver.try_recv().unwrap();
        assert!(matches!(
            first,
            UiMessage::StateUpdate {
                state_id: StateId::Accounts,
                ..
            }
        ));
        assert!(matches!(
            second,
            UiMessage::StateUpdate {
                state_id: StateId::History,
                ..
            }
        ));
    }

    #[test]
    fn test_send_without_receiver_does_not_panic() {
        let (transport, receiver) = ChannelTransport::new();
        drop(receiver);
        transport.send(UiMessage::StateUpdate {
            state_id: StateId::Chains,
            payload: json!([]),
        });
    }
}
