//! Observer contract for channel events, plus an mpsc-backed adapter

use tokio::sync::mpsc;
use tracing::trace;

use crate::channels::{ChannelState, DataBuffer};

/// Receives everything a channel reports to the application
///
/// Callbacks run on the channel's owning context and must not block.
pub trait DataChannelObserver: Send {
    /// An application message was delivered
    fn on_message(&mut self, buffer: DataBuffer);

    /// The channel moved to `state`
    fn on_state_change(&mut self, state: ChannelState);

    /// The number of queued outbound bytes changed; `previous_amount` is the
    /// value before the change
    fn on_buffered_amount_change(&mut self, previous_amount: u64);
}

/// Event emitted by [`ChannelEventSender`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(DataBuffer),
    StateChange(ChannelState),
    BufferedAmountChange { previous_amount: u64 },
}

/// Observer that forwards every callback into an unbounded channel
///
/// Useful when the consumer lives in an async task.
#[derive(Debug, Clone)]
pub struct ChannelEventSender {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl ChannelEventSender {
    /// Create the observer and the receiving end of its event stream
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ChannelEvent) {
        if self.tx.send(event).is_err() {
            trace!("Channel event receiver dropped");
        }
    }
}

impl DataChannelObserver for ChannelEventSender {
    fn on_message(&mut self, buffer: DataBuffer) {
        self.emit(ChannelEvent::Message(buffer));
    }

    fn on_state_change(&mut self, state: ChannelState) {
        self.emit(ChannelEvent::StateChange(state));
    }

    fn on_buffered_amount_change(&mut self, previous_amount: u64) {
        self.emit(ChannelEvent::BufferedAmountChange { previous_amount });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_forwarded_in_order() {
        let (mut observer, mut rx) = ChannelEventSender::channel();

        observer.on_state_change(ChannelState::Open);
        observer.on_message(DataBuffer::text("hi"));
        observer.on_buffered_amount_change(42);

        assert_eq!(rx.recv().await, Some(ChannelEvent::StateChange(ChannelState::Open)));
        assert_eq!(rx.recv().await, Some(ChannelEvent::Message(DataBuffer::text("hi"))));
        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::BufferedAmountChange { previous_amount: 42 })
        );
    }

    #[test]
    fn test_dropped_receiver_is_tolerated() {
        let (mut observer, rx) = ChannelEventSender::channel();
        drop(rx);
        observer.on_state_change(ChannelState::Closed);
    }
}
