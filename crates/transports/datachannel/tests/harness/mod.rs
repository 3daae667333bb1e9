//! Data channel test harness
//!
//! Provides a recording transport and a recording observer so integration
//! tests can drive channels through every transport event and check what
//! went out on the wire.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use remotemedia_datachannel::{
    ChannelKey, ChannelState, DataBuffer, DataChannelObserver, DataChannelProvider, MessageType,
    SendParams, SendResult, StreamId,
};

/// Install a debug-level subscriber once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// One message handed to the transport
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub params: SendParams,
    pub payload: Bytes,
}

impl SentMessage {
    pub fn is_control(&self) -> bool {
        self.params.message_type == MessageType::Control
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    transport_available: bool,
    ready_to_send: bool,
    /// Results consumed by upcoming sends; empty means Success
    scripted_results: VecDeque<SendResult>,
    /// Result used when the script is empty
    default_result: Option<SendResult>,
    sent: Vec<SentMessage>,
    connected: Vec<ChannelKey>,
    disconnected: Vec<ChannelKey>,
    streams_added: Vec<StreamId>,
    streams_removed: Vec<StreamId>,
}

/// Recording transport with scriptable send results
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<ProviderState>,
}

impl MockProvider {
    /// Transport exists and accepts data
    pub fn ready() -> Arc<Self> {
        let provider = Self::default();
        {
            let mut state = provider.state.lock();
            state.transport_available = true;
            state.ready_to_send = true;
        }
        Arc::new(provider)
    }

    /// Transport exists but is not writable yet
    pub fn not_ready() -> Arc<Self> {
        let provider = Self::default();
        provider.state.lock().transport_available = true;
        Arc::new(provider)
    }

    /// No transport at all; connects fail
    pub fn absent() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_transport_available(&self, available: bool) {
        self.state.lock().transport_available = available;
    }

    pub fn set_ready_to_send(&self, ready: bool) {
        self.state.lock().ready_to_send = ready;
    }

    /// Queue results for the next sends
    pub fn script(&self, results: impl IntoIterator<Item = SendResult>) {
        self.state.lock().scripted_results.extend(results);
    }

    /// Result for every send once the script runs out
    pub fn set_default_result(&self, result: SendResult) {
        self.state.lock().default_result = Some(result);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    pub fn sent_data(&self) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| !m.is_control()).collect()
    }

    pub fn sent_control(&self) -> Vec<SentMessage> {
        self.sent().into_iter().filter(SentMessage::is_control).collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    pub fn connected(&self) -> Vec<ChannelKey> {
        self.state.lock().connected.clone()
    }

    pub fn disconnected(&self) -> Vec<ChannelKey> {
        self.state.lock().disconnected.clone()
    }

    pub fn streams_added(&self) -> Vec<StreamId> {
        self.state.lock().streams_added.clone()
    }

    pub fn streams_removed(&self) -> Vec<StreamId> {
        self.state.lock().streams_removed.clone()
    }

    pub fn as_provider(self: &Arc<Self>) -> Arc<dyn DataChannelProvider> {
        Arc::clone(self) as Arc<dyn DataChannelProvider>
    }
}

impl DataChannelProvider for MockProvider {
    fn connect_data_channel(&self, channel: ChannelKey) -> bool {
        let mut state = self.state.lock();
        if !state.transport_available {
            return false;
        }
        state.connected.push(channel);
        true
    }

    fn disconnect_data_channel(&self, channel: ChannelKey) {
        self.state.lock().disconnected.push(channel);
    }

    fn add_stream(&self, id: StreamId) {
        self.state.lock().streams_added.push(id);
    }

    fn remove_stream(&self, id: StreamId) {
        self.state.lock().streams_removed.push(id);
    }

    fn ready_to_send(&self) -> bool {
        self.state.lock().ready_to_send
    }

    fn send(&self, params: &SendParams, payload: &Bytes) -> SendResult {
        let mut state = self.state.lock();
        let result = state
            .scripted_results
            .pop_front()
            .or(state.default_result)
            .unwrap_or(SendResult::Success);

        if result == SendResult::Success {
            state.sent.push(SentMessage {
                params: params.clone(),
                payload: payload.clone(),
            });
        }
        result
    }
}

#[derive(Debug, Default)]
struct ObserverLog {
    messages: Vec<DataBuffer>,
    states: Vec<ChannelState>,
    buffered_amount_changes: Vec<u64>,
}

/// Observer that records every callback; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<ObserverLog>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn DataChannelObserver> {
        Box::new(self.clone())
    }

    pub fn messages(&self) -> Vec<DataBuffer> {
        self.log.lock().messages.clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|m| m.as_text().map(str::to_string))
            .collect()
    }

    pub fn states(&self) -> Vec<ChannelState> {
        self.log.lock().states.clone()
    }

    pub fn buffered_amount_changes(&self) -> Vec<u64> {
        self.log.lock().buffered_amount_changes.clone()
    }
}

impl DataChannelObserver for RecordingObserver {
    fn on_message(&mut self, buffer: DataBuffer) {
        self.log.lock().messages.push(buffer);
    }

    fn on_state_change(&mut self, state: ChannelState) {
        self.log.lock().states.push(state);
    }

    fn on_buffered_amount_change(&mut self, previous_amount: u64) {
        self.log.lock().buffered_amount_changes.push(previous_amount);
    }
}
