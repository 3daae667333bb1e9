//! Owning execution context of a group of channels
//!
//! Channels never call themselves back re-entrantly. Work that must happen
//! after the current call returns (the deferred ready notification issued at
//! creation) is posted here as a [`ChannelTask`] and run later by whoever
//! owns the channels.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::provider::ChannelKey;

/// What a posted task does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Treat the transport as writable (`on_channel_ready(true)`)
    ChannelReady,
}

/// Deferred work for one channel
///
/// The token is cancelled when the target channel is dropped, turning the
/// task into a no-op.
#[derive(Debug, Clone)]
pub struct ChannelTask {
    key: ChannelKey,
    kind: TaskKind,
    token: CancellationToken,
}

impl ChannelTask {
    pub(crate) fn new(key: ChannelKey, kind: TaskKind, token: CancellationToken) -> Self {
        Self { key, kind, token }
    }

    /// Channel this task targets
    pub fn key(&self) -> ChannelKey {
        self.key
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// True once the target channel no longer exists
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Cloneable handle for posting tasks
#[derive(Debug, Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<ChannelTask>,
}

impl TaskSender {
    /// Post a task; returns false if the queue is gone
    pub fn post(&self, task: ChannelTask) -> bool {
        self.tx.send(task).is_ok()
    }
}

/// FIFO of posted tasks
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<ChannelTask>,
    rx: mpsc::UnboundedReceiver<ChannelTask>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Handle for channels to post into this queue
    pub fn sender(&self) -> TaskSender {
        TaskSender {
            tx: self.tx.clone(),
        }
    }

    /// Next task, if one is already queued
    pub fn try_next(&mut self) -> Option<ChannelTask> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next task
    pub async fn next(&mut self) -> Option<ChannelTask> {
        self.rx.recv().await
    }
}
