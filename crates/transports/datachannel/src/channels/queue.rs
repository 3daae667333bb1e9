//! Byte-accounted FIFO of data buffers

use std::collections::VecDeque;

use super::messages::DataBuffer;

/// Ordered queue of whole messages with a cached byte total
///
/// `byte_count()` always equals the summed length of the queued buffers.
/// Entries are never split; a buffer is either queued or gone.
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: VecDeque<DataBuffer>,
    byte_count: usize,
}

impl PacketQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back
    pub fn push(&mut self, buffer: DataBuffer) {
        self.byte_count += buffer.len();
        self.packets.push_back(buffer);
    }

    /// Remove and return the oldest buffer
    pub fn pop_front(&mut self) -> Option<DataBuffer> {
        let buffer = self.packets.pop_front()?;
        self.byte_count -= buffer.len();
        Some(buffer)
    }

    /// Peek at the oldest buffer
    pub fn front(&self) -> Option<&DataBuffer> {
        self.packets.front()
    }

    /// Drop every buffer
    pub fn clear(&mut self) {
        self.packets.clear();
        self.byte_count = 0;
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Number of queued buffers
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Total payload bytes queued
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Exchange contents with `other` without copying buffers
    pub fn swap(&mut self, other: &mut PacketQueue) {
        std::mem::swap(self, other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_is_fifo() {
        let mut queue = PacketQueue::new();
        queue.push(DataBuffer::text("a"));
        queue.push(DataBuffer::text("bb"));
        queue.push(DataBuffer::text("ccc"));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.byte_count(), 6);
        assert_eq!(queue.front().and_then(|b| b.as_text()), Some("a"));

        assert_eq!(queue.pop_front().unwrap().as_text(), Some("a"));
        assert_eq!(queue.byte_count(), 5);
        assert_eq!(queue.pop_front().unwrap().as_text(), Some("bb"));
        assert_eq!(queue.pop_front().unwrap().as_text(), Some("ccc"));
        assert_eq!(queue.byte_count(), 0);
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_zero_length_entries_are_counted_as_entries() {
        let mut queue = PacketQueue::new();
        queue.push(DataBuffer::binary(Vec::new()));
        assert!(!queue.is_empty());
        assert_eq!(queue.byte_count(), 0);
    }

    #[test]
    fn test_clear_resets_byte_count() {
        let mut queue = PacketQueue::new();
        queue.push(DataBuffer::binary(vec![0u8; 128]));
        queue.push(DataBuffer::binary(vec![0u8; 64]));
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.byte_count(), 0);
        assert!(queue.front().is_none());
    }

    #[test]
    fn test_swap_exchanges_contents_and_counts() {
        let mut control = PacketQueue::new();
        control.push(DataBuffer::binary(vec![0x03; 12]));

        let mut drained = PacketQueue::new();
        drained.swap(&mut control);

        assert!(control.is_empty());
        assert_eq!(control.byte_count(), 0);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained.byte_count(), 12);
    }
}
