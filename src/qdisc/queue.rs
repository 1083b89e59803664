use super::QueueSize;
use crate::net::Packet;
use std::collections::VecDeque;

///
/// A bounded FIFO of packets, that rejects packets which
/// would exceed its capacity.
///
#[derive(Debug, Clone, PartialEq)]
pub struct DropTailQueue {
    packets: VecDeque<Packet>,
    bytes: u64,
    max_size: QueueSize,
}

impl DropTailQueue {
    /// Creates an empty queue with the given capacity.
    #[must_use]
    pub fn new(max_size: QueueSize) -> Self {
        Self {
            packets: VecDeque::new(),
            bytes: 0,
            max_size,
        }
    }

    /// The capacity of the queue.
    #[must_use]
    pub fn max_size(&self) -> QueueSize {
        self.max_size
    }

    /// Whether `packet` can be appended without exceeding the capacity.
    #[must_use]
    pub fn fits(&self, packet: &Packet) -> bool {
        match self.max_size {
            QueueSize::Bytes(max) => self.bytes + packet.size() <= max,
            QueueSize::Packets(max) => (self.packets.len() as u64) < max,
        }
    }

    /// Appends a packet, or hands it back if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the packet if it does not fit.
    pub fn enqueue(&mut self, packet: Packet) -> Result<(), Packet> {
        if !self.fits(&packet) {
            return Err(packet);
        }
        self.bytes += packet.size();
        self.packets.push_back(packet);
        Ok(())
    }

    /// Removes the head of the queue.
    pub fn dequeue(&mut self) -> Option<Packet> {
        let packet = self.packets.pop_front()?;
        self.bytes -= packet.size();
        Some(packet)
    }

    /// The head of the queue.
    #[must_use]
    pub fn peek(&self) -> Option<&Packet> {
        self.packets.front()
    }

    /// The number of queued bytes.
    #[must_use]
    pub fn byte_count(&self) -> u64 {
        self.bytes
    }

    /// The number of queued packets.
    #[must_use]
    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    /// Whether the queue holds no packets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

impl Default for DropTailQueue {
    fn default() -> Self {
        Self::new(QueueSize::Packets(1000))
    }
}
