use super::{DropTailQueue, FifoQueueConfig, QdiscId, QueueDisc, QueueStats};
use crate::{net::Packet, time::SimTime};
use tracing::{debug, trace};

///
/// A single queue discipline with strict FIFO order.
///
/// Packets are timestamped and accounted exactly like in the
/// [`CalendarQueueDisc`](super::CalendarQueueDisc), so both disciplines
/// yield comparable statistics.
///
#[derive(Debug, Clone)]
pub struct FifoQueueDisc {
    id: QdiscId,
    queue: DropTailQueue,
    stats: QueueStats,
}

impl FifoQueueDisc {
    /// Creates an empty FIFO discipline.
    #[must_use]
    pub fn new(id: QdiscId, config: FifoQueueConfig) -> Self {
        Self {
            id,
            queue: DropTailQueue::new(config.max_size),
            stats: QueueStats::new(config.timeout_threshold),
        }
    }
}

impl QueueDisc for FifoQueueDisc {
    fn id(&self) -> QdiscId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "FIFO Queue"
    }

    fn enqueue(&mut self, mut packet: Packet) -> Result<(), Packet> {
        if !self.queue.fits(&packet) {
            debug!(qdisc = %self.id, packet = packet.id(), "queue limit reached, dropping");
            return Err(packet);
        }

        packet.tags.set_timestamp_if_absent(SimTime::now());
        trace!(qdisc = %self.id, packet = packet.id(), "enqueued {} bytes", packet.size());
        self.queue.enqueue(packet)
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let Some(mut packet) = self.queue.dequeue() else {
            trace!(qdisc = %self.id, "queue empty");
            return None;
        };
        self.stats.record_dequeue(&mut packet, SimTime::now());
        trace!(qdisc = %self.id, packet = packet.id(), "popped packet");
        Some(packet)
    }

    fn peek(&self) -> Option<&Packet> {
        self.queue.peek()
    }

    fn packet_count(&self) -> usize {
        self.queue.packet_count()
    }

    fn byte_count(&self) -> u64 {
        self.queue.byte_count()
    }

    fn stats(&self) -> &QueueStats {
        &self.stats
    }
}
