//!
//! Queue disciplines that buffer packets in front of a link.
//!
//! A discipline admits packets on [`QueueDisc::enqueue`] and releases them on
//! [`QueueDisc::dequeue`]. Disciplines that need timers schedule a
//! [`RotationEvent`] through the [`EventSink`] passed to
//! [`QueueDisc::activate`], and must be handed every such event through
//! [`QueueDisc::handle_timer`].
//!

use crate::{net::Packet, runtime::EventSink};
use std::fmt::Display;

mod config;
pub use config::*;

mod queue;
pub use queue::*;

mod stats;
pub use stats::*;

mod calendar;
pub use calendar::*;

mod fifo;
pub use fifo::*;

/// A unique identifier of a discipline instance within a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QdiscId(pub u32);

impl Display for QdiscId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "qdisc#{}", self.0)
    }
}

/// A timer event addressed to the discipline with the given id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RotationEvent {
    /// The discipline that owns the timer.
    pub qdisc: QdiscId,
}

///
/// The contract between a queue discipline and the
/// component that drives it.
///
/// All operations are synchronous and read the current time
/// through [`SimTime::now`](crate::time::SimTime::now).
///
pub trait QueueDisc {
    /// The identifier of this instance.
    fn id(&self) -> QdiscId;

    /// A human readable name of the discipline kind.
    fn kind(&self) -> &'static str;

    /// Admits a packet.
    ///
    /// # Errors
    ///
    /// Hands the packet back if it was not admitted. Counting the
    /// drop is the callers responsibility.
    fn enqueue(&mut self, packet: Packet) -> Result<(), Packet>;

    /// Releases the next packet, if any.
    fn dequeue(&mut self) -> Option<Packet>;

    /// The packet the next [`QueueDisc::dequeue`] would return.
    fn peek(&self) -> Option<&Packet>;

    /// The number of buffered packets.
    fn packet_count(&self) -> usize;

    /// The number of buffered bytes.
    fn byte_count(&self) -> u64;

    /// Whether no packets are buffered.
    fn is_empty(&self) -> bool {
        self.packet_count() == 0
    }

    /// The dequeue statistics.
    fn stats(&self) -> &QueueStats;

    /// The aggregated statistics, labeled with [`QueueDisc::kind`].
    fn report(&self) -> StatsReport {
        self.stats().report(self.kind())
    }

    /// Starts the disciplines timers, if it has any.
    fn activate(&mut self, _sink: &mut dyn EventSink<RotationEvent>) {}

    /// Handles a timer event previously scheduled by this discipline.
    fn handle_timer(&mut self, _event: RotationEvent, _sink: &mut dyn EventSink<RotationEvent>) {}

    /// Cancels the disciplines timers. Calling this on an inactive
    /// discipline is a no-op.
    fn deactivate(&mut self, _sink: &mut dyn EventSink<RotationEvent>) {}
}
