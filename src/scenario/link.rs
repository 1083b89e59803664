use crate::{
    net::Packet,
    qdisc::QueueDisc,
    runtime::EventSink,
    time::{Duration, SimTime},
};
use tracing::trace;

/// The event that marks the end of a transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionDone;

///
/// A point-to-point link that drains a queue discipline.
///
/// While idle the link pulls the next packet from the discipline and
/// stays busy for the packets serialization time.
///
#[derive(Debug)]
pub struct Link {
    bitrate: u64,
    transmitting: Option<Packet>,
    busy_time: Duration,
    packets: u64,
    bytes: u64,
}

impl Link {
    /// Creates an idle link with a bitrate in bit/s.
    #[must_use]
    pub fn new(bitrate: u64) -> Self {
        Self {
            bitrate,
            transmitting: None,
            busy_time: Duration::ZERO,
            packets: 0,
            bytes: 0,
        }
    }

    /// Whether no packet is on the wire.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.transmitting.is_none()
    }

    /// The time the link spent transmitting.
    #[must_use]
    pub fn busy_time(&self) -> Duration {
        self.busy_time
    }

    /// The number of fully transmitted packets.
    #[must_use]
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// The number of fully transmitted bytes.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// The time to serialize a packet onto the link.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn transmission_time(&self, packet: &Packet) -> Duration {
        Duration::from_secs_f64(packet.bit_len() as f64 / self.bitrate as f64)
    }

    ///
    /// Starts the next transmission if the link is idle and the
    /// discipline has a packet. Returns whether a transmission started.
    ///
    pub fn pull<S>(&mut self, qdisc: &mut dyn QueueDisc, sink: &mut S) -> bool
    where
        S: EventSink<TransmissionDone> + ?Sized,
    {
        if !self.is_idle() {
            return false;
        }
        let Some(packet) = qdisc.dequeue() else {
            return false;
        };

        let dur = self.transmission_time(&packet);
        trace!(packet = packet.id(), "transmitting for {:?}", dur);
        self.busy_time += dur;
        sink.add(TransmissionDone, SimTime::now() + dur);
        self.transmitting = Some(packet);
        true
    }

    /// Completes the current transmission and returns the transmitted packet.
    pub fn complete(&mut self) -> Option<Packet> {
        let packet = self.transmitting.take()?;
        self.packets += 1;
        self.bytes += packet.size();
        Some(packet)
    }
}
