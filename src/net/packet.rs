use super::tags::{DeadlineTag, FlowClass, PacketTags};
use std::fmt::Display;

///
/// A packet in flight.
///
/// The payload is opaque, only its byte size matters. Annotations
/// are attached through [`PacketTags`] and may be modified by the
/// queue disciplines a packet passes through.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    id: u64,
    size: u64,
    /// The annotations carried by this packet.
    pub tags: PacketTags,
}

impl Packet {
    /// Creates a new untagged packet.
    #[must_use]
    pub fn new(id: u64, size: u64) -> Self {
        Self {
            id,
            size,
            tags: PacketTags::new(),
        }
    }

    /// Creates a latency sensitive packet.
    #[must_use]
    pub fn prefill(id: u64, size: u64) -> Self {
        let mut packet = Self::new(id, size);
        packet.tags.set_flow_class(FlowClass::Prefill);
        packet
    }

    /// Creates a deadline bound packet with a relative deadline in seconds.
    #[must_use]
    pub fn decode(id: u64, size: u64, deadline: f64) -> Self {
        let mut packet = Self::new(id, size);
        packet.tags.set_flow_class(FlowClass::Decode);
        packet.tags.set_deadline(DeadlineTag::new(deadline));
        packet
    }

    /// The packet identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The size of the packet in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The size of the packet in bits.
    #[must_use]
    pub fn bit_len(&self) -> u64 {
        self.size * 8
    }

    /// Shorthand for the flow class tag.
    #[must_use]
    pub fn flow_class(&self) -> Option<FlowClass> {
        self.tags.flow_class()
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Packet #{} ({} bytes)", self.id, self.size)?;
        if !self.tags.is_empty() {
            write!(f, " [{}]", self.tags)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let p = Packet::prefill(1, 8500);
        assert_eq!(p.flow_class(), Some(FlowClass::Prefill));
        assert!(p.tags.deadline().is_none());
        assert_eq!(p.bit_len(), 68_000);

        let d = Packet::decode(2, 2560, 5.0);
        assert_eq!(d.flow_class(), Some(FlowClass::Decode));
        assert_eq!(d.tags.deadline().map(|d| d.as_secs_f64()), Some(5.0));
        assert_eq!(
            d.to_string(),
            "Packet #2 (2560 bytes) [FlowType=DECODE Deadline=5s]"
        );

        assert_eq!(Packet::new(3, 10).to_string(), "Packet #3 (10 bytes)");
    }
}
