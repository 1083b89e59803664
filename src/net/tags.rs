//!
//! Typed side-channel annotations that travel with a packet.
//!
//! Every tag is optional. Readers receive an `Option` and must handle
//! absence explicitly. Each tag has a fixed-size byte encoding, and the
//! whole set can be encoded as a list of `(type, payload)` records.
//!

use crate::time::{Duration, SimTime};
use std::{error::Error, fmt::Display};

///
/// A tag with a fixed-size wire encoding.
///
pub trait Tag: Sized {
    /// The record type byte used in a tag list.
    const TYPE_ID: u8;
    /// The number of payload bytes.
    const SERIALIZED_SIZE: usize;

    /// Writes the payload into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Truncated`] if `buf` is smaller than
    /// [`Tag::SERIALIZED_SIZE`].
    fn serialize(&self, buf: &mut [u8]) -> Result<(), TagError>;

    /// Reads a payload from `buf`.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` is too short or holds an invalid value.
    fn deserialize(buf: &[u8]) -> Result<Self, TagError>;
}

/// An error while encoding or decoding tags.
#[derive(Debug, Clone, PartialEq)]
pub enum TagError {
    /// The buffer is shorter than the encoding requires.
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        found: usize,
    },
    /// A flow class byte other than 0 or 1.
    InvalidFlowClass(u8),
    /// A time value that is negative, not finite or out of range.
    InvalidTime(f64),
    /// A record type byte that names no known tag.
    UnknownTag(u8),
    /// The same tag type occurs twice in one tag list.
    DuplicateTag(u8),
}

impl Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { expected, found } => {
                write!(f, "truncated tag: expected {expected} bytes, found {found}")
            }
            Self::InvalidFlowClass(b) => write!(f, "invalid flow class byte {b}"),
            Self::InvalidTime(v) => write!(f, "invalid time value {v}"),
            Self::UnknownTag(t) => write!(f, "unknown tag type {t}"),
            Self::DuplicateTag(t) => write!(f, "duplicate tag type {t}"),
        }
    }
}

impl Error for TagError {}

fn check_len(buf: &[u8], expected: usize) -> Result<(), TagError> {
    if buf.len() < expected {
        Err(TagError::Truncated {
            expected,
            found: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn write_f64(buf: &mut [u8], value: f64) -> Result<(), TagError> {
    check_len(buf, 8)?;
    buf[..8].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

fn read_secs(buf: &[u8]) -> Result<f64, TagError> {
    check_len(buf, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    let value = f64::from_le_bytes(bytes);
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(TagError::InvalidTime(value))
    }
}

/// Like [`read_secs`], additionally rejecting values a [`Duration`] cannot hold.
fn read_duration(buf: &[u8]) -> Result<Duration, TagError> {
    let secs = read_secs(buf)?;
    Duration::try_from_secs_f64(secs).map_err(|_| TagError::InvalidTime(secs))
}

///
/// The scheduling class of a flow.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowClass {
    /// Latency sensitive traffic, scheduled as early as possible.
    Prefill = 0,
    /// Deadline bound traffic, scheduled as late as its deadline allows.
    Decode = 1,
}

impl Tag for FlowClass {
    const TYPE_ID: u8 = 1;
    const SERIALIZED_SIZE: usize = 1;

    fn serialize(&self, buf: &mut [u8]) -> Result<(), TagError> {
        check_len(buf, 1)?;
        buf[0] = *self as u8;
        Ok(())
    }

    fn deserialize(buf: &[u8]) -> Result<Self, TagError> {
        check_len(buf, 1)?;
        match buf[0] {
            0 => Ok(Self::Prefill),
            1 => Ok(Self::Decode),
            b => Err(TagError::InvalidFlowClass(b)),
        }
    }
}

impl Display for FlowClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefill => write!(f, "FlowType=PREFILL"),
            Self::Decode => write!(f, "FlowType=DECODE"),
        }
    }
}

///
/// The relative deadline of a deadline bound packet, in seconds.
///
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DeadlineTag(f64);

impl DeadlineTag {
    /// Creates a new deadline. Negative or non-finite values are clamped to zero.
    #[must_use]
    pub fn new(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(secs)
        } else {
            Self(0.0)
        }
    }

    /// The deadline in seconds.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }
}

impl Tag for DeadlineTag {
    const TYPE_ID: u8 = 2;
    const SERIALIZED_SIZE: usize = 8;

    fn serialize(&self, buf: &mut [u8]) -> Result<(), TagError> {
        write_f64(buf, self.0)
    }

    fn deserialize(buf: &[u8]) -> Result<Self, TagError> {
        read_secs(buf).map(Self)
    }
}

impl Display for DeadlineTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Deadline={}s", self.0)
    }
}

///
/// The time a packet was first admitted into a queue discipline.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimestampTag(pub SimTime);

impl Tag for TimestampTag {
    const TYPE_ID: u8 = 3;
    const SERIALIZED_SIZE: usize = 8;

    fn serialize(&self, buf: &mut [u8]) -> Result<(), TagError> {
        write_f64(buf, self.0.as_secs_f64())
    }

    fn deserialize(buf: &[u8]) -> Result<Self, TagError> {
        read_duration(buf).map(|offset| Self(SimTime::from_duration(offset)))
    }
}

impl Display for TimestampTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Timestamp={}", self.0)
    }
}

///
/// The slack a deadline bound packet has consumed beyond the timeout
/// threshold on previous passes through a queue discipline.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DelayBudgetTag(pub Duration);

impl Tag for DelayBudgetTag {
    const TYPE_ID: u8 = 4;
    const SERIALIZED_SIZE: usize = 8;

    fn serialize(&self, buf: &mut [u8]) -> Result<(), TagError> {
        write_f64(buf, self.0.as_secs_f64())
    }

    fn deserialize(buf: &[u8]) -> Result<Self, TagError> {
        read_duration(buf).map(Self)
    }
}

impl Display for DelayBudgetTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DelayBudget={:?}", self.0)
    }
}

///
/// The set of annotations attached to a packet.
///
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PacketTags {
    flow_class: Option<FlowClass>,
    deadline: Option<DeadlineTag>,
    timestamp: Option<TimestampTag>,
    delay_budget: Option<DelayBudgetTag>,
}

impl PacketTags {
    /// An empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flow_class: None,
            deadline: None,
            timestamp: None,
            delay_budget: None,
        }
    }

    /// The flow class, if tagged.
    #[must_use]
    pub fn flow_class(&self) -> Option<FlowClass> {
        self.flow_class
    }

    /// Sets the flow class.
    pub fn set_flow_class(&mut self, class: FlowClass) {
        self.flow_class = Some(class);
    }

    /// The deadline, if tagged.
    #[must_use]
    pub fn deadline(&self) -> Option<DeadlineTag> {
        self.deadline
    }

    /// Sets the deadline.
    pub fn set_deadline(&mut self, deadline: DeadlineTag) {
        self.deadline = Some(deadline);
    }

    /// The first admission time, if tagged.
    #[must_use]
    pub fn timestamp(&self) -> Option<TimestampTag> {
        self.timestamp
    }

    /// Sets the timestamp only if none is present.
    /// Returns whether the tag was written.
    pub fn set_timestamp_if_absent(&mut self, time: SimTime) -> bool {
        if self.timestamp.is_some() {
            false
        } else {
            self.timestamp = Some(TimestampTag(time));
            true
        }
    }

    /// The carried delay budget, if tagged.
    #[must_use]
    pub fn delay_budget(&self) -> Option<DelayBudgetTag> {
        self.delay_budget
    }

    /// Overwrites the carried delay budget.
    pub fn set_delay_budget(&mut self, budget: Duration) {
        self.delay_budget = Some(DelayBudgetTag(budget));
    }

    /// Sets the delay budget to zero, if none is present.
    /// Returns whether the tag was written.
    pub fn set_delay_budget_if_absent(&mut self) -> bool {
        if self.delay_budget.is_some() {
            false
        } else {
            self.delay_budget = Some(DelayBudgetTag::default());
            true
        }
    }

    /// Removes all tags.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Whether no tag is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flow_class.is_none()
            && self.deadline.is_none()
            && self.timestamp.is_none()
            && self.delay_budget.is_none()
    }

    /// The number of bytes [`PacketTags::encode`] produces.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        let mut size = 0;
        if self.flow_class.is_some() {
            size += 1 + FlowClass::SERIALIZED_SIZE;
        }
        if self.deadline.is_some() {
            size += 1 + DeadlineTag::SERIALIZED_SIZE;
        }
        if self.timestamp.is_some() {
            size += 1 + TimestampTag::SERIALIZED_SIZE;
        }
        if self.delay_budget.is_some() {
            size += 1 + DelayBudgetTag::SERIALIZED_SIZE;
        }
        size
    }

    /// Encodes all present tags as a list of `(type, payload)` records.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.serialized_size()];
        let mut pos = 0;
        if let Some(tag) = &self.flow_class {
            pos = put(&mut buf, pos, tag);
        }
        if let Some(tag) = &self.deadline {
            pos = put(&mut buf, pos, tag);
        }
        if let Some(tag) = &self.timestamp {
            pos = put(&mut buf, pos, tag);
        }
        if let Some(tag) = &self.delay_budget {
            pos = put(&mut buf, pos, tag);
        }
        debug_assert_eq!(pos, buf.len());
        buf
    }

    /// Decodes a tag list produced by [`PacketTags::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error on truncated records, unknown or duplicate
    /// record types and invalid payloads.
    pub fn decode(mut buf: &[u8]) -> Result<Self, TagError> {
        let mut tags = Self::new();
        while let Some((&typ, rest)) = buf.split_first() {
            buf = match typ {
                FlowClass::TYPE_ID => take(rest, &mut tags.flow_class)?,
                DeadlineTag::TYPE_ID => take(rest, &mut tags.deadline)?,
                TimestampTag::TYPE_ID => take(rest, &mut tags.timestamp)?,
                DelayBudgetTag::TYPE_ID => take(rest, &mut tags.delay_budget)?,
                other => return Err(TagError::UnknownTag(other)),
            };
        }
        Ok(tags)
    }
}

fn put<T: Tag>(buf: &mut [u8], pos: usize, tag: &T) -> usize {
    buf[pos] = T::TYPE_ID;
    let end = pos + 1 + T::SERIALIZED_SIZE;
    if tag.serialize(&mut buf[pos + 1..end]).is_err() {
        unreachable!("tag buffer sized by serialized_size")
    }
    end
}

fn take<'a, T: Tag>(buf: &'a [u8], slot: &mut Option<T>) -> Result<&'a [u8], TagError> {
    if slot.is_some() {
        return Err(TagError::DuplicateTag(T::TYPE_ID));
    }
    check_len(buf, T::SERIALIZED_SIZE)?;
    *slot = Some(T::deserialize(&buf[..T::SERIALIZED_SIZE])?);
    Ok(&buf[T::SERIALIZED_SIZE..])
}

impl Display for PacketTags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = [
            self.flow_class.map(|t| t.to_string()),
            self.deadline.map(|t| t.to_string()),
            self.timestamp.map(|t| t.to_string()),
            self.delay_budget.map(|t| t.to_string()),
        ];
        let parts: Vec<String> = parts.into_iter().flatten().collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_class_encoding() {
        let mut buf = [0u8; 1];
        FlowClass::Decode.serialize(&mut buf).unwrap();
        assert_eq!(buf, [1]);
        assert_eq!(FlowClass::deserialize(&[0]), Ok(FlowClass::Prefill));
        assert_eq!(
            FlowClass::deserialize(&[7]),
            Err(TagError::InvalidFlowClass(7))
        );
        assert_eq!(
            FlowClass::deserialize(&[]),
            Err(TagError::Truncated {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn deadline_is_eight_byte_float() {
        let mut buf = [0u8; 8];
        DeadlineTag::new(5.0).serialize(&mut buf).unwrap();
        assert_eq!(buf, 5.0f64.to_le_bytes());
        assert_eq!(DeadlineTag::deserialize(&buf).unwrap().as_secs_f64(), 5.0);
        assert_eq!(
            DeadlineTag::deserialize(&(-1.0f64).to_le_bytes()),
            Err(TagError::InvalidTime(-1.0))
        );
        assert_eq!(DeadlineTag::new(-3.0).as_secs_f64(), 0.0);
        assert_eq!(DeadlineTag::new(f64::NAN).as_secs_f64(), 0.0);
    }

    #[test]
    fn timestamp_set_if_absent() {
        let mut tags = PacketTags::new();
        assert!(tags.timestamp().is_none());
        assert!(tags.set_timestamp_if_absent(SimTime::from(1.0)));
        assert!(!tags.set_timestamp_if_absent(SimTime::from(2.0)));
        assert_eq!(tags.timestamp(), Some(TimestampTag(SimTime::from(1.0))));
    }

    #[test]
    fn tag_list_encoding() {
        let mut tags = PacketTags::new();
        assert!(tags.encode().is_empty());
        assert_eq!(PacketTags::decode(&[]), Ok(PacketTags::new()));

        tags.set_flow_class(FlowClass::Decode);
        tags.set_deadline(DeadlineTag::new(10.0));
        let buf = tags.encode();
        assert_eq!(buf.len(), 2 + 9);
        assert_eq!(buf[0], FlowClass::TYPE_ID);
        assert_eq!(buf[1], 1);
        assert_eq!(buf[2], DeadlineTag::TYPE_ID);

        let decoded = PacketTags::decode(&buf).unwrap();
        assert_eq!(decoded.flow_class(), Some(FlowClass::Decode));
        assert_eq!(decoded.deadline(), Some(DeadlineTag::new(10.0)));
        assert!(decoded.timestamp().is_none());
        assert!(decoded.delay_budget().is_none());
    }

    #[test]
    fn tag_list_rejects_malformed_input() {
        assert_eq!(PacketTags::decode(&[9, 0]), Err(TagError::UnknownTag(9)));
        assert_eq!(
            PacketTags::decode(&[1, 0, 1, 1]),
            Err(TagError::DuplicateTag(1))
        );
        assert_eq!(
            PacketTags::decode(&[2, 0, 0]),
            Err(TagError::Truncated {
                expected: 8,
                found: 2
            })
        );

        let mut huge = vec![DelayBudgetTag::TYPE_ID];
        huge.extend_from_slice(&1e20f64.to_le_bytes());
        assert_eq!(PacketTags::decode(&huge), Err(TagError::InvalidTime(1e20)));
        assert_eq!(
            TimestampTag::deserialize(&1e20f64.to_le_bytes()),
            Err(TagError::InvalidTime(1e20))
        );
        assert_eq!(
            DelayBudgetTag::deserialize(&(-1.0f64).to_le_bytes()),
            Err(TagError::InvalidTime(-1.0))
        );
    }

    #[test]
    fn display() {
        let mut tags = PacketTags::new();
        assert_eq!(tags.to_string(), "");
        tags.set_flow_class(FlowClass::Prefill);
        tags.set_deadline(DeadlineTag::new(5.0));
        assert_eq!(tags.to_string(), "FlowType=PREFILL Deadline=5s");
        assert!(tags.set_delay_budget_if_absent());
        assert_eq!(
            tags.to_string(),
            "FlowType=PREFILL Deadline=5s DelayBudget=0ns"
        );
    }
}
