//!
//! A deadline aware calendar queue.
//!
//! The discipline owns `N` bands, each representing one future time slot of
//! length `rotation_interval`. A rotation timer advances the current band
//! and resets the admission budget of the band that just expired.
//!
//! Latency sensitive packets are placed into the earliest band with room,
//! deadline bound packets into the latest band that still meets their
//! deadline. Bands are drained in rotation order starting at the current band.
//!

use super::{
    CalendarQueueConfig, ConfigError, DropTailQueue, QdiscId, QueueDisc, QueueStats,
    RotationEvent,
};
use crate::{
    net::{FlowClass, Packet},
    runtime::{EventSink, PeriodicTimer},
    time::{Duration, SimTime},
};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
struct Band {
    queue: DropTailQueue,
    used: u64,
}

///
/// A multi-band queue discipline with time-indexed bands.
///
/// # Examples
///
/// ```
/// use des_calendar::prelude::*;
///
/// let mut qdisc = CalendarQueueDisc::new(QdiscId(0), CalendarQueueConfig::default()).unwrap();
/// qdisc.enqueue(Packet::decode(1, 2560, 5.0)).unwrap();
/// assert_eq!(qdisc.band_packet_count(4), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct CalendarQueueDisc {
    id: QdiscId,
    config: CalendarQueueConfig,
    bands: Vec<Band>,
    rotation_offset: usize,
    rotation_count: u64,
    last_rotation_time: SimTime,
    timer: PeriodicTimer<RotationEvent>,
    stats: QueueStats,
}

impl CalendarQueueDisc {
    ///
    /// Creates a calendar queue with `config.bands` empty bands.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two bands are configured or
    /// the rotation interval or link rate is not positive.
    ///
    pub fn new(id: QdiscId, config: CalendarQueueConfig) -> Result<Self, ConfigError> {
        Self::with_classes(id, config, Vec::new())
    }

    ///
    /// Creates a calendar queue on top of caller supplied sub-queues.
    /// If `classes` is empty, `config.bands` default sub-queues are created.
    /// Otherwise the number of bands is the number of supplied sub-queues.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two bands result or
    /// the rotation interval or link rate is not positive.
    ///
    pub fn with_classes(
        id: QdiscId,
        mut config: CalendarQueueConfig,
        classes: Vec<DropTailQueue>,
    ) -> Result<Self, ConfigError> {
        let classes = if classes.is_empty() {
            (0..config.bands)
                .map(|_| DropTailQueue::new(config.band_limit))
                .collect()
        } else {
            config.bands = classes.len();
            classes
        };
        config.validate()?;

        let bands = classes
            .into_iter()
            .map(|queue| Band { queue, used: 0 })
            .collect();

        Ok(Self {
            id,
            timer: PeriodicTimer::new(RotationEvent { qdisc: id }, config.rotation_interval),
            stats: QueueStats::new(config.timeout_threshold),
            config,
            bands,
            rotation_offset: 0,
            rotation_count: 0,
            last_rotation_time: SimTime::now(),
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CalendarQueueConfig {
        &self.config
    }

    /// The number of bands.
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// The index of the current band.
    #[must_use]
    pub fn rotation_offset(&self) -> usize {
        self.rotation_offset
    }

    /// The number of rotations performed since construction.
    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.rotation_count
    }

    /// The time of the last rotation, or of activation if no rotation happened yet.
    #[must_use]
    pub fn last_rotation_time(&self) -> SimTime {
        self.last_rotation_time
    }

    /// Whether a rotation is pending.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timer.is_armed()
    }

    /// The admission budget a band consumed since its last reset.
    #[must_use]
    pub fn band_used(&self, band: usize) -> Option<u64> {
        self.bands.get(band).map(|b| b.used)
    }

    /// The number of packets buffered in a band.
    #[must_use]
    pub fn band_packet_count(&self, band: usize) -> Option<usize> {
        self.bands.get(band).map(|b| b.queue.packet_count())
    }

    /// The number of bytes buffered in a band.
    #[must_use]
    pub fn band_byte_count(&self, band: usize) -> Option<u64> {
        self.bands.get(band).map(|b| b.queue.byte_count())
    }

    /// The band assigned to a priority by the priomap.
    ///
    /// # Errors
    ///
    /// Returns an error if `prio >= 16`.
    pub fn band_for_priority(&self, prio: usize) -> Result<u16, ConfigError> {
        self.config.priomap.get(prio)
    }

    /// Assigns a band to a priority in the priomap.
    ///
    /// # Errors
    ///
    /// Returns an error if `prio >= 16` or `band` is not a valid band.
    pub fn set_band_for_priority(&mut self, prio: usize, band: u16) -> Result<(), ConfigError> {
        if usize::from(band) >= self.bands.len() {
            return Err(ConfigError::BandOutOfRange {
                band,
                bands: self.bands.len(),
            });
        }
        self.config.priomap.set(prio, band)
    }

    ///
    /// The number of bytes the link can still drain from the current
    /// band before the next rotation, minus the bytes already queued there.
    ///
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn remaining_bytes(&self) -> f64 {
        let elapsed = SimTime::now().saturating_duration_since(self.last_rotation_time);
        let remaining_time = self.config.rotation_interval.saturating_sub(elapsed);
        let queued = self.bands[self.rotation_offset].queue.byte_count();
        remaining_time.as_secs_f64() * self.config.link_rate - queued as f64
    }

    ///
    /// The band a deadline bound packet is initially placed into.
    ///
    /// The number of slots the packet may wait is derived from its
    /// deadline minus the slack it already consumed. The target wraps
    /// modulo `N` in both directions, so an elapsed deadline folds back
    /// to the band served last in the current cycle.
    ///
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn deadline_target(&self, deadline: f64, budget: Duration) -> usize {
        let n = self.bands.len() as i64;
        let slots = (deadline - budget.as_secs_f64()) / self.config.rotation_interval.as_secs_f64();
        // `as` saturates, and NaN maps to zero.
        let backward = (slots.floor() as i64).rem_euclid(n);
        ((self.rotation_offset as i64 + backward + n - 1) % n) as usize
    }

    fn start_band(&self, packet: &Packet) -> usize {
        match (packet.tags.flow_class(), packet.tags.deadline()) {
            (Some(FlowClass::Decode), Some(deadline)) => {
                let budget = packet.tags.delay_budget().map(|b| b.0).unwrap_or_default();
                self.deadline_target(deadline.as_secs_f64(), budget)
            }
            _ => self.rotation_offset,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn admits(&self, band: usize, packet: &Packet) -> bool {
        let b = &self.bands[band];
        let cost = self.config.max_size.cost(packet.size());
        if b.used + cost > self.config.max_size.value() {
            return false;
        }
        if band == self.rotation_offset && packet.size() as f64 > self.remaining_bytes() {
            return false;
        }
        b.queue.fits(packet)
    }

    /// Advances the current band and rearms the rotation timer.
    /// The admission budget of the band that was current is reset.
    fn rotate(&mut self, sink: &mut dyn EventSink<RotationEvent>) {
        let expired = self.rotation_offset;
        let lbytes = self.bands[expired].queue.byte_count();
        self.bands[expired].used = 0;

        self.rotation_count += 1;
        self.last_rotation_time = SimTime::now();
        self.rotation_offset = (expired + 1) % self.bands.len();
        self.timer.fire(sink);

        debug!(
            qdisc = %self.id,
            rotation = self.rotation_count,
            "rotated to band {} (band {} had {} bytes left)",
            self.rotation_offset,
            expired,
            lbytes
        );
    }
}

impl QueueDisc for CalendarQueueDisc {
    fn id(&self) -> QdiscId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Calendar Queue"
    }

    fn enqueue(&mut self, mut packet: Packet) -> Result<(), Packet> {
        let n = self.bands.len();
        let start = self.start_band(&packet);

        for i in 0..n {
            let band = (start + i) % n;
            if !self.admits(band, &packet) {
                trace!(qdisc = %self.id, band, packet = packet.id(), "band full, moving to next band");
                continue;
            }

            let cost = self.config.max_size.cost(packet.size());
            packet.tags.set_timestamp_if_absent(SimTime::now());
            let id = packet.id();
            let size = packet.size();
            match self.bands[band].queue.enqueue(packet) {
                Ok(()) => {
                    self.bands[band].used += cost;
                    trace!(
                        qdisc = %self.id,
                        band,
                        packet = id,
                        "enqueued {} bytes (budget used {})",
                        size,
                        self.bands[band].used
                    );
                    return Ok(());
                }
                Err(rejected) => packet = rejected,
            }
        }

        debug!(qdisc = %self.id, packet = packet.id(), "no band can admit packet, dropping");
        Err(packet)
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let n = self.bands.len();
        for i in 0..n {
            let band = (self.rotation_offset + i) % n;
            if let Some(mut packet) = self.bands[band].queue.dequeue() {
                self.stats.record_dequeue(&mut packet, SimTime::now());
                trace!(
                    qdisc = %self.id,
                    band,
                    packet = packet.id(),
                    "popped packet ({} packets left in band)",
                    self.bands[band].queue.packet_count()
                );
                return Some(packet);
            }
        }
        None
    }

    fn peek(&self) -> Option<&Packet> {
        let n = self.bands.len();
        (0..n)
            .map(|i| (self.rotation_offset + i) % n)
            .find_map(|band| self.bands[band].queue.peek())
    }

    fn packet_count(&self) -> usize {
        self.bands.iter().map(|b| b.queue.packet_count()).sum()
    }

    fn byte_count(&self) -> u64 {
        self.bands.iter().map(|b| b.queue.byte_count()).sum()
    }

    fn stats(&self) -> &QueueStats {
        &self.stats
    }

    fn activate(&mut self, sink: &mut dyn EventSink<RotationEvent>) {
        self.last_rotation_time = SimTime::now();
        self.timer.start(sink);
        debug!(qdisc = %self.id, bands = self.bands.len(), "calendar queue activated");
    }

    fn handle_timer(&mut self, event: RotationEvent, sink: &mut dyn EventSink<RotationEvent>) {
        if event.qdisc != self.id {
            warn!(qdisc = %self.id, "ignoring timer event of {}", event.qdisc);
            return;
        }
        self.rotate(sink);
    }

    fn deactivate(&mut self, sink: &mut dyn EventSink<RotationEvent>) {
        if self.timer.cancel(sink) {
            debug!(qdisc = %self.id, "calendar queue deactivated");
        }
    }
}
