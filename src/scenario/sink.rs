use crate::{
    net::{FlowClass, Packet},
    time::{Duration, SimTime},
};
use fxhash::FxHashMap;

/// The delivery progress of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRecord {
    /// The arrival time of the request.
    pub started: SimTime,
    /// The number of packets the request consists of.
    pub expected: u64,
    /// The number of delivered packets.
    pub delivered: u64,
    /// The delivery time of the prefill packet.
    pub prefill_done: Option<SimTime>,
    /// The delivery time of the last packet, once all were delivered.
    pub completed: Option<SimTime>,
}

///
/// The receiving end of the link.
///
#[derive(Debug, Default)]
pub struct Sink {
    packets: u64,
    bytes: u64,
    first_rx: Option<SimTime>,
    last_rx: Option<SimTime>,
    requests: FxHashMap<u64, RequestRecord>,
}

impl Sink {
    /// Creates a sink without any records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request that is about to send `expected` packets.
    pub fn open(&mut self, request: u64, expected: u64) {
        self.requests.insert(
            request,
            RequestRecord {
                started: SimTime::now(),
                expected,
                delivered: 0,
                prefill_done: None,
                completed: None,
            },
        );
    }

    /// Records a delivered packet of the given request.
    pub fn receive(&mut self, packet: &Packet, request: Option<u64>) {
        let now = SimTime::now();
        self.packets += 1;
        self.bytes += packet.size();
        self.first_rx.get_or_insert(now);
        self.last_rx = Some(now);

        let Some(record) = request.and_then(|r| self.requests.get_mut(&r)) else {
            return;
        };
        record.delivered += 1;
        if packet.flow_class() == Some(FlowClass::Prefill) {
            record.prefill_done.get_or_insert(now);
        }
        if record.delivered == record.expected {
            record.completed = Some(now);
        }
    }

    /// The number of delivered packets.
    #[must_use]
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// The number of delivered bytes.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// The time of the first delivery.
    #[must_use]
    pub fn first_rx(&self) -> Option<SimTime> {
        self.first_rx
    }

    /// The time of the last delivery.
    #[must_use]
    pub fn last_rx(&self) -> Option<SimTime> {
        self.last_rx
    }

    /// The record of a request.
    #[must_use]
    pub fn request(&self, request: u64) -> Option<&RequestRecord> {
        self.requests.get(&request)
    }

    /// The number of requests that delivered all of their packets.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.requests
            .values()
            .filter(|r| r.completed.is_some())
            .count()
    }

    /// The mean time from request arrival to delivery of its last packet.
    #[must_use]
    pub fn mean_completion_time(&self) -> Duration {
        mean(
            self.requests
                .values()
                .filter_map(|r| Some(r.completed?.saturating_duration_since(r.started))),
        )
    }

    /// The mean time from request arrival to delivery of its prefill packet.
    #[must_use]
    pub fn mean_prefill_time(&self) -> Duration {
        mean(
            self.requests
                .values()
                .filter_map(|r| Some(r.prefill_done?.saturating_duration_since(r.started))),
        )
    }
}

fn mean(samples: impl Iterator<Item = Duration>) -> Duration {
    let (sum, n) = samples.fold((Duration::ZERO, 0u32), |(sum, n), d| (sum + d, n + 1));
    if n == 0 {
        Duration::ZERO
    } else {
        sum / n
    }
}
