use super::ScenarioConfig;
use crate::{net::Packet, time::Duration};
use fxhash::FxHashMap;
use rand::Rng;

///
/// A generator of prefill/decode requests.
///
/// Every request yields one prefill packet, followed by a fixed number
/// of decode packets, each with a deadline drawn from the configured choices.
///
#[derive(Debug)]
pub struct Source {
    prefill_size: u64,
    decode_size: u64,
    decode_count: u64,
    decode_gap: Duration,
    request_interval: Duration,
    deadlines: Vec<f64>,
    remaining: u64,

    next_request: u64,
    next_packet: u64,
    origin: FxHashMap<u64, u64>,
    sent: u64,
}

/// A packet and the delay after the request arrival at which it is sent.
pub type Emission = (Duration, Packet);

impl Source {
    /// Creates a source for the given scenario.
    #[must_use]
    pub fn new(config: &ScenarioConfig) -> Self {
        Self {
            prefill_size: config.prefill_size,
            decode_size: config.decode_size,
            decode_count: config.decode_count,
            decode_gap: config.decode_gap,
            request_interval: config.request_interval,
            deadlines: config.deadlines.clone(),
            remaining: config.requests,
            next_request: 0,
            next_packet: 0,
            origin: FxHashMap::default(),
            sent: 0,
        }
    }

    /// The number of requests that are yet to arrive.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The number of packets handed out for sending.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// The number of packets a single request consists of.
    #[must_use]
    pub fn packets_per_request(&self) -> u64 {
        1 + self.decode_count
    }

    /// The request a packet belongs to.
    #[must_use]
    pub fn request_of(&self, packet: u64) -> Option<u64> {
        self.origin.get(&packet).copied()
    }

    /// Draws the time until the next request arrival, exponentially distributed.
    pub fn next_arrival(&self, rng: &mut impl Rng) -> Duration {
        // 1 - u lies in (0, 1], so the logarithm is finite.
        let u: f64 = rng.random();
        Duration::from_secs_f64(-self.request_interval.as_secs_f64() * (1.0 - u).ln())
    }

    ///
    /// Starts a new request and returns its id and all packets
    /// with their send offsets. Returns `None` once all requests
    /// were generated.
    ///
    pub fn start_request(&mut self, rng: &mut impl Rng) -> Option<(u64, Vec<Emission>)> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let request = self.next_request;
        self.next_request += 1;

        let mut emissions = Vec::new();
        let prefill = Packet::prefill(self.packet_id(request), self.prefill_size);
        emissions.push((Duration::ZERO, prefill));

        let mut offset = Duration::ZERO;
        for _ in 0..self.decode_count {
            offset += self.decode_gap;
            let deadline = self.deadlines[rng.random_range(0..self.deadlines.len())];
            let packet = Packet::decode(self.packet_id(request), self.decode_size, deadline);
            emissions.push((offset, packet));
        }

        self.sent += emissions.len() as u64;
        Some((request, emissions))
    }

    fn packet_id(&mut self, request: u64) -> u64 {
        let id = self.next_packet;
        self.next_packet += 1;
        self.origin.insert(id, request);
        id
    }
}
