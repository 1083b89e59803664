use crate::{
    net::{FlowClass, Packet},
    time::{Duration, SimTime},
};
use serde::Serialize;
use std::fmt::Display;
use tracing::debug;

///
/// Delay and timeout accumulators, updated whenever a packet
/// leaves a queue discipline.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    timeout_threshold: Duration,
    total_delay: Duration,
    dequeued: u64,
    timeouts: u64,
    prefill_delay_total: Duration,
    prefill_count: u64,
}

impl QueueStats {
    /// Creates empty statistics with the given timeout threshold.
    #[must_use]
    pub fn new(timeout_threshold: Duration) -> Self {
        Self {
            timeout_threshold,
            total_delay: Duration::ZERO,
            dequeued: 0,
            timeouts: 0,
            prefill_delay_total: Duration::ZERO,
            prefill_count: 0,
        }
    }

    /// The delay above which a deadline bound packet counts as timed out.
    #[must_use]
    pub fn timeout_threshold(&self) -> Duration {
        self.timeout_threshold
    }

    /// The number of dequeued deadline bound packets with a timestamp.
    #[must_use]
    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    /// The number of deadline bound packets that exceeded the threshold.
    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// The summed queueing delay of all deadline bound packets.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }

    /// The number of dequeued latency sensitive packets with a timestamp.
    #[must_use]
    pub fn prefill_count(&self) -> u64 {
        self.prefill_count
    }

    /// The summed queueing delay of all latency sensitive packets.
    #[must_use]
    pub fn prefill_delay_total(&self) -> Duration {
        self.prefill_delay_total
    }

    ///
    /// Accounts for a packet that leaves the discipline at `now`.
    ///
    /// The delay budget tag is created if missing. Packets without a
    /// timestamp are not measured. For deadline bound packets the delay
    /// beyond the timeout threshold is added to the carried budget.
    ///
    pub fn record_dequeue(&mut self, packet: &mut Packet, now: SimTime) {
        packet.tags.set_delay_budget_if_absent();

        let Some(timestamp) = packet.tags.timestamp() else {
            return;
        };
        let delay = now.saturating_duration_since(timestamp.0);

        match packet.tags.flow_class() {
            Some(FlowClass::Decode) => {
                self.total_delay += delay;
                self.dequeued += 1;

                let budget = packet.tags.delay_budget().map(|b| b.0).unwrap_or_default();
                let budget = (budget + delay).saturating_sub(self.timeout_threshold);
                packet.tags.set_delay_budget(budget);

                if delay > self.timeout_threshold {
                    self.timeouts += 1;
                    debug!(
                        packet = packet.id(),
                        "packet timeout: delay = {}s",
                        delay.as_secs_f64()
                    );
                }
            }
            Some(FlowClass::Prefill) => {
                self.prefill_delay_total += delay;
                self.prefill_count += 1;
            }
            None => {}
        }
    }

    /// Computes the aggregated report, labeled with `title`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn report(&self, title: &str) -> StatsReport {
        let ratio = |num: f64, den: u64| if den > 0 { num / den as f64 } else { 0.0 };

        StatsReport {
            title: title.to_string(),
            dequeued_decode: self.dequeued,
            total_delay: self.total_delay.as_secs_f64(),
            timeouts: self.timeouts,
            average_delay: ratio(self.total_delay.as_secs_f64(), self.dequeued),
            prefill_count: self.prefill_count,
            average_prefill_delay: ratio(
                self.prefill_delay_total.as_secs_f64(),
                self.prefill_count,
            ),
            timeout_rate: ratio(self.timeouts as f64, self.dequeued),
        }
    }
}

///
/// An aggregated view of [`QueueStats`]. All averages are 0.0
/// when there were no samples.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    /// The name of the reporting discipline.
    pub title: String,
    /// Dequeued deadline bound packets.
    pub dequeued_decode: u64,
    /// Summed queueing delay of deadline bound packets in seconds.
    pub total_delay: f64,
    /// Deadline bound packets that exceeded the threshold.
    pub timeouts: u64,
    /// Average queueing delay of deadline bound packets in seconds.
    pub average_delay: f64,
    /// Dequeued latency sensitive packets.
    pub prefill_count: u64,
    /// Average queueing delay of latency sensitive packets in seconds.
    pub average_prefill_delay: f64,
    /// The fraction of deadline bound packets that timed out, in `0..=1`.
    pub timeout_rate: f64,
}

impl Display for StatsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = format!("===== {} Timeout Statistics =====", self.title);
        writeln!(f, "{header}")?;
        writeln!(f, "Total dequeued decode packets: {}", self.dequeued_decode)?;
        writeln!(f, "Total delay: {}s", self.total_delay)?;
        writeln!(f, "Total timeout packets: {}", self.timeouts)?;
        writeln!(f, "Average queue delay: {} s", self.average_delay)?;
        writeln!(f, "Average prefill delay: {} s", self.average_prefill_delay)?;
        writeln!(f, "Timeout rate: {} %", self.timeout_rate * 100.0)?;
        write!(f, "{}", "=".repeat(header.chars().count()))
    }
}
