use crate::{
    qdisc::{CalendarQueueConfig, ConfigError, FifoQueueConfig},
    time::Duration,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// The discipline placed in front of the bottleneck link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisciplineKind {
    /// A [`CalendarQueueDisc`](crate::qdisc::CalendarQueueDisc).
    #[default]
    Calendar,
    /// A [`FifoQueueDisc`](crate::qdisc::FifoQueueDisc).
    Fifo,
}

impl Display for DisciplineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calendar => write!(f, "calendar"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

impl FromStr for DisciplineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" => Ok(Self::Calendar),
            "fifo" => Ok(Self::Fifo),
            _ => Err(ConfigError::InvalidValue {
                key: "discipline".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

///
/// The parameters of a prefill/decode traffic scenario
/// over a single bottleneck link.
///
/// Each request sends one prefill packet followed by `decode_count`
/// decode packets, spaced by `decode_gap`. Request arrivals are a
/// poisson process with mean inter-arrival time `request_interval`.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// The seed of the runtimes random number generator.
    pub seed: u64,
    /// The simulated time span.
    #[serde(with = "crate::time::serde_secs")]
    pub duration: Duration,
    /// The discipline in front of the link.
    pub discipline: DisciplineKind,
    /// The config used if `discipline` is `calendar`.
    pub calendar: CalendarQueueConfig,
    /// The config used if `discipline` is `fifo`.
    pub fifo: FifoQueueConfig,
    /// The bitrate of the bottleneck link in bit/s.
    pub link_bitrate: u64,
    /// The number of requests to generate.
    pub requests: u64,
    /// The mean time between two request arrivals.
    #[serde(with = "crate::time::serde_secs")]
    pub request_interval: Duration,
    /// The size of a prefill packet in bytes.
    pub prefill_size: u64,
    /// The size of a decode packet in bytes.
    pub decode_size: u64,
    /// The number of decode packets per request.
    pub decode_count: u64,
    /// The time between two decode packets of the same request.
    #[serde(with = "crate::time::serde_secs")]
    pub decode_gap: Duration,
    /// The relative deadlines in seconds, one is drawn uniformly per decode packet.
    pub deadlines: Vec<f64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            duration: Duration::from_secs(20),
            discipline: DisciplineKind::Calendar,
            calendar: CalendarQueueConfig::default(),
            fifo: FifoQueueConfig::default(),
            link_bitrate: 160_000_000,
            requests: 100,
            request_interval: Duration::from_millis(100),
            prefill_size: 8500,
            decode_size: 2560,
            decode_count: 16,
            decode_gap: Duration::from_millis(20),
            deadlines: vec![1.0, 5.0, 10.0],
        }
    }
}

impl ScenarioConfig {
    /// Loads a scenario from a YAML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(s).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Checks the scenario parameters.
    ///
    /// # Errors
    ///
    /// Returns an error on a zero bitrate, a zero duration or an
    /// empty or negative deadline list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        };

        if self.link_bitrate == 0 {
            return Err(invalid("link_bitrate", "0".to_string()));
        }
        if self.duration.is_zero() {
            return Err(invalid("duration", "0".to_string()));
        }
        if self.deadlines.is_empty()
            || self.deadlines.iter().any(|d| !d.is_finite() || *d < 0.0)
        {
            return Err(invalid("deadlines", format!("{:?}", self.deadlines)));
        }
        Ok(())
    }
}
