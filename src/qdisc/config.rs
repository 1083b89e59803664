//!
//! Configuration of the queue disciplines.
//!
//! Configs can be built in code with builder-style setters, loaded from
//! YAML, or modified through string attributes like
//! `("RotationInterval", "250ms")`.
//!

use crate::time::{parse_duration, Duration};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{error::Error, fmt::Display, str::FromStr};

/// The number of entries in a [`Priomap`].
pub const PRIOMAP_LEN: usize = 16;

/// The number of bands created when none are supplied.
pub const DEFAULT_BANDS: usize = 20;

/// An error in the configuration of a queue discipline.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Fewer than two bands were configured.
    TooFewBands(usize),
    /// The rotation interval is zero.
    ZeroRotationInterval,
    /// The link rate is not a positive finite number.
    InvalidLinkRate(f64),
    /// A priority outside of `0..16`.
    PriorityOutOfRange(usize),
    /// A band index not smaller than the number of bands.
    BandOutOfRange {
        /// The requested band.
        band: u16,
        /// The number of configured bands.
        bands: usize,
    },
    /// An attribute name that is not known.
    UnknownAttribute(String),
    /// An attribute value that could not be parsed.
    InvalidValue {
        /// The attribute name.
        key: String,
        /// The rejected value.
        value: String,
    },
    /// A malformed YAML document.
    Yaml(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewBands(n) => write!(f, "calendar queue needs at least 2 bands, got {n}"),
            Self::ZeroRotationInterval => write!(f, "rotation interval must be greater than zero"),
            Self::InvalidLinkRate(r) => write!(f, "link rate must be positive, got {r}"),
            Self::PriorityOutOfRange(p) => {
                write!(f, "priority must be a value between 0 and 15, got {p}")
            }
            Self::BandOutOfRange { band, bands } => {
                write!(f, "band {band} out of range for {bands} bands")
            }
            Self::UnknownAttribute(key) => write!(f, "unknown attribute '{key}'"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value '{value}' for attribute '{key}'")
            }
            Self::Yaml(e) => write!(f, "invalid yaml: {e}"),
        }
    }
}

impl Error for ConfigError {}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

///
/// A capacity limit, either in bytes or in packets.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueSize {
    /// A limit on the total number of bytes.
    Bytes(u64),
    /// A limit on the number of packets.
    Packets(u64),
}

impl QueueSize {
    /// The numeric limit, in the unit of this size.
    #[must_use]
    pub fn value(&self) -> u64 {
        match self {
            Self::Bytes(v) | Self::Packets(v) => *v,
        }
    }

    /// The amount a packet of `bytes` bytes consumes of this limit.
    #[must_use]
    pub fn cost(&self, bytes: u64) -> u64 {
        match self {
            Self::Bytes(_) => bytes,
            Self::Packets(_) => 1,
        }
    }
}

impl Display for QueueSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(v) => write!(f, "{v}B"),
            Self::Packets(v) => write!(f, "{v}p"),
        }
    }
}

impl FromStr for QueueSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value = num.parse::<u64>().map_err(|_| invalid("MaxSize", s))?;

        let (mul, packets) = match unit.trim() {
            "" | "B" => (1, false),
            "KB" => (1_000, false),
            "MB" => (1_000_000, false),
            "GB" => (1_000_000_000, false),
            "KiB" => (1 << 10, false),
            "MiB" => (1 << 20, false),
            "GiB" => (1 << 30, false),
            "p" => (1, true),
            _ => return Err(invalid("MaxSize", s)),
        };
        let value = value.checked_mul(mul).ok_or_else(|| invalid("MaxSize", s))?;

        Ok(if packets {
            Self::Packets(value)
        } else {
            Self::Bytes(value)
        })
    }
}

impl Serialize for QueueSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QueueSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(Self::Bytes(v)),
            Raw::Str(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

///
/// The priority to band mapping of the best effort classifier.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priomap([u16; PRIOMAP_LEN]);

impl Priomap {
    /// Creates a priomap from a raw table.
    #[must_use]
    pub const fn new(map: [u16; PRIOMAP_LEN]) -> Self {
        Self(map)
    }

    /// The band for a priority.
    ///
    /// # Errors
    ///
    /// Returns an error if `prio >= 16`.
    pub fn get(&self, prio: usize) -> Result<u16, ConfigError> {
        self.0
            .get(prio)
            .copied()
            .ok_or(ConfigError::PriorityOutOfRange(prio))
    }

    /// Sets the band for a priority.
    ///
    /// # Errors
    ///
    /// Returns an error if `prio >= 16`.
    pub fn set(&mut self, prio: usize, band: u16) -> Result<(), ConfigError> {
        let slot = self
            .0
            .get_mut(prio)
            .ok_or(ConfigError::PriorityOutOfRange(prio))?;
        *slot = band;
        Ok(())
    }

    /// The raw table.
    #[must_use]
    pub fn as_array(&self) -> &[u16; PRIOMAP_LEN] {
        &self.0
    }

    /// Checks that every entry names one of `bands` bands.
    ///
    /// # Errors
    ///
    /// Returns the first out of range entry.
    pub fn validate(&self, bands: usize) -> Result<(), ConfigError> {
        match self.0.iter().find(|&&b| usize::from(b) >= bands) {
            Some(&band) => Err(ConfigError::BandOutOfRange { band, bands }),
            None => Ok(()),
        }
    }
}

impl Default for Priomap {
    fn default() -> Self {
        Self([1, 2, 2, 2, 1, 2, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1])
    }
}

impl Display for Priomap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, band) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{band}")?;
        }
        Ok(())
    }
}

impl FromStr for Priomap {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = [0u16; PRIOMAP_LEN];
        let mut parts = s.split_whitespace();
        for slot in &mut map {
            *slot = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| invalid("Priomap", s))?;
        }
        if parts.next().is_some() {
            return Err(invalid("Priomap", s));
        }
        Ok(Self(map))
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(key, value))
}

///
/// The configuration of a [`CalendarQueueDisc`](super::CalendarQueueDisc).
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarQueueConfig {
    /// The number of bands, at least 2.
    pub bands: usize,
    /// The time between two rotations.
    #[serde(with = "crate::time::serde_secs")]
    pub rotation_interval: Duration,
    /// The admission budget of a band per rotation.
    pub max_size: QueueSize,
    /// The capacity limit of each band's sub-queue.
    pub band_limit: QueueSize,
    /// The drain rate of the attached link in bytes per second.
    pub link_rate: f64,
    /// The queueing delay above which a deadline bound packet counts as timed out.
    #[serde(with = "crate::time::serde_secs")]
    pub timeout_threshold: Duration,
    /// The priority to band mapping.
    pub priomap: Priomap,
}

impl Default for CalendarQueueConfig {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS,
            rotation_interval: Duration::from_secs(1),
            max_size: QueueSize::Bytes(5_120_000_000),
            band_limit: QueueSize::Packets(1000),
            link_rate: 20e6,
            timeout_threshold: Duration::from_millis(100),
            priomap: Priomap::default(),
        }
    }
}

impl CalendarQueueConfig {
    /// Sets the number of bands.
    #[must_use]
    pub fn bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    /// Sets the rotation interval.
    #[must_use]
    pub fn rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval = interval;
        self
    }

    /// Sets the per band admission budget.
    #[must_use]
    pub fn max_size(mut self, max_size: QueueSize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the capacity of each band's sub-queue.
    #[must_use]
    pub fn band_limit(mut self, limit: QueueSize) -> Self {
        self.band_limit = limit;
        self
    }

    /// Sets the link rate in bytes per second.
    #[must_use]
    pub fn link_rate(mut self, rate: f64) -> Self {
        self.link_rate = rate;
        self
    }

    /// Sets the timeout threshold.
    #[must_use]
    pub fn timeout_threshold(mut self, threshold: Duration) -> Self {
        self.timeout_threshold = threshold;
        self
    }

    /// Sets the priomap.
    #[must_use]
    pub fn priomap(mut self, priomap: Priomap) -> Self {
        self.priomap = priomap;
        self
    }

    /// Sets an attribute by name.
    ///
    /// Known attributes are `Bands`, `RotationInterval`, `MaxSize`,
    /// `BandLimit`, `LinkRate`, `TimeoutThreshold` and `Priomap`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or the value malformed.
    pub fn set_attribute(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "Bands" => {
                self.bands = value.trim().parse().map_err(|_| invalid(key, value))?;
            }
            "RotationInterval" => {
                self.rotation_interval = parse_duration(value).ok_or_else(|| invalid(key, value))?;
            }
            "MaxSize" => self.max_size = value.parse()?,
            "BandLimit" => self.band_limit = value.parse()?,
            "LinkRate" => self.link_rate = parse_f64(key, value)?,
            "TimeoutThreshold" => {
                self.timeout_threshold = parse_duration(value).ok_or_else(|| invalid(key, value))?;
            }
            "Priomap" => self.priomap = value.parse()?,
            _ => return Err(ConfigError::UnknownAttribute(key.to_string())),
        }
        Ok(())
    }

    /// Loads a config from a YAML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(s).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Checks the invariants required to activate a calendar queue.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bands < 2 {
            return Err(ConfigError::TooFewBands(self.bands));
        }
        if self.rotation_interval.is_zero() {
            return Err(ConfigError::ZeroRotationInterval);
        }
        if !(self.link_rate.is_finite() && self.link_rate > 0.0) {
            return Err(ConfigError::InvalidLinkRate(self.link_rate));
        }
        Ok(())
    }
}

///
/// The configuration of a [`FifoQueueDisc`](super::FifoQueueDisc).
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FifoQueueConfig {
    /// The capacity of the queue.
    pub max_size: QueueSize,
    /// The queueing delay above which a deadline bound packet counts as timed out.
    #[serde(with = "crate::time::serde_secs")]
    pub timeout_threshold: Duration,
}

impl Default for FifoQueueConfig {
    fn default() -> Self {
        Self {
            max_size: QueueSize::Packets(1000),
            timeout_threshold: Duration::from_millis(100),
        }
    }
}

impl FifoQueueConfig {
    /// Sets the capacity.
    #[must_use]
    pub fn max_size(mut self, max_size: QueueSize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the timeout threshold.
    #[must_use]
    pub fn timeout_threshold(mut self, threshold: Duration) -> Self {
        self.timeout_threshold = threshold;
        self
    }

    /// Sets an attribute by name, either `MaxSize` or `TimeoutThreshold`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or the value malformed.
    pub fn set_attribute(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "MaxSize" => self.max_size = value.parse()?,
            "TimeoutThreshold" => {
                self.timeout_threshold = parse_duration(value).ok_or_else(|| invalid(key, value))?;
            }
            _ => return Err(ConfigError::UnknownAttribute(key.to_string())),
        }
        Ok(())
    }

    /// Loads a config from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(s).map_err(|e| ConfigError::Yaml(e.to_string()))
    }
}
