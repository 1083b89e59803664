//! Simulation time.
//!
//! [`SimTime`] is an instant on the virtual time axis, [`Duration`] a span
//! between two instants. One clock is shared by the whole process and only
//! the [`Runtime`](crate::runtime::Runtime) moves it, while it dispatches
//! events.
//!
//! ```rust
//! # use des_calendar::time::*;
//! let deadline = SimTime::from(2.5) + Duration::from_secs(5);
//! assert_eq!(deadline, SimTime::from(7.5));
//! assert_eq!(deadline - SimTime::from(2.5), Duration::from_millis(5_000));
//! assert_eq!(parse_duration("250ms"), Some(Duration::from_secs_f64(0.25)));
//! ```

mod duration;
pub use duration::*;

pub(crate) mod serde_secs;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
    sync::atomic::{AtomicU64, Ordering},
};

/// Nanoseconds since [`SimTime::ZERO`].
static CLOCK: AtomicU64 = AtomicU64::new(0);

/// An instant in simulated time, measured from [`SimTime::ZERO`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);
    /// The latest representable instant.
    pub const MAX: SimTime = SimTime(Duration::MAX);

    /// The current simulation time.
    ///
    /// Outside of a runtime this is the time the last runtime stopped at.
    #[must_use]
    pub fn now() -> SimTime {
        SimTime(Duration::from_nanos(CLOCK.load(Ordering::Acquire)))
    }

    pub(crate) fn set_now(time: SimTime) {
        let nanos = u64::try_from(time.0.as_nanos()).unwrap_or(u64::MAX);
        CLOCK.store(nanos, Ordering::Release);
    }

    /// The instant `offset` after [`SimTime::ZERO`].
    #[must_use]
    pub const fn from_duration(offset: Duration) -> SimTime {
        SimTime(offset)
    }

    /// The offset from [`SimTime::ZERO`].
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Seconds since [`SimTime::ZERO`].
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time from `earlier` to `self`, or `None` if `earlier` is later.
    #[must_use]
    pub fn checked_duration_since(&self, earlier: SimTime) -> Option<Duration> {
        self.0.checked_sub(earlier.0)
    }

    /// Time from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(&self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// `self + offset`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, offset: Duration) -> Option<SimTime> {
        self.0.checked_add(offset).map(SimTime)
    }

    /// `self - offset`, or `None` if that lies before [`SimTime::ZERO`].
    #[must_use]
    pub fn checked_sub(&self, offset: Duration) -> Option<SimTime> {
        self.0.checked_sub(offset).map(SimTime)
    }
}

// Written as float seconds. Reading also accepts strings like "1.5s".
impl Serialize for SimTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_secs::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for SimTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_secs::deserialize(deserializer).map(SimTime)
    }
}

impl PartialEq<f64> for SimTime {
    fn eq(&self, secs: &f64) -> bool {
        (self.as_secs_f64() - secs).abs() < f64::EPSILON
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    /// # Panics
    ///
    /// Panics on overflow.
    fn add(self, rhs: Duration) -> SimTime {
        match self.checked_add(rhs) {
            Some(t) => t,
            None => panic!("simulation time overflow: {self} + {rhs:?}"),
        }
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for SimTime {
    type Output = SimTime;

    /// # Panics
    ///
    /// Panics if the result lies before [`SimTime::ZERO`].
    fn sub(self, rhs: Duration) -> SimTime {
        match self.checked_sub(rhs) {
            Some(t) => t,
            None => panic!("simulation time underflow: {self} - {rhs:?}"),
        }
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    /// # Panics
    ///
    /// Panics if `rhs` is later than `self`.
    fn sub(self, rhs: SimTime) -> Duration {
        match self.checked_duration_since(rhs) {
            Some(d) => d,
            None => panic!("{rhs} is later than {self}"),
        }
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl From<f64> for SimTime {
    fn from(secs: f64) -> SimTime {
        SimTime(Duration::from_secs_f64(secs))
    }
}

impl From<Duration> for SimTime {
    fn from(offset: Duration) -> SimTime {
        SimTime(offset)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> f64 {
        time.as_secs_f64()
    }
}
