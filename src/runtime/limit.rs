use crate::time::SimTime;
use std::fmt;

/// Bounds on how far a [`Runtime`](super::Runtime) may advance.
///
/// Both bounds are optional. A runtime stops before dispatching the first
/// event that would violate either of them, leaving that event pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeLimit {
    max_events: Option<usize>,
    max_time: Option<SimTime>,
}

impl RuntimeLimit {
    /// No bound at all. The runtime drains its event set.
    pub const UNBOUNDED: RuntimeLimit = RuntimeLimit {
        max_events: None,
        max_time: None,
    };

    /// Allows at most `n` dispatched events.
    #[must_use]
    pub const fn events(n: usize) -> Self {
        RuntimeLimit {
            max_events: Some(n),
            max_time: None,
        }
    }

    /// Allows events up to and including time `t`.
    #[must_use]
    pub const fn until(t: SimTime) -> Self {
        RuntimeLimit {
            max_events: None,
            max_time: Some(t),
        }
    }

    /// The event count bound, if any.
    #[must_use]
    pub fn max_events(&self) -> Option<usize> {
        self.max_events
    }

    /// The simulation time bound, if any.
    #[must_use]
    pub fn max_time(&self) -> Option<SimTime> {
        self.max_time
    }

    /// Whether neither bound is set.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.max_events.is_none() && self.max_time.is_none()
    }

    /// Combines two limits. For each kind the stricter bound wins.
    #[must_use]
    pub fn tighten(self, other: RuntimeLimit) -> Self {
        fn stricter<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            }
        }
        RuntimeLimit {
            max_events: stricter(self.max_events, other.max_events),
            max_time: stricter(self.max_time, other.max_time),
        }
    }

    /// Whether dispatching the `nth` event (1-based) at `time` would
    /// cross a bound.
    pub(crate) fn forbids(&self, nth: usize, time: SimTime) -> bool {
        self.max_events.is_some_and(|max| nth > max) || self.max_time.is_some_and(|max| time > max)
    }
}

impl fmt::Display for RuntimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.max_events, self.max_time) {
            (None, None) => f.write_str("unbounded"),
            (Some(n), None) => write!(f, "at most {n} events"),
            (None, Some(t)) => write!(f, "until {t}"),
            (Some(n), Some(t)) => write!(f, "at most {n} events until {t}"),
        }
    }
}
