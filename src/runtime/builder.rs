use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError, TryLockError},
};

use rand::{rngs::StdRng, SeedableRng};

use crate::time::SimTime;

use super::{Application, FutureEventSet, Profiler, Runtime, RuntimeLimit, State};

/// Held by the one live runtime. The simulation clock is process wide.
static SIMULATION_LOCK: Mutex<()> = Mutex::new(());

fn acquire_simulation_lock() -> MutexGuard<'static, ()> {
    let recover = |poisoned: PoisonError<MutexGuard<'static, ()>>| {
        tracing::error!("simulation lock was poisoned by a panicking runtime, recovering");
        poisoned.into_inner()
    };

    match SIMULATION_LOCK.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => recover(poisoned),
        Err(TryLockError::WouldBlock) => {
            tracing::warn!("waiting for another runtime to be dropped");
            SIMULATION_LOCK.lock().unwrap_or_else(recover)
        }
    }
}

/// Configures and creates a [`Runtime`].
///
/// ```
/// # use des_calendar::prelude::*;
/// # struct Idle;
/// # enum Never {}
/// # impl Application for Idle { type EventSet = Never; }
/// # impl EventSet<Idle> for Never { fn handle(self, _: &mut Runtime<Idle>) {} }
/// let rt = Builder::seeded(7)
///     .quiet()
///     .max_time(SimTime::from(60.0))
///     .build(Idle);
/// # drop(rt);
/// ```
#[must_use]
pub struct Builder {
    rng: StdRng,
    limit: RuntimeLimit,
    quiet: bool,
}

impl Builder {
    /// A builder whose runtime draws randomness seeded by the OS.
    pub fn new() -> Builder {
        Builder::with_rng(StdRng::from_os_rng())
    }

    /// A builder whose runtime is reproducible for a given `seed`.
    pub fn seeded(seed: u64) -> Builder {
        Builder::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Builder {
        Builder {
            rng,
            limit: RuntimeLimit::UNBOUNDED,
            quiet: false,
        }
    }

    /// Skips the start and end banners on stdout.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Stops after `max_itr` dispatched events.
    pub fn max_itr(self, max_itr: usize) -> Self {
        self.limit(RuntimeLimit::events(max_itr))
    }

    /// Stops before the first event scheduled after `max_time`.
    pub fn max_time(self, max_time: SimTime) -> Self {
        self.limit(RuntimeLimit::until(max_time))
    }

    /// Merges `limit` into the configured bounds. Stricter bounds win.
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit = self.limit.tighten(limit);
        self
    }

    /// Creates the runtime around `app` with the clock reset to zero.
    ///
    /// Only one runtime may exist at a time. While another one is alive,
    /// this call blocks until it is dropped.
    pub fn build<A: Application>(self, app: A) -> Runtime<A> {
        let permit = acquire_simulation_lock();
        SimTime::set_now(SimTime::ZERO);

        Runtime {
            app,
            state: State::Ready,
            limit: self.limit,
            itr: 0,
            quiet: self.quiet,
            profiler: Profiler::default(),
            rng: self.rng,
            permit,
            future_event_set: FutureEventSet::new(SimTime::ZERO),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("limit", &self.limit)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}
