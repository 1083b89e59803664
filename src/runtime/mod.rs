//! The discrete event core: applications, their event sets and the
//! [`Runtime`] that dispatches them in time order.
//!
//! A runtime owns the application, a future event set and a seeded RNG.
//! Simulation time only moves while an event is dispatched, and the
//! current time is readable everywhere through [`SimTime::now`].

use crate::time::{Duration, SimTime};
use rand::{rngs::StdRng, RngCore};
use std::{any::type_name, fmt, sync::MutexGuard, time::Instant};

mod event;
pub use self::event::*;

mod limit;
pub use self::limit::*;

mod builder;
pub use builder::*;

mod error;
pub use error::*;

mod periodic;
pub use periodic::*;

/// Executes the events of an [`Application`].
///
/// Create one with a [`Builder`], then either call [`Runtime::run`], or
/// drive it by hand with [`Runtime::start`], the `dispatch_*` methods
/// and [`Runtime::finish`].
///
/// ```
/// use des_calendar::prelude::*;
///
/// struct Pings { at: Vec<SimTime> }
///
/// enum Ping { Send }
///
/// impl Application for Pings {
///     type EventSet = Ping;
///     fn at_sim_start(rt: &mut Runtime<Self>) {
///         rt.add_event(Ping::Send, SimTime::from(1.0));
///         rt.add_event(Ping::Send, SimTime::from(3.0));
///     }
/// }
///
/// impl EventSet<Pings> for Ping {
///     fn handle(self, rt: &mut Runtime<Pings>) {
///         rt.app.at.push(SimTime::now());
///     }
/// }
///
/// let rt = Builder::seeded(1).quiet().build(Pings { at: Vec::new() });
/// let (app, end, profiler) = rt.run().unwrap();
/// assert_eq!(end, SimTime::from(3.0));
/// assert_eq!(profiler.event_count, 2);
/// assert_eq!(app.at, vec![SimTime::from(1.0), SimTime::from(3.0)]);
/// ```
pub struct Runtime<A: Application> {
    /// The simulated system.
    pub app: A,

    state: State,
    limit: RuntimeLimit,
    itr: usize,
    quiet: bool,
    profiler: Profiler,
    rng: StdRng,
    future_event_set: FutureEventSet<A::EventSet>,

    // Released on drop, letting the next runtime take the clock.
    #[allow(dead_code)]
    permit: MutexGuard<'static, ()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Running,
}

impl<A: Application> Runtime<A> {
    /// Events scheduled over the lifetime of this runtime, cancelled ones included.
    #[inline]
    pub fn num_events_scheduled(&self) -> u64 {
        self.future_event_set.num_scheduled()
    }

    /// Events handled so far.
    pub fn num_events_dispatched(&self) -> usize {
        self.itr
    }

    /// Events still waiting to be dispatched.
    pub fn num_events_pending(&self) -> usize {
        self.future_event_set.len()
    }

    /// Same as [`SimTime::now`].
    #[allow(clippy::unused_self)]
    pub fn sim_time(&self) -> SimTime {
        SimTime::now()
    }

    /// The runtime's seeded RNG.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    /// Borrows the application next to a [`Scheduler`], so handlers can
    /// mutate components and schedule their events at the same time.
    pub fn split(&mut self) -> (&mut A, Scheduler<'_, A>) {
        let (app, sched, _) = self.split_with_rng();
        (app, sched)
    }

    /// Like [`Runtime::split`], additionally handing out the RNG.
    pub fn split_with_rng(&mut self) -> (&mut A, Scheduler<'_, A>, &mut StdRng) {
        let sched = Scheduler {
            future_event_set: &mut self.future_event_set,
        };
        (&mut self.app, sched, &mut self.rng)
    }

    /// Schedules `event` at `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` lies before the most recently dispatched event.
    pub fn add_event(&mut self, event: impl Into<A::EventSet>, time: SimTime) -> EventId {
        self.future_event_set.add(time, event.into())
    }

    /// Schedules `event` after `delay`, relative to the current time.
    pub fn add_event_in(
        &mut self,
        event: impl Into<A::EventSet>,
        delay: impl Into<Duration>,
    ) -> EventId {
        let time = SimTime::now() + delay.into();
        self.add_event(event, time)
    }

    /// Cancels a pending event. Returns `false` if it already ran or
    /// was cancelled before.
    pub fn cancel_event(&mut self, id: EventId) -> bool {
        self.future_event_set.cancel(id)
    }

    /// Whether `id` is still waiting to be dispatched.
    pub fn is_event_pending(&self, id: EventId) -> bool {
        self.future_event_set.is_pending(id)
    }

    /// Starts, drains and finishes the simulation in one go.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`Application::at_sim_end`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime was already started.
    pub fn run(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        self.start();
        self.dispatch_all();
        self.finish()
    }

    /// Moves the runtime into the running state and calls
    /// [`Application::at_sim_start`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime was already started.
    pub fn start(&mut self) {
        assert_eq!(self.state, State::Ready, "runtime was already started");

        if !self.quiet {
            println!(
                "[des] starting {} ({}, {})",
                type_name::<A>(),
                self.future_event_set.descriptor(),
                self.limit
            );
        }

        self.state = State::Running;
        self.profiler.start();
        A::at_sim_start(self);
    }

    /// Dispatches up to `n` further events, within the configured limit.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is not running.
    pub fn dispatch_n_events(&mut self, n: usize) {
        let limit = self.limit.tighten(RuntimeLimit::events(self.itr + n));
        self.dispatch_within(limit);
    }

    /// Dispatches every event due at or before `t`, within the configured
    /// limit, then moves the clock to `t` if it is still behind.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is not running.
    pub fn dispatch_events_until(&mut self, t: SimTime) {
        let limit = self.limit.tighten(RuntimeLimit::until(t));
        self.dispatch_within(limit);
        if SimTime::now() < t {
            SimTime::set_now(t);
        }
    }

    /// Dispatches events until the event set is empty or the configured
    /// limit stops the runtime.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is not running.
    pub fn dispatch_all(&mut self) {
        self.dispatch_within(self.limit);
    }

    /// Calls [`Application::at_sim_end`] and hands back the application,
    /// the final simulation time and the run profile.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`Application::at_sim_end`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime was never started.
    pub fn finish(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        assert_eq!(self.state, State::Running, "runtime was never started");

        A::at_sim_end(&mut self)?;
        self.profiler.finish(self.itr);

        let end = SimTime::now();
        if !self.quiet {
            let pending = self.future_event_set.len();
            if pending == 0 {
                println!("[des] finished after {} events at {end}", self.itr);
            } else {
                println!(
                    "[des] stopped after {} events at {end}, {pending} events left",
                    self.itr
                );
            }
        }

        Ok((self.app, end, self.profiler))
    }

    fn dispatch_within(&mut self, limit: RuntimeLimit) {
        assert_eq!(self.state, State::Running, "runtime is not running");
        while self.step(limit) {}
    }

    /// Handles the next event, unless none is left or `limit` forbids it.
    fn step(&mut self, limit: RuntimeLimit) -> bool {
        match self.future_event_set.peek_time() {
            Some(time) if !limit.forbids(self.itr + 1, time) => {}
            _ => return false,
        }
        let Some(node) = self.future_event_set.fetch_next() else {
            return false;
        };

        self.itr += 1;
        // The only place that advances the clock while running.
        SimTime::set_now(node.time);
        node.event.handle(self);
        true
    }
}

impl<A: Application> fmt::Debug for Runtime<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("app", &type_name::<A>())
            .field("state", &self.state)
            .field("sim_time", &SimTime::now())
            .field("dispatched", &self.itr)
            .field("pending", &self.future_event_set.len())
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Wall clock statistics of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiler {
    started: Instant,
    /// Wall clock time between start and finish.
    pub duration: std::time::Duration,
    /// Number of dispatched events.
    pub event_count: usize,
}

impl Profiler {
    fn start(&mut self) {
        self.started = Instant::now();
    }

    fn finish(&mut self, event_count: usize) {
        self.duration = self.started.elapsed();
        self.event_count = event_count;
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Profiler {
            started: Instant::now(),
            duration: std::time::Duration::ZERO,
            event_count: 0,
        }
    }
}
