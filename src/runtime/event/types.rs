use crate::runtime::{Runtime, RuntimeError};
use crate::time::SimTime;
use std::{cmp::Ordering, fmt};

/// The state of a simulation, driven by a [`Runtime`].
///
/// An application names its [`EventSet`] and may hook into the start and
/// the end of a run. All other behaviour lives in the event handlers.
///
/// ```
/// # use des_calendar::prelude::*;
/// struct Counter { seen: usize }
///
/// enum CounterEvent { Bump }
///
/// impl Application for Counter {
///     type EventSet = CounterEvent;
///     fn at_sim_start(rt: &mut Runtime<Self>) {
///         rt.add_event(CounterEvent::Bump, SimTime::from(1.0));
///     }
/// }
///
/// impl EventSet<Counter> for CounterEvent {
///     fn handle(self, rt: &mut Runtime<Counter>) {
///         rt.app.seen += 1;
///     }
/// }
/// ```
pub trait Application: Sized {
    /// Everything that can happen in this simulation.
    type EventSet: EventSet<Self>;

    /// Runs once, after [`Runtime::start`] and before the first event.
    fn at_sim_start(_rt: &mut Runtime<Self>) {}

    /// Runs once, when the runtime is finished.
    ///
    /// # Errors
    ///
    /// An error marks the whole run as failed and is returned
    /// from [`Runtime::finish`] and [`Runtime::run`].
    fn at_sim_end(_rt: &mut Runtime<Self>) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// The closed set of events of an [`Application`], usually an enum.
///
/// Handlers receive the whole runtime, so they can mutate the
/// application and schedule follow up events.
pub trait EventSet<App>
where
    App: Application<EventSet = Self>,
{
    /// Consumes the event at its scheduled time.
    fn handle(self, rt: &mut Runtime<App>);
}

/// A single event type, for applications that dispatch their
/// [`EventSet`] variants to separate handlers.
pub trait Event<App>
where
    App: Application,
{
    /// Consumes the event at its scheduled time.
    fn handle(self, rt: &mut Runtime<App>);
}

/// Identifies one scheduled event within a runtime.
///
/// Ids grow in scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub(crate) u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// An event together with its due time, as stored in the event heap.
pub(crate) struct EventNode<E> {
    pub(crate) time: SimTime,
    pub(crate) id: EventId,
    pub(crate) event: E,
}

impl<E> EventNode<E> {
    fn key(&self) -> (SimTime, EventId) {
        (self.time, self.id)
    }
}

impl<E> PartialEq for EventNode<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<E> Eq for EventNode<E> {}

impl<E> PartialOrd for EventNode<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed: the max-heap must yield the earliest (time, id) first.
impl<E> Ord for EventNode<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl<E: fmt::Debug> fmt::Debug for EventNode<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNode")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("event", &self.event)
            .finish()
    }
}
