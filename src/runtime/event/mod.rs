use crate::time::{Duration, SimTime};

mod types;
pub use types::*;

mod future_event_set;
pub(crate) use future_event_set::*;

use super::Runtime;

///
/// A target that accepts one-shot events for delayed execution.
///
/// This is the scheduling contract components use to arm and disarm
/// their timers, without depending on the concrete application
/// they are embedded in.
///
pub trait EventSink<E> {
    ///
    /// Schedules an event at the given (non-past) time.
    ///
    fn add(&mut self, event: E, time: SimTime) -> EventId;

    ///
    /// Cancels a pending event. Returns `false` if the event
    /// was allready dispatched or cancelled.
    ///
    fn cancel(&mut self, id: EventId) -> bool;

    ///
    /// Schedules an event in `duration` time units from now.
    ///
    fn add_in(&mut self, event: E, duration: Duration) -> EventId {
        self.add(event, SimTime::now() + duration)
    }
}

impl<A, E> EventSink<E> for Runtime<A>
where
    A: Application,
    E: Into<A::EventSet>,
{
    fn add(&mut self, event: E, time: SimTime) -> EventId {
        self.add_event(event, time)
    }

    fn cancel(&mut self, id: EventId) -> bool {
        self.cancel_event(id)
    }
}

///
/// A scheduling handle into a runtimes future event set, that
/// can be used while the application is borrowed mutably.
///
/// Created by [`Runtime::split`].
///
pub struct Scheduler<'a, A: Application> {
    pub(super) future_event_set: &'a mut FutureEventSet<A::EventSet>,
}

impl<A, E> EventSink<E> for Scheduler<'_, A>
where
    A: Application,
    E: Into<A::EventSet>,
{
    fn add(&mut self, event: E, time: SimTime) -> EventId {
        self.future_event_set.add(time, event.into())
    }

    fn cancel(&mut self, id: EventId) -> bool {
        self.future_event_set.cancel(id)
    }
}

impl<A: Application> std::fmt::Debug for Scheduler<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.future_event_set.len())
            .finish()
    }
}
