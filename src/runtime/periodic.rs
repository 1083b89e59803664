use super::{EventId, EventSink};
use crate::time::{Duration, SimTime};

///
/// A self-rescheduling one-shot timer.
///
/// The timer stores the event it schedules and the handle of the pending
/// instance. Once started, exactly one instance is pending until
/// [`PeriodicTimer::cancel`] is called. The owner must call
/// [`PeriodicTimer::fire`] from the handler of the timers event, which
/// rearms the timer one period later.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicTimer<E> {
    event: E,
    period: Duration,
    pending: Option<EventId>,
    fired: u64,
}

impl<E: Clone> PeriodicTimer<E> {
    /// Creates a new, unarmed timer.
    #[must_use]
    pub fn new(event: E, period: Duration) -> Self {
        Self {
            event,
            period,
            pending: None,
            fired: 0,
        }
    }

    /// The period between two fires.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The handle of the pending instance, if armed.
    #[must_use]
    pub fn pending(&self) -> Option<EventId> {
        self.pending
    }

    /// Whether a timer event is currently pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// The number of times the timer has fired.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Arms the timer, with its first fire one period from now.
    /// A previously pending instance is cancelled.
    pub fn start<S>(&mut self, sink: &mut S)
    where
        S: EventSink<E> + ?Sized,
    {
        self.cancel(sink);
        self.schedule(sink);
    }

    /// Records a fire and schedules the next instance one period from now.
    ///
    /// If the recorded instance is still pending, because `fire` was called
    /// outside of the timers own event, it is cancelled first.
    pub fn fire<S>(&mut self, sink: &mut S)
    where
        S: EventSink<E> + ?Sized,
    {
        self.fired += 1;
        self.cancel(sink);
        self.schedule(sink);
    }

    /// Disarms the timer. Returns whether an instance was pending.
    /// Cancelling an unarmed timer is a no-op.
    pub fn cancel<S>(&mut self, sink: &mut S) -> bool
    where
        S: EventSink<E> + ?Sized,
    {
        match self.pending.take() {
            Some(id) => sink.cancel(id),
            None => false,
        }
    }

    fn schedule<S>(&mut self, sink: &mut S)
    where
        S: EventSink<E> + ?Sized,
    {
        let at = SimTime::now() + self.period;
        self.pending = Some(sink.add(self.event.clone(), at));
    }
}
