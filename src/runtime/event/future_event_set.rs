use super::{EventId, EventNode};
use crate::time::SimTime;
use fxhash::FxHashSet;
use std::collections::BinaryHeap;

///
/// The set of all events that are scheduled but not yet dispatched.
///
/// Cancellation is lazy: a cancelled event stays in the heap
/// until it reaches the front, where it is discarded.
///
pub(crate) struct FutureEventSet<E> {
    heap: BinaryHeap<EventNode<E>>,
    pending: FxHashSet<EventId>,
    cancelled: FxHashSet<EventId>,

    next_id: u64,
    last_event_simtime: SimTime,
}

impl<E> FutureEventSet<E> {
    pub(crate) fn new(start_time: SimTime) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
            pending: FxHashSet::default(),
            cancelled: FxHashSet::default(),

            next_id: 0,
            last_event_simtime: start_time,
        }
    }

    pub(crate) fn descriptor(&self) -> String {
        "FutureEventSet::BinaryHeap()".to_string()
    }

    /// The number of live (non-cancelled) events.
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The number of events ever scheduled on this set.
    pub(crate) fn num_scheduled(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains(&id)
    }

    pub(crate) fn add(&mut self, time: SimTime, event: E) -> EventId {
        assert!(
            time >= self.last_event_simtime,
            "Sorry we cannot timetravel yet"
        );

        let id = EventId(self.next_id);
        self.next_id += 1;

        self.pending.insert(id);
        self.heap.push(EventNode { time, id, event });
        id
    }

    /// Returns `true` if the event was pending and is now cancelled.
    pub(crate) fn cancel(&mut self, id: EventId) -> bool {
        if self.pending.remove(&id) {
            self.cancelled.insert(id);
            true
        } else {
            false
        }
    }

    /// The time of the next live event, discarding cancelled
    /// events on the way.
    pub(crate) fn peek_time(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.heap.peek().map(|node| node.time)
    }

    pub(crate) fn fetch_next(&mut self) -> Option<EventNode<E>> {
        self.discard_cancelled();
        let node = self.heap.pop()?;
        self.pending.remove(&node.id);
        self.last_event_simtime = node.time;
        Some(node)
    }

    fn discard_cancelled(&mut self) {
        while let Some(node) = self.heap.peek() {
            if self.cancelled.remove(&node.id) {
                self.heap.pop();
            } else {
                break;
            }
        }
    }
}
