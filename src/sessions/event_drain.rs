use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::SessionEvent;

/// A zero-allocation opaque iterator that drains events from a session.
///
/// This type wraps the internal event queue drain, providing a stable public
/// API that doesn't expose `std::collections::vec_deque::Drain` directly. It
/// implements [`Iterator`], [`DoubleEndedIterator`], [`ExactSizeIterator`],
/// and [`FusedIterator`].
///
/// Obtain an `EventDrain` by calling [`BattleSession::events()`].
///
/// [`BattleSession::events()`]: crate::BattleSession::events
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a, A> {
    inner: EventDrainInner<'a, A>,
}

enum EventDrainInner<'a, A> {
    Queue(Drain<'a, SessionEvent<A>>),
    #[allow(dead_code)]
    Empty,
}

impl<'a, A> EventDrain<'a, A> {
    pub(crate) fn from_drain(drain: Drain<'a, SessionEvent<A>>) -> Self {
        Self {
            inner: EventDrainInner::Queue(drain),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn empty() -> Self {
        Self {
            inner: EventDrainInner::Empty,
        }
    }
}

impl<A> Iterator for EventDrain<'_, A> {
    type Item = SessionEvent<A>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventDrainInner::Queue(drain) => drain.next(),
            EventDrainInner::Empty => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            EventDrainInner::Queue(drain) => drain.size_hint(),
            EventDrainInner::Empty => (0, Some(0)),
        }
    }
}

impl<A> DoubleEndedIterator for EventDrain<'_, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventDrainInner::Queue(drain) => drain.next_back(),
            EventDrainInner::Empty => None,
        }
    }
}

impl<A> ExactSizeIterator for EventDrain<'_, A> {
    fn len(&self) -> usize {
        match &self.inner {
            EventDrainInner::Queue(drain) => drain.len(),
            EventDrainInner::Empty => 0,
        }
    }
}

impl<A> FusedIterator for EventDrain<'_, A> {}

impl<A> std::fmt::Debug for EventDrain<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn make_event(addr: &str) -> SessionEvent<String> {
        SessionEvent::PeerConnected {
            addr: addr.to_owned(),
        }
    }

    #[test]
    fn empty_drain_returns_none() {
        let mut drain = EventDrain::<String>::empty();
        assert!(drain.next().is_none());
        assert_eq!(drain.len(), 0);
    }

    #[test]
    fn drain_from_queue_yields_all_events() {
        let mut queue: VecDeque<SessionEvent<String>> = VecDeque::new();
        queue.push_back(make_event("a"));
        queue.push_back(make_event("b"));

        let drain = EventDrain::from_drain(queue.drain(..));
        let events: Vec<_> = drain.collect();
        assert_eq!(events, vec![make_event("a"), make_event("b")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_is_fused() {
        let mut queue: VecDeque<SessionEvent<String>> = VecDeque::new();
        queue.push_back(make_event("a"));

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert!(drain.next().is_some());
        assert!(drain.next().is_none());
        assert!(drain.next().is_none());
    }

    #[test]
    fn double_ended_iteration() {
        let mut queue: VecDeque<SessionEvent<String>> = VecDeque::new();
        queue.push_back(make_event("a"));
        queue.push_back(make_event("b"));
        queue.push_back(make_event("c"));

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.next_back(), Some(make_event("c")));
        assert_eq!(drain.next(), Some(make_event("a")));
        assert_eq!(drain.next_back(), Some(make_event("b")));
        assert!(drain.next().is_none());
    }

    #[test]
    fn debug_format_shows_remaining_count() {
        let mut queue: VecDeque<SessionEvent<String>> = VecDeque::new();
        queue.push_back(make_event("a"));
        let drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 1 }");
    }
}
