//! Debounced save scheduling
//!
//! One pending deadline per entry. Scheduling again before the deadline
//! replaces it, so a burst of qualifying changes yields a single save timed
//! from the last change.

use crate::types::EntryId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct SaveDebouncer {
    delay: Duration,
    pending: HashMap<EntryId, Instant>,
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Get the debounce delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending save for `id` and schedule one at `now + delay`
    pub fn schedule(&mut self, id: EntryId, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.pending.insert(id, deadline);
        deadline
    }

    /// Cancel the pending save for `id`, returning whether one existed
    pub fn cancel(&mut self, id: &EntryId) -> bool {
        self.pending.remove(id).is_some()
    }

    pub fn is_pending(&self, id: &EntryId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every entry whose deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Vec<EntryId> {
        let mut due: Vec<(Instant, EntryId)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, deadline)| (*deadline, id.clone()))
            .collect();
        due.sort();

        for (_, id) in &due {
            self.pending.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Drop every pending save
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_delay() {
        let debouncer = SaveDebouncer::new(Duration::from_millis(250));
        assert_eq!(debouncer.delay(), Duration::from_millis(250));
        assert_eq!(debouncer.next_deadline(), None);
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let mut debouncer = SaveDebouncer::new(Duration::from_secs(3));
        let id = EntryId::from("a");
        let start = Instant::now();

        debouncer.schedule(id.clone(), start);
        let last = debouncer.schedule(id.clone(), start + Duration::from_secs(2));
        assert_eq!(debouncer.pending_count(), 1);
        assert_eq!(last, start + Duration::from_secs(5));

        // The first deadline has passed but was superseded
        assert!(debouncer.take_due(start + Duration::from_secs(4)).is_empty());
        assert_eq!(debouncer.take_due(start + Duration::from_secs(5)), vec![id.clone()]);
        assert!(!debouncer.is_pending(&id));
    }

    #[test]
    fn test_independent_entries() {
        let mut debouncer = SaveDebouncer::new(Duration::from_secs(1));
        let start = Instant::now();
        debouncer.schedule(EntryId::from("b"), start + Duration::from_millis(500));
        debouncer.schedule(EntryId::from("a"), start);

        assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_secs(1)));
        let due = debouncer.take_due(start + Duration::from_secs(2));
        assert_eq!(due, vec![EntryId::from("a"), EntryId::from("b")]);
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut debouncer = SaveDebouncer::new(Duration::from_secs(1));
        let now = Instant::now();
        debouncer.schedule(EntryId::from("a"), now);
        debouncer.schedule(EntryId::from("b"), now);

        assert!(debouncer.cancel(&EntryId::from("a")));
        assert!(!debouncer.cancel(&EntryId::from("a")));
        assert_eq!(debouncer.clear(), 1);
        assert_eq!(debouncer.pending_count(), 0);
    }
}
