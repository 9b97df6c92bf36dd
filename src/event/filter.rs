//! Refined subscriptions
//!
//! A filter is an ordered conjunction of `(labeler, expected value)`
//! pairs: an event matches iff every labeler's derived value equals the
//! expected value. Filters sharing the same ordered labeler names share
//! one subscriber index.

use crate::event::label::EventLabeler;

/// Conjunction of derived-value equality predicates over events of type
/// `E`
pub struct EventFilter<E> {
    terms: Vec<(EventLabeler<E>, u64)>,
}

impl<E> EventFilter<E> {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add one `(labeler, expected)` term. Term order is significant:
    /// filters with the same labelers in a different order index
    /// separately.
    pub fn with(mut self, labeler: EventLabeler<E>, expected: u64) -> Self {
        self.terms.push((labeler, expected));
        self
    }

    /// True iff every term's derived value equals its expected value.
    pub fn matches(&self, event: &E) -> bool {
        self.terms.iter().all(|(l, expected)| l.derive(event) == *expected)
    }

    pub(crate) fn labelers(&self) -> Vec<EventLabeler<E>> {
        self.terms.iter().map(|(l, _)| l.clone()).collect()
    }

    pub(crate) fn expected_values(&self) -> Vec<u64> {
        self.terms.iter().map(|(_, v)| *v).collect()
    }

    pub(crate) fn signature(&self) -> Vec<&'static str> {
        self.terms.iter().map(|(l, _)| l.name()).collect()
    }
}

impl<E> Default for EventFilter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventFilter<E> {
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
        }
    }
}
