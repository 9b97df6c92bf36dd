//! Derived event labels
//!
//! A labeler is a named pure function from an event to a 64-bit
//! discriminant. A label combines the event type with the ordered
//! discriminants produced by a labeler set; it is the hash key under
//! which filtered subscribers are indexed, so dispatch cost tracks the
//! number of matching subscribers rather than the total subscriber
//! count.

use std::any::TypeId;
use std::rc::Rc;

/// Named pure function `&E -> u64` deriving one discriminant of an event
pub struct EventLabeler<E> {
    name: &'static str,
    derive: Rc<dyn Fn(&E) -> u64>,
}

impl<E> EventLabeler<E> {
    pub fn new(name: &'static str, derive: impl Fn(&E) -> u64 + 'static) -> Self {
        Self {
            name,
            derive: Rc::new(derive),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn derive(&self, event: &E) -> u64 {
        (self.derive)(event)
    }
}

impl<E> Clone for EventLabeler<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            derive: Rc::clone(&self.derive),
        }
    }
}

/// Composite key: event kind plus ordered derived discriminants
///
/// Computed once per event instance and labeler set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventLabel {
    event: TypeId,
    names: Vec<&'static str>,
    values: Vec<u64>,
}

impl EventLabel {
    pub fn of<E: 'static>(event: &E, labelers: &[EventLabeler<E>]) -> Self {
        Self {
            event: TypeId::of::<E>(),
            names: labelers.iter().map(EventLabeler::name).collect(),
            values: labelers.iter().map(|l| l.derive(event)).collect(),
        }
    }

    /// The label a filter's expected values stand for, without an event
    /// instance to derive from.
    pub(crate) fn from_values<E: 'static>(names: Vec<&'static str>, values: Vec<u64>) -> Self {
        Self {
            event: TypeId::of::<E>(),
            names,
            values,
        }
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }
}
