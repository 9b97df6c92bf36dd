//! Subscriber storage for typed events
//!
//! Two tiers: direct subscribers receive every event of their type;
//! filtered subscribers are indexed by derived label so the dispatcher
//! touches one hash bucket per labeler-set instead of scanning all
//! subscribers. Dispatch itself (two-phase, re-entrant queue) lives on
//! [`Context`](crate::context::Context).

use std::any::TypeId;
use std::rc::Rc;

use ahash::AHashMap;

use crate::context::Context;
use crate::core::error::Result;
use crate::event::filter::EventFilter;
use crate::event::label::{EventLabel, EventLabeler};

pub(crate) type ValidatorFn<E> = dyn Fn(&Context, &E) -> Result<()>;
pub(crate) type HandlerFn<E> = dyn Fn(&mut Context, &E);

/// One subscriber: an execution handler plus an optional validation-phase
/// check and an optional filter
pub struct Subscription<E> {
    pub(crate) filter: Option<EventFilter<E>>,
    pub(crate) validator: Option<Rc<ValidatorFn<E>>>,
    pub(crate) handler: Rc<HandlerFn<E>>,
}

impl<E: 'static> Subscription<E> {
    pub fn new(handler: impl Fn(&mut Context, &E) + 'static) -> Self {
        Self {
            filter: None,
            validator: None,
            handler: Rc::new(handler),
        }
    }

    /// Restrict this subscriber to events matching `filter`.
    pub fn with_filter(mut self, filter: EventFilter<E>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Attach a validation-phase check. An error aborts the publish
    /// before any subscriber executes.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Context, &E) -> Result<()> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }
}

pub(crate) struct StoredSub<E> {
    pub validator: Option<Rc<ValidatorFn<E>>>,
    pub handler: Rc<HandlerFn<E>>,
}

impl<E> Clone for StoredSub<E> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            handler: Rc::clone(&self.handler),
        }
    }
}

/// Filtered subscribers sharing one ordered labeler-name signature
struct IndexGroup<E> {
    labelers: Vec<EventLabeler<E>>,
    signature: Vec<&'static str>,
    buckets: AHashMap<EventLabel, Vec<StoredSub<E>>>,
}

struct EventIndex<E> {
    groups: Vec<IndexGroup<E>>,
}

pub(crate) struct EventBus {
    // values are Box<Vec<StoredSub<E>>> / Box<EventIndex<E>>
    direct: AHashMap<TypeId, Box<dyn std::any::Any>>,
    indexed: AHashMap<TypeId, Box<dyn std::any::Any>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self {
            direct: AHashMap::new(),
            indexed: AHashMap::new(),
        }
    }

    pub(crate) fn subscribe<E: 'static>(&mut self, sub: Subscription<E>) {
        let stored = StoredSub {
            validator: sub.validator,
            handler: sub.handler,
        };
        match sub.filter {
            None => {
                let subs = self
                    .direct
                    .entry(TypeId::of::<E>())
                    .or_insert_with(|| Box::new(Vec::<StoredSub<E>>::new()))
                    .downcast_mut::<Vec<StoredSub<E>>>()
                    .expect("direct subscriber list keyed by event type");
                subs.push(stored);
            }
            Some(filter) => {
                let index = self
                    .indexed
                    .entry(TypeId::of::<E>())
                    .or_insert_with(|| {
                        Box::new(EventIndex::<E> { groups: Vec::new() })
                    })
                    .downcast_mut::<EventIndex<E>>()
                    .expect("event index keyed by event type");

                let signature = filter.signature();
                let position = index
                    .groups
                    .iter()
                    .position(|g| g.signature == signature)
                    .unwrap_or_else(|| {
                        index.groups.push(IndexGroup {
                            labelers: filter.labelers(),
                            signature,
                            buckets: AHashMap::new(),
                        });
                        index.groups.len() - 1
                    });
                let group = &mut index.groups[position];
                let label =
                    EventLabel::from_values::<E>(group.signature.clone(), filter.expected_values());
                group.buckets.entry(label).or_default().push(stored);
            }
        }
    }

    /// Clone out every subscriber interested in `event`: all direct
    /// subscribers plus, per index group, the bucket keyed by the event's
    /// derived label values.
    pub(crate) fn interested<E: 'static>(&self, event: &E) -> Vec<StoredSub<E>> {
        let mut matched = Vec::new();
        if let Some(subs) = self.direct.get(&TypeId::of::<E>()) {
            let subs = subs
                .downcast_ref::<Vec<StoredSub<E>>>()
                .expect("direct subscriber list keyed by event type");
            matched.extend(subs.iter().cloned());
        }
        if let Some(index) = self.indexed.get(&TypeId::of::<E>()) {
            let index = index
                .downcast_ref::<EventIndex<E>>()
                .expect("event index keyed by event type");
            for group in &index.groups {
                let label = EventLabel::of(event, &group.labelers);
                if let Some(subs) = group.buckets.get(&label) {
                    matched.extend(subs.iter().cloned());
                }
            }
        }
        matched
    }
}
