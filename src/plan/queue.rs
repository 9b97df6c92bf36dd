use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use ordered_float::NotNan;

use crate::core::error::{PlinthError, Result};
use crate::plan::{PlanCallback, PlanId, PlanKey};

/// Min-priority queue of plans ordered by `(time, insertion sequence)`
///
/// Cancellation removes the entry from the side table; the heap slot is
/// skipped lazily on pop.
pub struct PlanQueue {
    heap: BinaryHeap<Reverse<(NotNan<f64>, u64, PlanId)>>,
    entries: AHashMap<PlanId, PlanEntry>,
    keys: AHashMap<PlanKey, PlanId>,
    next_seq: u64,
    next_id: u64,
}

struct PlanEntry {
    callback: PlanCallback,
    key: Option<PlanKey>,
}

/// A plan popped for firing
pub(crate) struct ReadyPlan {
    pub time: f64,
    pub callback: PlanCallback,
}

impl PlanQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: AHashMap::new(),
            keys: AHashMap::new(),
            next_seq: 0,
            next_id: 0,
        }
    }

    /// Schedule a plan. `current` is the simulation clock; times strictly
    /// before it (and NaN) are rejected.
    pub(crate) fn add(
        &mut self,
        time: f64,
        current: f64,
        key: Option<PlanKey>,
        callback: PlanCallback,
    ) -> Result<PlanId> {
        let time = NotNan::new(time).map_err(|_| PlinthError::PlanTimeInPast {
            requested: f64::NAN,
            current,
        })?;
        if time.into_inner() < current {
            return Err(PlinthError::PlanTimeInPast {
                requested: time.into_inner(),
                current,
            });
        }
        if let Some(ref key) = key {
            if self.keys.contains_key(key) {
                return Err(PlinthError::DuplicatePlanKey(key.clone()));
            }
        }

        let id = PlanId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(ref key) = key {
            self.keys.insert(key.clone(), id);
        }
        self.entries.insert(id, PlanEntry { callback, key });
        self.heap.push(Reverse((time, seq, id)));
        Ok(id)
    }

    /// Cancel the plan scheduled under `key`.
    pub(crate) fn cancel_by_key(&mut self, key: &PlanKey) -> Result<()> {
        let id = self
            .keys
            .remove(key)
            .ok_or_else(|| PlinthError::UnknownPlanKey(key.clone()))?;
        self.entries.remove(&id);
        Ok(())
    }

    /// Pop the earliest live plan, skipping cancelled heap slots.
    pub(crate) fn pop(&mut self) -> Option<ReadyPlan> {
        while let Some(Reverse((time, _seq, id))) = self.heap.pop() {
            if let Some(entry) = self.entries.remove(&id) {
                if let Some(key) = entry.key {
                    self.keys.remove(&key);
                }
                return Some(ReadyPlan {
                    time: time.into_inner(),
                    callback: entry.callback,
                });
            }
        }
        None
    }

    /// Drop every remaining plan without firing it.
    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.entries.clear();
        self.keys.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::context::Context;
    use crate::random::WellRng;

    fn noop() -> PlanCallback {
        Box::new(|_| Ok(()))
    }

    fn tagged(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> PlanCallback {
        let log = Rc::clone(log);
        Box::new(move |_| {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    #[test]
    fn fires_in_time_order_with_insertion_tiebreak() {
        let mut ctx = Context::new(WellRng::seeded(1), None, None);
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut queue = PlanQueue::new();
        queue.add(5.0, 0.0, None, tagged(&log, "t5")).unwrap();
        queue.add(1.0, 0.0, None, tagged(&log, "t1")).unwrap();
        queue.add(3.0, 0.0, None, tagged(&log, "t3a")).unwrap();
        queue.add(3.0, 0.0, None, tagged(&log, "t3b")).unwrap();

        let mut fired = Vec::new();
        while let Some(plan) = queue.pop() {
            fired.push(plan.time);
            (plan.callback)(&mut ctx).unwrap();
        }
        assert_eq!(fired, vec![1.0, 3.0, 3.0, 5.0]);
        // the two 3.0 plans fire in insertion order, by identity
        assert_eq!(&*log.borrow(), &["t1", "t3a", "t3b", "t5"]);
    }

    #[test]
    fn equal_times_preserve_insertion_order() {
        let mut queue = PlanQueue::new();
        // distinguish the two 3.0 entries through their keys
        let a = queue.add(3.0, 0.0, Some(PlanKey::from("a")), noop()).unwrap();
        let b = queue.add(3.0, 0.0, Some(PlanKey::from("b")), noop()).unwrap();
        assert_ne!(a, b);

        // cancel "a": only "b" should remain, proving "a" occupied the
        // first heap slot
        queue.cancel_by_key(&PlanKey::from("a")).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn rejects_backward_time() {
        let mut queue = PlanQueue::new();
        let err = queue.add(1.0, 2.0, None, noop()).unwrap_err();
        assert!(matches!(
            err,
            PlinthError::PlanTimeInPast { requested, current }
                if requested == 1.0 && current == 2.0
        ));
    }

    #[test]
    fn rejects_nan_time() {
        let mut queue = PlanQueue::new();
        assert!(queue.add(f64::NAN, 0.0, None, noop()).is_err());
    }

    #[test]
    fn duplicate_key_rejected_until_fired() {
        let mut queue = PlanQueue::new();
        let key = PlanKey::from("daily");
        queue.add(1.0, 0.0, Some(key.clone()), noop()).unwrap();
        assert!(matches!(
            queue.add(2.0, 0.0, Some(key.clone()), noop()),
            Err(PlinthError::DuplicatePlanKey(_))
        ));

        queue.pop().unwrap();
        // key freed once the plan fires
        queue.add(2.0, 0.0, Some(key), noop()).unwrap();
    }

    #[test]
    fn cancel_unknown_key_fails() {
        let mut queue = PlanQueue::new();
        assert!(matches!(
            queue.cancel_by_key(&PlanKey::from("missing")),
            Err(PlinthError::UnknownPlanKey(_))
        ));
    }

    #[test]
    fn clear_drains_without_firing() {
        let mut queue = PlanQueue::new();
        queue.add(1.0, 0.0, None, noop()).unwrap();
        queue.add(2.0, 0.0, None, noop()).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }
}
