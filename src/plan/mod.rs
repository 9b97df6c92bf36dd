//! Time-ordered plan scheduling
//!
//! A plan is a unit of work bound to a simulation-clock time. Plans fire
//! in non-decreasing time order; ties break by insertion order. Popping
//! and firing the lowest entry is the sole driver of simulation progress.

pub mod queue;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::core::error::Result;

pub use queue::PlanQueue;

/// Handle to a scheduled plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlanId(pub(crate) u64);

/// Serializable key identifying which registered consumer a plan stands
/// for
///
/// Callbacks are never persisted; a checkpointed plan is re-attached by
/// looking its key up in a consumer registry on the next run. Within a
/// live process the key also supports cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanKey(pub String);

impl PlanKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for PlanKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Work scheduled against the simulation clock
pub(crate) type PlanCallback = Box<dyn FnOnce(&mut Context) -> Result<()>>;
