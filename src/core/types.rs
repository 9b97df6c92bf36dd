//! Core type definitions used throughout the kernel

use std::fmt;

use serde::Serialize;

/// Simulation clock value (double-precision, monotone non-decreasing)
pub type Time = f64;

/// Index of a scenario within an experiment's cartesian product
pub type ScenarioId = usize;

/// Unique identifier for plugins
///
/// A plain comparable value: any two ids with the same name are
/// interchangeable. Identity must be unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PluginId(pub &'static str);

impl PluginId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
