//! Dimensions: named axes of scenario variation
//!
//! Each level of a dimension is a function that mutates a scenario-local
//! set of plugin-data builders and returns ordered metadata strings
//! describing the level for reporting.

use std::any::{type_name, TypeId};

use ahash::AHashMap;

use crate::core::error::{PlinthError, Result};
use crate::plugin::data::PluginDataBuilder;

type LevelFn = std::sync::Arc<dyn Fn(&mut DimensionContext<'_>) -> Result<Vec<String>> + Send + Sync>;

/// One independent axis of parameter variation across scenarios
pub struct Dimension {
    name: String,
    levels: Vec<LevelFn>,
}

impl Dimension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            levels: Vec::new(),
        }
    }

    /// Append a level. Level order is the order of scenario enumeration
    /// along this axis.
    pub fn with_level(
        mut self,
        level: impl Fn(&mut DimensionContext<'_>) -> Result<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.levels.push(std::sync::Arc::new(level));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn apply(
        &self,
        level: usize,
        ctx: &mut DimensionContext<'_>,
    ) -> Result<Vec<String>> {
        (self.levels[level])(ctx)
    }
}

/// Mutable access to one scenario's plugin-data builders
///
/// Builders are keyed by their concrete type; a level asks for the
/// builder type it knows how to mutate.
pub struct DimensionContext<'a> {
    builders: &'a mut AHashMap<TypeId, Box<dyn PluginDataBuilder>>,
}

impl<'a> DimensionContext<'a> {
    pub(crate) fn new(builders: &'a mut AHashMap<TypeId, Box<dyn PluginDataBuilder>>) -> Self {
        Self { builders }
    }

    /// The scenario-local builder of type `B`.
    pub fn builder<B: PluginDataBuilder>(&mut self) -> Result<&mut B> {
        self.builders
            .get_mut(&TypeId::of::<B>())
            .and_then(|b| b.as_any_mut().downcast_mut::<B>())
            .ok_or(PlinthError::UnknownPluginDataBuilder(type_name::<B>()))
    }
}
