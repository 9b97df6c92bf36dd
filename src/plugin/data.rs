//! Immutable plugin configuration snapshots
//!
//! A `PluginData` value is built once, shared read-only for the rest of
//! the run, and never mutated in place. Mutation goes through
//! `clone_builder()`: the builder owns a draft copy and `build()` emits a
//! fresh snapshot, so an already-built snapshot can never be changed
//! through a builder that outlived it.

use std::any::Any;
use std::sync::Arc;

/// An immutable, builder-constructed snapshot of one plugin's
/// configuration or initial state
pub trait PluginData: Any + Send + Sync {
    /// A builder seeded with a copy of this snapshot.
    fn clone_builder(&self) -> Box<dyn PluginDataBuilder>;

    fn as_any(&self) -> &dyn Any;

    /// Human-readable type label used in error reporting.
    fn type_label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Mutable draft for one `PluginData` type
///
/// `build()` clones the draft out; building twice without intervening
/// mutation yields equal snapshots.
pub trait PluginDataBuilder: Any {
    fn build(&mut self) -> Arc<dyn PluginData>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
