//! Plugins, plugin data and dependency-ordered lifecycle

pub mod data;
pub mod lifecycle;
#[allow(clippy::module_inception)]
pub mod plugin;

pub use data::{PluginData, PluginDataBuilder};
pub use plugin::{Plugin, PluginBuilder, PluginInit};
