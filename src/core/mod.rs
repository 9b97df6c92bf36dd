pub mod error;
pub mod types;

pub use error::{PlinthError, Result};
pub use types::{PluginId, ScenarioId, Time};
