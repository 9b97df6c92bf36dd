use thiserror::Error;

use crate::core::types::PluginId;
use crate::plan::PlanKey;

#[derive(Error, Debug)]
pub enum PlinthError {
    #[error("Unknown dependency {dependency} required by plugin {plugin}")]
    UnknownDependency {
        plugin: PluginId,
        dependency: PluginId,
    },

    #[error("Cyclic plugin dependency among: {0:?}")]
    CyclicDependency(Vec<PluginId>),

    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(PluginId),

    #[error("Plugin data type already registered: {0}")]
    DuplicatePluginData(&'static str),

    #[error("No plugin data of type: {0}")]
    UnknownPluginData(&'static str),

    #[error("Data manager already registered: {0}")]
    DuplicateDataManager(&'static str),

    #[error("Data manager not initialized: {0}")]
    UnknownDataManager(&'static str),

    #[error("No plugin data builder of type: {0}")]
    UnknownPluginDataBuilder(&'static str),

    #[error("No scheduled plan with key: {0}")]
    UnknownPlanKey(PlanKey),

    #[error("Plan key already scheduled: {0}")]
    DuplicatePlanKey(PlanKey),

    #[error("Plan time {requested} is before current time {current}")]
    PlanTimeInPast { requested: f64, current: f64 },

    #[error("Invalid generator state: {0}")]
    InvalidGeneratorState(String),

    #[error("Contract failure: {0}")]
    ContractFailure(String),

    #[error("Scenario {scenario} failed: {cause}")]
    ScenarioFailure { scenario: usize, cause: String },

    #[error("Worker pool failure: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, PlinthError>;
