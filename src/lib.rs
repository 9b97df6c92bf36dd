//! Plinth - Deterministic Discrete-Event Simulation Kernel
//!
//! Domain modules ("plugins") own private state through data managers,
//! communicate exclusively through typed events dispatched via an
//! indexed publish/subscribe layer, and advance through a strictly
//! time-ordered plan queue. The experiment engine multiplies dimensions
//! into scenarios and runs them embarrassingly parallel, each with an
//! isolated WELL random stream.

pub mod context;
pub mod continuity;
pub mod core;
pub mod event;
pub mod experiment;
pub mod plan;
pub mod plugin;
pub mod random;
pub mod simulation;

pub use crate::context::{Context, DataManager};
pub use crate::core::{PlinthError, PluginId, Result, ScenarioId, Time};
pub use crate::event::{EventFilter, EventLabel, EventLabeler, Subscription};
pub use crate::experiment::{
    Dimension, DimensionContext, Experiment, ExperimentOutput, ScenarioReport,
};
pub use crate::plan::{PlanId, PlanKey};
pub use crate::plugin::{Plugin, PluginBuilder, PluginData, PluginDataBuilder};
pub use crate::random::{WellRng, WellState};
pub use crate::simulation::{Simulation, SimulationBuilder};
