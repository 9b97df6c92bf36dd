pub mod dimension;
pub mod runner;

pub use dimension::{Dimension, DimensionContext};
pub use runner::{
    DimensionLevel, Experiment, ExperimentBuilder, ExperimentOutput, ScenarioReport,
};
