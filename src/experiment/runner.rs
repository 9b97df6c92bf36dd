//! Multi-scenario experiment execution
//!
//! The experiment engine computes the cartesian product of its
//! dimensions' levels into scenarios, derives one independent seed per
//! scenario from a master stream, and executes scenarios either inline
//! (one worker) or on a bounded rayon pool. Scenarios share nothing
//! mutable; all output flows through one channel tagged with the
//! scenario id, and a failing scenario never aborts its siblings.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashMap;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use serde::Serialize;

use crate::core::error::{PlinthError, Result};
use crate::core::types::ScenarioId;
use crate::experiment::dimension::{Dimension, DimensionContext};
use crate::plugin::data::{PluginData, PluginDataBuilder};
use crate::plugin::plugin::Plugin;
use crate::random::WellRng;
use crate::simulation::Simulation;

/// One applied dimension level, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionLevel {
    pub dimension: String,
    pub level: usize,
    pub metadata: Vec<String>,
}

/// Which level of each dimension a scenario was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub scenario: ScenarioId,
    pub levels: Vec<DimensionLevel>,
}

/// Tagged writes on the experiment output channel
pub enum ExperimentOutput {
    /// Emitted once per scenario, before its plans run
    Report(ScenarioReport),
    /// An object released by the scenario through
    /// [`Context::release_output`](crate::context::Context::release_output)
    Item {
        scenario: ScenarioId,
        payload: Box<dyn Any + Send>,
    },
    /// A scenario-level runtime failure; siblings keep running
    ScenarioFailure {
        scenario: ScenarioId,
        error: PlinthError,
    },
}

/// Plugins, dimensions and execution parameters for a scenario set
pub struct Experiment {
    plugins: Vec<Plugin>,
    dimensions: Vec<Dimension>,
    threads: usize,
    seed: u64,
}

impl Experiment {
    pub fn builder() -> ExperimentBuilder {
        ExperimentBuilder {
            plugins: Vec::new(),
            dimensions: Vec::new(),
            threads: 1,
            seed: 0,
        }
    }

    /// Product of all dimension level counts; 1 when there are no
    /// dimensions.
    pub fn scenario_count(&self) -> usize {
        self.dimensions.iter().map(Dimension::level_count).product()
    }

    /// Execute every scenario, blocking until all complete.
    ///
    /// `on_output` runs on the driving thread and receives every tagged
    /// write in channel order. Per-scenario seeds are drawn from the
    /// master stream up front, so results are reproducible regardless of
    /// worker count or execution order.
    pub fn execute(self, mut on_output: impl FnMut(ExperimentOutput)) -> Result<()> {
        let count = self.scenario_count();
        let mut master = WellRng::seeded(self.seed);
        let seeds: Vec<u64> = (0..count).map(|_| master.next_u64()).collect();

        tracing::info!(
            "executing {count} scenario(s) across {} dimension(s) on {} worker(s)",
            self.dimensions.len(),
            self.threads
        );

        let (tx, rx) = crossbeam_channel::unbounded();
        if self.threads <= 1 {
            for (scenario, &seed) in seeds.iter().enumerate() {
                run_scenario(&self.plugins, &self.dimensions, scenario, seed, &tx);
                while let Ok(out) = rx.try_recv() {
                    on_output(out);
                }
            }
            drop(tx);
            while let Ok(out) = rx.try_recv() {
                on_output(out);
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build()
                .map_err(|e| PlinthError::WorkerPool(e.to_string()))?;
            let plugins = &self.plugins;
            let dimensions = &self.dimensions;
            std::thread::scope(|scope| {
                scope.spawn(move || {
                    pool.install(|| {
                        seeds.par_iter().enumerate().for_each(|(scenario, &seed)| {
                            run_scenario(plugins, dimensions, scenario, seed, &tx);
                        });
                    });
                    drop(tx);
                });
                for out in rx {
                    on_output(out);
                }
            });
        }
        Ok(())
    }
}

pub struct ExperimentBuilder {
    plugins: Vec<Plugin>,
    dimensions: Vec<Dimension>,
    threads: usize,
    seed: u64,
}

impl ExperimentBuilder {
    pub fn add_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Add an axis of variation. The first-added dimension varies
    /// fastest across scenario ids.
    pub fn add_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Worker pool size; 1 (the default) runs fully sequentially.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Seed of the master stream scenario seeds are derived from.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Experiment {
        Experiment {
            plugins: self.plugins,
            dimensions: self.dimensions,
            threads: self.threads,
            seed: self.seed,
        }
    }
}

/// Assemble and run one scenario; failures become tagged channel writes.
fn run_scenario(
    plugins: &[Plugin],
    dimensions: &[Dimension],
    scenario: ScenarioId,
    seed: u64,
    tx: &Sender<ExperimentOutput>,
) {
    let result = assemble_and_execute(plugins, dimensions, scenario, seed, tx);
    if let Err(error) = result {
        tracing::warn!("scenario {scenario} failed: {error}");
        let _ = tx.send(ExperimentOutput::ScenarioFailure { scenario, error });
    }
}

fn assemble_and_execute(
    plugins: &[Plugin],
    dimensions: &[Dimension],
    scenario: ScenarioId,
    seed: u64,
    tx: &Sender<ExperimentOutput>,
) -> Result<()> {
    // scenario-local builders cloned from the shared plugin templates
    let mut builders: AHashMap<TypeId, Box<dyn PluginDataBuilder>> = AHashMap::new();
    let mut data_types: Vec<Vec<TypeId>> = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        let mut types = Vec::with_capacity(plugin.data().len());
        for data in plugin.data() {
            let mut builder = data.clone_builder();
            // deref to the trait object so the concrete builder type is
            // keyed, not the reference
            let type_id = (*builder.as_any_mut()).type_id();
            types.push(type_id);
            builders.insert(type_id, builder);
        }
        data_types.push(types);
    }

    // mixed-radix decomposition of the scenario id, first dimension
    // fastest
    let mut remaining = scenario;
    let mut levels = Vec::with_capacity(dimensions.len());
    {
        let mut dim_ctx = DimensionContext::new(&mut builders);
        for dimension in dimensions {
            let level = remaining % dimension.level_count();
            remaining /= dimension.level_count();
            let metadata = dimension.apply(level, &mut dim_ctx)?;
            levels.push(DimensionLevel {
                dimension: dimension.name().to_owned(),
                level,
                metadata,
            });
        }
    }
    let _ = tx.send(ExperimentOutput::Report(ScenarioReport { scenario, levels }));

    let mut scenario_plugins = Vec::with_capacity(plugins.len());
    for (plugin, types) in plugins.iter().zip(&data_types) {
        let data: Vec<Arc<dyn PluginData>> = types
            .iter()
            .map(|type_id| {
                builders
                    .get_mut(type_id)
                    .expect("builder registered during assembly")
                    .build()
            })
            .collect();
        scenario_plugins.push(plugin.with_data_set(data));
    }

    let items = tx.clone();
    Simulation::builder()
        .add_plugins(scenario_plugins)
        .with_seed(seed)
        .with_scenario(scenario)
        .with_output(move |payload| {
            let _ = items.send(ExperimentOutput::Item { scenario, payload });
        })
        .build()
        .execute()
}
