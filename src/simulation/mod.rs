//! Single-scenario simulation driver
//!
//! Assembles plugins into a [`Context`], initializes data managers in
//! dependency order, then pops plans in strict `(time, insertion)` order
//! until the queue is empty or a halt is requested. Given the same
//! plugin data and seed, the fired sequence is bit-identical across
//! runs.

use std::any::Any;

use ahash::AHashSet;

use crate::context::{Context, OutputSink};
use crate::core::error::{PlinthError, Result};
use crate::core::types::ScenarioId;
use crate::plugin::lifecycle::initialization_order;
use crate::plugin::plugin::Plugin;
use crate::random::{WellRng, WellState};

/// A fully configured, executable scenario
pub struct Simulation {
    plugins: Vec<Plugin>,
    seed: u64,
    rng_state: Option<WellState>,
    output: Option<OutputSink>,
    scenario: Option<ScenarioId>,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder {
            plugins: Vec::new(),
            seed: 0,
            rng_state: None,
            output: None,
            scenario: None,
        }
    }

    /// Run the scenario to completion.
    ///
    /// Configuration errors (duplicate registration, unknown or cyclic
    /// dependencies, malformed generator state) are reported before any
    /// plan executes. A plan callback error terminates the scenario.
    pub fn execute(self) -> Result<()> {
        let mut seen = AHashSet::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            if !seen.insert(plugin.id()) {
                return Err(PlinthError::DuplicatePlugin(plugin.id()));
            }
        }
        let order = initialization_order(&self.plugins)?;

        let rng = match self.rng_state {
            Some(state) => WellRng::restore(state)?,
            None => WellRng::seeded(self.seed),
        };
        let mut ctx = Context::new(rng, self.scenario, self.output);

        // snapshots registered up front so any initializer can read any
        // plugin's data
        for plugin in &self.plugins {
            for data in plugin.data() {
                ctx.add_plugin_data(data.clone())?;
            }
        }

        for &idx in &order {
            let plugin = &self.plugins[idx];
            tracing::debug!("initializing plugin {}", plugin.id());
            if let Some(init) = plugin.initializer() {
                init(&mut ctx)?;
            }
        }

        while !ctx.is_halted() && ctx.fire_next_plan()? {}
        if ctx.is_halted() {
            let dropped = ctx.remaining_plans();
            if dropped > 0 {
                tracing::debug!("halt drained {dropped} unfired plans");
            }
            ctx.drain_plans();
        }

        for handler in ctx.take_close_handlers() {
            handler(&mut ctx)?;
        }
        Ok(())
    }
}

pub struct SimulationBuilder {
    plugins: Vec<Plugin>,
    seed: u64,
    rng_state: Option<WellState>,
    output: Option<OutputSink>,
    scenario: Option<ScenarioId>,
}

impl SimulationBuilder {
    /// Register a plugin. Identity must be unique within the run.
    pub fn add_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn add_plugins(mut self, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Seed for the scenario's random stream.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Resume the random stream from an exact captured state instead of
    /// seeding a fresh one.
    pub fn with_rng_state(mut self, state: WellState) -> Self {
        self.rng_state = Some(state);
        self
    }

    /// Consumer for objects released through
    /// [`Context::release_output`].
    pub fn with_output(mut self, sink: impl FnMut(Box<dyn Any + Send>) + 'static) -> Self {
        self.output = Some(Box::new(sink));
        self
    }

    pub(crate) fn with_scenario(mut self, scenario: ScenarioId) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn build(self) -> Simulation {
        Simulation {
            plugins: self.plugins,
            seed: self.seed,
            rng_state: self.rng_state,
            output: self.output,
            scenario: self.scenario,
        }
    }
}
