//! Run continuity: checkpoint and resume of an in-flight timeline
//!
//! A continuity snapshot is an ordered list of `(time, consumer)` pairs
//! plus a completion counter and a scheduled flag. Consumers are plain
//! handlers re-attached by the host on each run; they are identified by
//! their list index through keyed plans and are never serialized.
//!
//! The completion counter is the only dedup mechanism: when plans are
//! scheduled, consumers with index below the counter are skipped, so a
//! resumed run never re-fires completed work. The snapshot emitted at
//! simulation close carries `plans_scheduled = true`; resuming goes
//! through [`RunContinuityData::clone_builder`], which resets the flag
//! while keeping consumers and counter.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::{Context, DataManager};
use crate::core::error::Result;
use crate::core::types::{PluginId, Time};
use crate::plan::PlanKey;
use crate::plugin::data::{PluginData, PluginDataBuilder};
use crate::plugin::plugin::Plugin;

pub const RUN_CONTINUITY_PLUGIN_ID: PluginId = PluginId::new("run_continuity");

/// Handler re-invoked by index when its scheduled time is reached
pub type ContinuityConsumer = Arc<dyn Fn(&mut Context) -> Result<()> + Send + Sync>;

/// Plan key standing for the consumer at `index`
pub fn continuity_plan_key(index: usize) -> PlanKey {
    PlanKey(format!("run-continuity:{index}"))
}

/// Immutable continuity snapshot
pub struct RunContinuityData {
    consumers: Vec<(Time, ContinuityConsumer)>,
    completion_count: usize,
    plans_scheduled: bool,
}

impl RunContinuityData {
    pub fn builder() -> RunContinuityDataBuilder {
        RunContinuityDataBuilder {
            draft: RunContinuityData {
                consumers: Vec::new(),
                completion_count: 0,
                plans_scheduled: false,
            },
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn completion_count(&self) -> usize {
        self.completion_count
    }

    pub fn plans_scheduled(&self) -> bool {
        self.plans_scheduled
    }

    /// Termination check for driving programs. Zero consumers trivially
    /// report complete.
    pub fn all_plans_complete(&self) -> bool {
        self.completion_count >= self.consumers.len()
    }
}

impl Clone for RunContinuityData {
    fn clone(&self) -> Self {
        Self {
            consumers: self.consumers.clone(),
            completion_count: self.completion_count,
            plans_scheduled: self.plans_scheduled,
        }
    }
}

impl PartialEq for RunContinuityData {
    fn eq(&self, other: &Self) -> bool {
        self.completion_count == other.completion_count
            && self.plans_scheduled == other.plans_scheduled
            && self.consumers.len() == other.consumers.len()
            && self
                .consumers
                .iter()
                .zip(&other.consumers)
                .all(|((ta, ca), (tb, cb))| ta == tb && Arc::ptr_eq(ca, cb))
    }
}

impl fmt::Debug for RunContinuityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContinuityData")
            .field("consumer_times", &self.consumers.iter().map(|(t, _)| t).collect::<Vec<_>>())
            .field("completion_count", &self.completion_count)
            .field("plans_scheduled", &self.plans_scheduled)
            .finish()
    }
}

impl PluginData for RunContinuityData {
    fn clone_builder(&self) -> Box<dyn PluginDataBuilder> {
        let mut draft = self.clone();
        // a fresh builder always yields a schedulable snapshot; the
        // counter keeps already-fired consumers from re-running
        draft.plans_scheduled = false;
        Box::new(RunContinuityDataBuilder { draft })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Draft for a continuity snapshot
pub struct RunContinuityDataBuilder {
    draft: RunContinuityData,
}

impl RunContinuityDataBuilder {
    /// Append a consumer scheduled at `time`. List order defines the
    /// consumer's key index; re-attach consumers in the same order when
    /// resuming.
    pub fn add_consumer(
        &mut self,
        time: Time,
        consumer: impl Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.draft.consumers.push((time, Arc::new(consumer)));
        self
    }

    /// Restore the completion counter from a persisted checkpoint.
    pub fn with_completion_count(&mut self, count: usize) -> &mut Self {
        self.draft.completion_count = count;
        self
    }

    pub fn build_data(&mut self) -> RunContinuityData {
        self.draft.clone()
    }
}

impl PluginDataBuilder for RunContinuityDataBuilder {
    fn build(&mut self) -> Arc<dyn PluginData> {
        Arc::new(self.draft.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owner of continuity progress during a run
pub struct RunContinuityManager {
    consumers: Vec<(Time, ContinuityConsumer)>,
    completion_count: usize,
}

impl DataManager for RunContinuityManager {}

impl RunContinuityManager {
    pub fn completion_count(&self) -> usize {
        self.completion_count
    }

    pub fn all_plans_complete(&self) -> bool {
        self.completion_count >= self.consumers.len()
    }

    /// Snapshot for persistence: all original consumers unchanged, the
    /// current counter, and the scheduled flag raised so the emitted
    /// value cannot schedule duplicates if replayed verbatim.
    pub fn record_state(&self) -> RunContinuityData {
        RunContinuityData {
            consumers: self.consumers.clone(),
            completion_count: self.completion_count,
            plans_scheduled: true,
        }
    }
}

/// Build the continuity plugin around a snapshot.
///
/// On initialization the consumer list is turned into keyed plans
/// (skipping indices below the completion counter); each firing
/// increments the counter. At simulation close a fresh snapshot is
/// released to the output stream.
pub fn run_continuity_plugin(data: RunContinuityData) -> Plugin {
    Plugin::builder(RUN_CONTINUITY_PLUGIN_ID)
        .with_data(data)
        .with_initializer(|ctx| {
            let (consumers, completion_count, scheduled) = {
                let data = ctx.plugin_data::<RunContinuityData>()?;
                (
                    data.consumers.clone(),
                    data.completion_count,
                    data.plans_scheduled,
                )
            };
            ctx.add_data_manager(RunContinuityManager {
                consumers: consumers.clone(),
                completion_count,
            })?;

            if !scheduled {
                for (index, (time, consumer)) in consumers.into_iter().enumerate() {
                    if index < completion_count {
                        // fired during a previous run
                        continue;
                    }
                    ctx.add_keyed_plan(time, continuity_plan_key(index), move |ctx| {
                        consumer(ctx)?;
                        let manager = ctx.get_data_manager::<RunContinuityManager>()?;
                        manager.borrow_mut().completion_count += 1;
                        Ok(())
                    })?;
                }
            } else {
                tracing::debug!(
                    "continuity plans already scheduled; relying on host-attached consumers"
                );
            }

            ctx.on_simulation_close(|ctx| {
                let manager = ctx.get_data_manager::<RunContinuityManager>()?;
                let snapshot = manager.borrow().record_state();
                ctx.release_output(snapshot);
                Ok(())
            });
            Ok(())
        })
        .build()
}
