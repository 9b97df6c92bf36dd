//! The per-scenario kernel context
//!
//! One `Context` exists per scenario and owns everything that scenario
//! mutates: the simulation clock, the plan queue, event subscribers,
//! data managers, the random stream and the output sink. Within a
//! scenario execution is strictly single-threaded and cooperative; a
//! plan callback runs to completion (including any synchronous event
//! cascade) before the next plan is popped.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;

use crate::core::error::{PlinthError, Result};
use crate::core::types::{ScenarioId, Time};
use crate::event::bus::{EventBus, HandlerFn, Subscription};
use crate::event::filter::EventFilter;
use crate::plan::queue::PlanQueue;
use crate::plan::{PlanId, PlanKey};
use crate::plugin::data::PluginData;
use crate::random::{WellRng, WellState};

/// Marker for the exclusive owner of one plugin's runtime state
///
/// A data manager is registered during its plugin's initializer and
/// looked up by type. State changes happen only in response to events
/// or plans; other managers may read it but never replace it.
pub trait DataManager: Any {}

pub(crate) type OutputSink = Box<dyn FnMut(Box<dyn Any + Send>)>;
type CloseHandler = Box<dyn FnOnce(&mut Context) -> Result<()>>;
type DispatchJob = Box<dyn FnOnce(&mut Context)>;

pub struct Context {
    time: Time,
    halted: bool,
    plans: PlanQueue,
    bus: EventBus,
    dispatch_queue: VecDeque<DispatchJob>,
    dispatching: bool,
    data_managers: AHashMap<TypeId, Rc<dyn Any>>,
    plugin_data: AHashMap<TypeId, Arc<dyn PluginData>>,
    close_handlers: Vec<CloseHandler>,
    output: Option<OutputSink>,
    rng: WellRng,
    scenario: Option<ScenarioId>,
}

impl Context {
    pub(crate) fn new(
        rng: WellRng,
        scenario: Option<ScenarioId>,
        output: Option<OutputSink>,
    ) -> Self {
        Self {
            time: 0.0,
            halted: false,
            plans: PlanQueue::new(),
            bus: EventBus::new(),
            dispatch_queue: VecDeque::new(),
            dispatching: false,
            data_managers: AHashMap::new(),
            plugin_data: AHashMap::new(),
            close_handlers: Vec::new(),
            output,
            rng,
            scenario,
        }
    }

    /// Current simulation clock.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Scenario id when running under the experiment engine.
    pub fn scenario(&self) -> Option<ScenarioId> {
        self.scenario
    }

    // --- plans ---------------------------------------------------------

    /// Schedule `callback` at simulation time `time`.
    ///
    /// Time cannot move backward: `time < self.time()` is rejected.
    pub fn add_plan(
        &mut self,
        time: Time,
        callback: impl FnOnce(&mut Context) -> Result<()> + 'static,
    ) -> Result<PlanId> {
        self.plans.add(time, self.time, None, Box::new(callback))
    }

    /// Schedule a keyed plan. The key supports cancellation and stands
    /// for the callback in checkpoint snapshots (callbacks themselves
    /// are never persisted).
    pub fn add_keyed_plan(
        &mut self,
        time: Time,
        key: impl Into<PlanKey>,
        callback: impl FnOnce(&mut Context) -> Result<()> + 'static,
    ) -> Result<PlanId> {
        self.plans
            .add(time, self.time, Some(key.into()), Box::new(callback))
    }

    /// Cancel the pending plan scheduled under `key`.
    pub fn cancel_plan(&mut self, key: &PlanKey) -> Result<()> {
        self.plans.cancel_by_key(key)
    }

    /// Stop processing further plans in this scenario. The queue is
    /// drained without firing; close handlers still run.
    pub fn halt(&mut self) {
        if !self.halted {
            tracing::debug!("halt requested at t={}", self.time);
        }
        self.halted = true;
    }

    /// Number of plans still scheduled.
    pub fn remaining_plans(&self) -> usize {
        self.plans.len()
    }

    // --- events --------------------------------------------------------

    /// Subscribe to every event of type `E`.
    pub fn subscribe<E: 'static>(&mut self, handler: impl Fn(&mut Context, &E) + 'static) {
        self.bus.subscribe(Subscription::new(handler));
    }

    /// Subscribe to events of type `E` whose derived label matches
    /// `filter`.
    pub fn subscribe_filtered<E: 'static>(
        &mut self,
        filter: EventFilter<E>,
        handler: impl Fn(&mut Context, &E) + 'static,
    ) {
        self.bus
            .subscribe(Subscription::new(handler).with_filter(filter));
    }

    /// Subscribe with the full subscription form (filter and/or
    /// validation-phase check).
    pub fn subscribe_with<E: 'static>(&mut self, subscription: Subscription<E>) {
        self.bus.subscribe(subscription);
    }

    /// Publish an event through two ordered phases.
    ///
    /// Validation: every interested subscriber's validator runs against
    /// the immutable context; the first error aborts the publish and no
    /// subscriber executes. Execution: the same subscriber set observes
    /// the event and may publish further events, which are queued and
    /// drained to completion before the outermost publish returns; the
    /// original event's validation phase is never re-run.
    pub fn publish<E: 'static>(&mut self, event: E) -> Result<()> {
        let subs = self.bus.interested(&event);
        for sub in &subs {
            if let Some(validator) = &sub.validator {
                validator(&*self, &event)?;
            }
        }

        let handlers: Vec<Rc<HandlerFn<E>>> = subs.into_iter().map(|s| s.handler).collect();
        if !handlers.is_empty() {
            self.dispatch_queue.push_back(Box::new(move |ctx| {
                for handler in &handlers {
                    handler(ctx, &event);
                }
            }));
        }

        if !self.dispatching {
            self.dispatching = true;
            while let Some(job) = self.dispatch_queue.pop_front() {
                job(self);
            }
            self.dispatching = false;
        }
        Ok(())
    }

    // --- data managers and plugin data ---------------------------------

    /// Register `manager` as the data manager of its type.
    pub fn add_data_manager<T: DataManager>(&mut self, manager: T) -> Result<()> {
        let key = TypeId::of::<T>();
        if self.data_managers.contains_key(&key) {
            return Err(PlinthError::DuplicateDataManager(type_name::<T>()));
        }
        self.data_managers
            .insert(key, Rc::new(RefCell::new(manager)));
        Ok(())
    }

    /// Look up an initialized data manager.
    ///
    /// During plugin initialization only managers of already-initialized
    /// dependencies are present; anything else fails here.
    pub fn get_data_manager<T: DataManager>(&self) -> Result<Rc<RefCell<T>>> {
        let entry = self
            .data_managers
            .get(&TypeId::of::<T>())
            .ok_or(PlinthError::UnknownDataManager(type_name::<T>()))?;
        Rc::clone(entry)
            .downcast::<RefCell<T>>()
            .map_err(|_| PlinthError::UnknownDataManager(type_name::<T>()))
    }

    pub(crate) fn add_plugin_data(&mut self, data: Arc<dyn PluginData>) -> Result<()> {
        let key = data.as_any().type_id();
        if self.plugin_data.contains_key(&key) {
            return Err(PlinthError::DuplicatePluginData(data.type_label()));
        }
        self.plugin_data.insert(key, data);
        Ok(())
    }

    /// The immutable data snapshot of type `T` supplied by a registered
    /// plugin.
    pub fn plugin_data<T: PluginData>(&self) -> Result<&T> {
        self.plugin_data
            .get(&TypeId::of::<T>())
            .and_then(|data| data.as_any().downcast_ref::<T>())
            .ok_or(PlinthError::UnknownPluginData(type_name::<T>()))
    }

    // --- output and lifecycle ------------------------------------------

    /// Release `item` to the output stream. Under the experiment engine
    /// the item is tagged with this scenario's id.
    pub fn release_output<T: Any + Send>(&mut self, item: T) {
        if let Some(sink) = &mut self.output {
            sink(Box::new(item));
        }
    }

    /// Run `handler` when the simulation closes (queue drained or
    /// halted).
    pub fn on_simulation_close(
        &mut self,
        handler: impl FnOnce(&mut Context) -> Result<()> + 'static,
    ) {
        self.close_handlers.push(Box::new(handler));
    }

    // --- random stream -------------------------------------------------

    /// The scenario's random stream.
    pub fn rng(&mut self) -> &mut WellRng {
        &mut self.rng
    }

    /// Exact snapshot of the random stream, e.g. at checkpoint time.
    pub fn rng_snapshot(&self) -> WellState {
        self.rng.snapshot()
    }

    // --- driver hooks --------------------------------------------------

    pub(crate) fn is_halted(&self) -> bool {
        self.halted
    }

    /// Pop and fire the earliest plan. Returns false when the queue is
    /// empty.
    pub(crate) fn fire_next_plan(&mut self) -> Result<bool> {
        match self.plans.pop() {
            Some(plan) => {
                self.time = plan.time;
                (plan.callback)(self)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn drain_plans(&mut self) {
        self.plans.clear();
    }

    pub(crate) fn take_close_handlers(&mut self) -> Vec<CloseHandler> {
        std::mem::take(&mut self.close_handlers)
    }
}
