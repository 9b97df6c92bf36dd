use std::sync::Arc;

use crate::context::Context;
use crate::core::error::Result;
use crate::core::types::PluginId;
use crate::plugin::data::PluginData;

/// Initializer run once per scenario, in dependency order
pub type PluginInit = Arc<dyn Fn(&mut Context) -> Result<()> + Send + Sync>;

/// A registered domain module: identity, declared dependencies, immutable
/// data snapshots and an initializer
///
/// Plugins are templates: `Clone` shares the underlying data and
/// initializer, which is how the experiment engine hands the same plugin
/// set to many scenarios.
#[derive(Clone)]
pub struct Plugin {
    id: PluginId,
    dependencies: Vec<PluginId>,
    data: Vec<Arc<dyn PluginData>>,
    init: Option<PluginInit>,
}

impl Plugin {
    pub fn builder(id: PluginId) -> PluginBuilder {
        PluginBuilder {
            id,
            dependencies: Vec::new(),
            data: Vec::new(),
            init: None,
        }
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn dependencies(&self) -> &[PluginId] {
        &self.dependencies
    }

    pub fn data(&self) -> &[Arc<dyn PluginData>] {
        &self.data
    }

    /// Rebuild this template with a different data set (same identity,
    /// dependencies and initializer). Used per scenario by the experiment
    /// engine.
    pub(crate) fn with_data_set(&self, data: Vec<Arc<dyn PluginData>>) -> Plugin {
        Plugin {
            id: self.id,
            dependencies: self.dependencies.clone(),
            data,
            init: self.init.clone(),
        }
    }

    pub(crate) fn initializer(&self) -> Option<PluginInit> {
        self.init.clone()
    }
}

pub struct PluginBuilder {
    id: PluginId,
    dependencies: Vec<PluginId>,
    data: Vec<Arc<dyn PluginData>>,
    init: Option<PluginInit>,
}

impl PluginBuilder {
    /// Declare that `dependency` must initialize before this plugin.
    pub fn depends_on(mut self, dependency: PluginId) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_data(mut self, data: impl PluginData) -> Self {
        self.data.push(Arc::new(data));
        self
    }

    pub fn with_data_arc(mut self, data: Arc<dyn PluginData>) -> Self {
        self.data.push(data);
        self
    }

    pub fn with_initializer(
        mut self,
        init: impl Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.init = Some(Arc::new(init));
        self
    }

    pub fn build(self) -> Plugin {
        Plugin {
            id: self.id,
            dependencies: self.dependencies,
            data: self.data,
            init: self.init,
        }
    }
}
