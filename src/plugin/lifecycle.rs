//! Dependency-ordered plugin initialization

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::error::{PlinthError, Result};
use crate::core::types::PluginId;
use crate::plugin::plugin::Plugin;

/// Topologically sort plugins by their declared dependencies.
///
/// Returns indices into `plugins` in initialization order. Among plugins
/// whose dependencies are all satisfied, registration order wins, so the
/// result is deterministic. Unknown dependencies and cycles are fatal
/// configuration errors, reported before any plan executes.
pub(crate) fn initialization_order(plugins: &[Plugin]) -> Result<Vec<usize>> {
    let mut by_id: AHashMap<PluginId, usize> = AHashMap::with_capacity(plugins.len());
    for (idx, plugin) in plugins.iter().enumerate() {
        by_id.insert(plugin.id(), idx);
    }

    let mut indegree = vec![0usize; plugins.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); plugins.len()];
    for (idx, plugin) in plugins.iter().enumerate() {
        for dep in plugin.dependencies() {
            let dep_idx = *by_id.get(dep).ok_or(PlinthError::UnknownDependency {
                plugin: plugin.id(),
                dependency: *dep,
            })?;
            indegree[idx] += 1;
            dependents[dep_idx].push(idx);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();

    let mut order = Vec::with_capacity(plugins.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < plugins.len() {
        let cycle: Vec<PluginId> = indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(idx, _)| plugins[idx].id())
            .collect();
        return Err(PlinthError::CyclicDependency(cycle));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(id: &'static str, deps: &[&'static str]) -> Plugin {
        let mut builder = Plugin::builder(PluginId(id));
        for dep in deps {
            builder = builder.depends_on(PluginId(dep));
        }
        builder.build()
    }

    #[test]
    fn chain_initializes_in_dependency_order() {
        // registered C, B, A but B depends on A and C depends on B
        let plugins = vec![
            plugin("c", &["b"]),
            plugin("b", &["a"]),
            plugin("a", &[]),
        ];
        let order = initialization_order(&plugins).unwrap();
        let ids: Vec<&str> = order.iter().map(|&i| plugins[i].id().name()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn independent_plugins_keep_registration_order() {
        let plugins = vec![plugin("x", &[]), plugin("y", &[]), plugin("z", &[])];
        let order = initialization_order(&plugins).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn cycle_is_rejected() {
        let plugins = vec![
            plugin("a", &["c"]),
            plugin("b", &["a"]),
            plugin("c", &["b"]),
        ];
        match initialization_order(&plugins) {
            Err(PlinthError::CyclicDependency(members)) => {
                assert_eq!(members.len(), 3, "all three plugins are in the cycle");
            }
            other => panic!("expected cyclic dependency error, got {other:?}"),
        }
    }

    #[test]
    fn partial_cycle_is_rejected() {
        let plugins = vec![
            plugin("free", &[]),
            plugin("a", &["b"]),
            plugin("b", &["a"]),
        ];
        assert!(matches!(
            initialization_order(&plugins),
            Err(PlinthError::CyclicDependency(_))
        ));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let plugins = vec![plugin("a", &["ghost"])];
        assert!(matches!(
            initialization_order(&plugins),
            Err(PlinthError::UnknownDependency { .. })
        ));
    }
}
