//! Plugin graph resolution
//!
//! Turns the manifests of all enabled plugins into a linear activation order.
//! An edge runs from a consumer to the plugin providing one of its
//! capabilities. Required edges pull providers into the activation set;
//! optional edges only order two plugins that are both already in it, and
//! are dropped when they would close a cycle. Only required edges can make
//! resolution fail with a cycle.
//!
//! The order is a depth-first post-order over the seeds in registration
//! order, so the same registration sequence always yields the same plan.

use std::collections::{HashMap, HashSet};

use hearth_plugin_api::PluginManifest;

use crate::error::ResolveError;

/// A plugin that cannot be activated because a required capability has no
/// usable provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub plugin: String,
    pub capability: String,
}

impl From<Unresolved> for ResolveError {
    fn from(u: Unresolved) -> Self {
        ResolveError::MissingProvider {
            plugin: u.plugin,
            capability: u.capability,
        }
    }
}

/// Result of resolving the plugin graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationPlan {
    /// Plugin ids, every provider before its required consumers
    pub order: Vec<String>,
    /// Plugins left out of `order`, in registration order
    pub unresolved: Vec<Unresolved>,
}

impl ActivationPlan {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.iter().any(|p| p == id)
    }
}

/// Check ids and providers, returning the capability -> provider index map
fn index_providers(manifests: &[PluginManifest]) -> Result<HashMap<&str, usize>, ResolveError> {
    let mut ids = HashSet::new();
    for manifest in manifests {
        if !ids.insert(manifest.id.as_str()) {
            return Err(ResolveError::DuplicatePlugin {
                id: manifest.id.clone(),
            });
        }
    }

    let mut providers: HashMap<&str, usize> = HashMap::new();
    for (index, manifest) in manifests.iter().enumerate() {
        let Some(capability) = manifest.provides.as_deref() else {
            continue;
        };
        if let Some(&first) = providers.get(capability) {
            let all = manifests
                .iter()
                .filter(|m| m.provides.as_deref() == Some(capability))
                .map(|m| m.id.clone())
                .collect();
            tracing::debug!(capability, first = %manifests[first].id, "Duplicate provider");
            return Err(ResolveError::DuplicateCapability {
                capability: capability.to_string(),
                providers: all,
            });
        }
        providers.insert(capability, index);
    }
    Ok(providers)
}

/// Resolve the activation order for `seeds`.
///
/// `manifests` are the enabled plugins in registration order. Seeds are
/// plugin ids; their required providers are pulled in transitively.
pub fn resolve(manifests: &[PluginManifest], seeds: &[&str]) -> Result<ActivationPlan, ResolveError> {
    let providers = index_providers(manifests)?;
    let by_id: HashMap<&str, usize> = manifests
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id.as_str(), i))
        .collect();

    // Closure over required edges
    let mut in_set = vec![false; manifests.len()];
    let mut stack = Vec::new();
    for seed in seeds {
        let index = *by_id.get(seed).ok_or_else(|| ResolveError::UnknownPlugin {
            id: seed.to_string(),
        })?;
        stack.push(index);
    }
    while let Some(index) = stack.pop() {
        if in_set[index] {
            continue;
        }
        in_set[index] = true;
        for capability in &manifests[index].requires {
            if let Some(&provider) = providers.get(capability.as_str()) {
                stack.push(provider);
            }
        }
    }

    // Missing providers, propagated to required consumers until stable
    let mut missing: Vec<Option<String>> = vec![None; manifests.len()];
    loop {
        let mut changed = false;
        for (index, manifest) in manifests.iter().enumerate() {
            if !in_set[index] || missing[index].is_some() {
                continue;
            }
            let broken = manifest.requires.iter().find(|capability| {
                match providers.get(capability.as_str()) {
                    None => true,
                    Some(&provider) => missing[provider].is_some(),
                }
            });
            if let Some(capability) = broken {
                missing[index] = Some(capability.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut edges = required_edges(manifests, &providers, &in_set);
    // Required edges alone must be acyclic; a self-requirement counts
    Sorter::new(manifests, &edges).visit_all(&in_set)?;
    add_optional_edges(manifests, &providers, &in_set, &mut edges);

    let mut sorter = Sorter::new(manifests, &edges);
    sorter.visit_all(&in_set)?;

    let order = sorter
        .order
        .into_iter()
        .filter(|&i| missing[i].is_none())
        .map(|i| manifests[i].id.clone())
        .collect();
    let unresolved = missing
        .into_iter()
        .enumerate()
        .filter_map(|(i, capability)| {
            capability.map(|capability| Unresolved {
                plugin: manifests[i].id.clone(),
                capability,
            })
        })
        .collect();

    Ok(ActivationPlan { order, unresolved })
}

/// Edges from each plugin in the set to the providers of its required
/// capabilities, in declaration order
fn required_edges(
    manifests: &[PluginManifest],
    providers: &HashMap<&str, usize>,
    in_set: &[bool],
) -> Vec<Vec<usize>> {
    manifests
        .iter()
        .enumerate()
        .map(|(index, manifest)| {
            if !in_set[index] {
                return Vec::new();
            }
            manifest
                .requires
                .iter()
                .filter_map(|capability| providers.get(capability.as_str()).copied())
                .filter(|&provider| in_set[provider])
                .collect()
        })
        .collect()
}

/// Append optional edges between plugins of the set, in registration and
/// declaration order. An edge that would close a cycle is dropped.
fn add_optional_edges(
    manifests: &[PluginManifest],
    providers: &HashMap<&str, usize>,
    in_set: &[bool],
    edges: &mut [Vec<usize>],
) {
    for (index, manifest) in manifests.iter().enumerate() {
        if !in_set[index] {
            continue;
        }
        for capability in &manifest.optional {
            let Some(&provider) = providers.get(capability.as_str()) else {
                continue;
            };
            if provider == index || !in_set[provider] {
                continue;
            }
            if reaches(edges, provider, index) {
                tracing::debug!(
                    plugin = %manifest.id,
                    capability = %capability,
                    "Dropping optional edge that would close a cycle"
                );
                continue;
            }
            edges[index].push(provider);
        }
    }
}

/// Whether `to` is reachable from `from`
fn reaches(edges: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; edges.len()];
    let mut stack = vec![from];
    while let Some(index) = stack.pop() {
        if index == to {
            return true;
        }
        if seen[index] {
            continue;
        }
        seen[index] = true;
        stack.extend(edges[index].iter().copied());
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    None,
    Visiting,
    Done,
}

/// Depth-first post-order over `edges`, failing on the first cycle
struct Sorter<'a> {
    manifests: &'a [PluginManifest],
    edges: &'a [Vec<usize>],
    marks: Vec<Mark>,
    path: Vec<usize>,
    order: Vec<usize>,
}

impl<'a> Sorter<'a> {
    fn new(manifests: &'a [PluginManifest], edges: &'a [Vec<usize>]) -> Self {
        Self {
            manifests,
            edges,
            marks: vec![Mark::None; manifests.len()],
            path: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Visit every plugin of the set in registration order
    fn visit_all(&mut self, in_set: &[bool]) -> Result<(), ResolveError> {
        for index in 0..self.manifests.len() {
            if in_set[index] {
                self.visit(index)?;
            }
        }
        Ok(())
    }

    fn visit(&mut self, index: usize) -> Result<(), ResolveError> {
        match self.marks[index] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(self.cycle_through(index)),
            Mark::None => {}
        }
        self.marks[index] = Mark::Visiting;
        self.path.push(index);

        let edges = self.edges;
        for &provider in &edges[index] {
            self.visit(provider)?;
        }

        self.path.pop();
        self.marks[index] = Mark::Done;
        self.order.push(index);
        Ok(())
    }

    fn cycle_through(&self, index: usize) -> ResolveError {
        let start = self.path.iter().position(|&i| i == index).unwrap_or(0);
        let mut cycle: Vec<String> = self.path[start..]
            .iter()
            .map(|&i| self.manifests[i].id.clone())
            .collect();
        cycle.push(self.manifests[index].id.clone());
        ResolveError::CyclicDependency { cycle }
    }
}
