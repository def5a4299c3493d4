//! ResolvedSet - the transient result of one resolution.
//!
//! Entries are kept in discovery order, and the dependency edges between them
//! in a graph whose node indices follow the same order. A ResolvedSet is
//! built fresh per request and never cached.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use crate::core::{EntryId, Namespace, RegistryEntry};

/// One fetched entry together with its code text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub entry: RegistryEntry,
    pub source_text: String,
}

impl ResolvedEntry {
    pub fn id(&self) -> &EntryId {
        &self.entry.id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.entry.namespace
    }
}

/// The seeds plus everything reachable from them.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    /// Dependency graph; node `i` is the `i`-th discovered entry
    graph: DiGraph<EntryId, ()>,

    /// Map from identifier to node index
    nodes: HashMap<EntryId, NodeIndex>,

    /// Fetched entries
    entries: HashMap<EntryId, ResolvedEntry>,

    /// Deduplicated seeds in request order
    seeds: Vec<EntryId>,
}

impl ResolvedSet {
    pub(crate) fn new(seeds: Vec<EntryId>) -> Self {
        ResolvedSet {
            seeds,
            ..Default::default()
        }
    }

    /// Record a fetched entry. Adding the same identifier twice is a no-op.
    pub(crate) fn insert(&mut self, resolved: ResolvedEntry) {
        let id = resolved.id().clone();
        if self.nodes.contains_key(&id) {
            return;
        }

        let node = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), node);
        self.entries.insert(id, resolved);
    }

    /// Add a dependency edge between two recorded entries.
    pub(crate) fn add_edge(&mut self, from: &EntryId, to: &EntryId) {
        if let (Some(&from_node), Some(&to_node)) = (self.nodes.get(from), self.nodes.get(to)) {
            if !self.graph.contains_edge(from_node, to_node) {
                self.graph.add_edge(from_node, to_node, ());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &EntryId) -> Option<&ResolvedEntry> {
        self.entries.get(id)
    }

    /// Iterate in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntry> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |node| self.entries.get(&self.graph[node]))
    }

    /// Identifiers in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &EntryId> + '_ {
        self.graph.node_indices().map(move |node| &self.graph[node])
    }

    pub fn seeds(&self) -> &[EntryId] {
        &self.seeds
    }

    /// The first seed, whose metadata drives the served manifest.
    pub fn root(&self) -> Option<&ResolvedEntry> {
        self.seeds.first().and_then(|id| self.entries.get(id))
    }

    /// Direct dependencies of an entry, in discovery order.
    pub fn dependencies_of(&self, id: &EntryId) -> Vec<&EntryId> {
        let Some(&node) = self.nodes.get(id) else {
            return Vec::new();
        };

        let mut deps: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        deps.sort();
        deps.into_iter().map(|n| &self.graph[n]).collect()
    }

    /// Entries ordered so that every dependency precedes its dependents.
    ///
    /// Within a cycle the order follows discovery.
    pub fn install_order(&self) -> Vec<&EntryId> {
        let mut order = Vec::with_capacity(self.len());
        let Some(&first) = self.seeds.first().and_then(|id| self.nodes.get(id)) else {
            return order;
        };

        let mut dfs = DfsPostOrder::new(&self.graph, first);
        for seed in &self.seeds {
            if let Some(&node) = self.nodes.get(seed) {
                dfs.move_to(node);
                while let Some(next) = dfs.next(&self.graph) {
                    order.push(&self.graph[next]);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceUnitRef;

    fn resolved(id: &str) -> ResolvedEntry {
        ResolvedEntry {
            entry: RegistryEntry::new(
                EntryId::parse(id).unwrap(),
                id,
                Namespace::ui(),
                SourceUnitRef::for_text(id),
                SourceUnitRef::for_text("demo"),
            ),
            source_text: format!("// {}", id),
        }
    }

    fn id(s: &str) -> EntryId {
        EntryId::parse(s).unwrap()
    }

    #[test]
    fn test_discovery_order_and_dedup() {
        let mut set = ResolvedSet::new(vec![id("a/root")]);
        set.insert(resolved("a/root"));
        set.insert(resolved("a/zeta"));
        set.insert(resolved("a/alpha"));
        set.insert(resolved("a/zeta"));

        let ids: Vec<String> = set.ids().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["a/root", "a/zeta", "a/alpha"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.root().unwrap().id(), &id("a/root"));
    }

    #[test]
    fn test_install_order_puts_dependencies_first() {
        let mut set = ResolvedSet::new(vec![id("a/button")]);
        for entry in ["a/button", "a/icon", "a/svg"] {
            set.insert(resolved(entry));
        }
        set.add_edge(&id("a/button"), &id("a/icon"));
        set.add_edge(&id("a/icon"), &id("a/svg"));
        set.add_edge(&id("a/button"), &id("a/svg"));

        let order: Vec<String> = set.install_order().iter().map(|i| i.to_string()).collect();
        assert_eq!(order, vec!["a/svg", "a/icon", "a/button"]);

        let deps: Vec<String> = set
            .dependencies_of(&id("a/button"))
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(deps, vec!["a/icon", "a/svg"]);
    }

    #[test]
    fn test_cycle_install_order_terminates() {
        let mut set = ResolvedSet::new(vec![id("a/a")]);
        set.insert(resolved("a/a"));
        set.insert(resolved("a/b"));
        set.add_edge(&id("a/a"), &id("a/b"));
        set.add_edge(&id("a/b"), &id("a/a"));

        assert_eq!(set.install_order().len(), 2);
    }
}
