//! Dependency graph of assets

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, VecDeque};

use super::asset::{AssetKey, AssetSpec};
use crate::error::{ErrorCode, PipelineError, Result};

/// Edges run from a dependency to the asset that depends on it.
#[derive(Debug, Clone)]
pub struct AssetGraph {
    graph: DiGraph<AssetKey, ()>,
    index: HashMap<AssetKey, NodeIndex>,
}

impl AssetGraph {
    pub fn new<'a>(specs: impl IntoIterator<Item = &'a AssetSpec>) -> Result<Self> {
        let mut specs: Vec<&AssetSpec> = specs.into_iter().collect();
        specs.sort_by(|a, b| a.key.cmp(&b.key));

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for spec in &specs {
            if index.contains_key(&spec.key) {
                return Err(PipelineError::orchestration_with_code(
                    ErrorCode::ORCH_DUPLICATE_DEFINITION,
                    format!("asset '{}' is defined twice", spec.key),
                ));
            }
            let idx = graph.add_node(spec.key.clone());
            index.insert(spec.key.clone(), idx);
        }

        for spec in &specs {
            let to = index[&spec.key];
            for dep in &spec.deps {
                let from = index.get(dep).copied().ok_or_else(|| {
                    PipelineError::orchestration_with_code(
                        ErrorCode::ORCH_UNKNOWN_DEPENDENCY,
                        format!("asset '{}' depends on unknown asset '{}'", spec.key, dep),
                    )
                })?;
                graph.add_edge(from, to, ());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_CIRCULAR_DEPENDENCY,
                format!("assets form a cycle through '{}'", graph[cycle.node_id()]),
            )
        })?;

        Ok(Self { graph, index })
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The selected keys, every dependency before its dependents
    pub fn topological_order(&self, selection: &BTreeSet<AssetKey>) -> Result<Vec<AssetKey>> {
        if let Some(unknown) = selection.iter().find(|key| !self.contains(key)) {
            return Err(PipelineError::orchestration_with_code(
                ErrorCode::ORCH_ASSET_NOT_FOUND,
                format!("asset '{}' is not defined", unknown),
            ));
        }

        let order = toposort(&self.graph, None).map_err(|cycle| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_CIRCULAR_DEPENDENCY,
                format!("assets form a cycle through '{}'", self.graph[cycle.node_id()]),
            )
        })?;

        Ok(order
            .into_iter()
            .map(|idx| &self.graph[idx])
            .filter(|key| selection.contains(*key))
            .cloned()
            .collect())
    }

    /// Every asset that transitively depends on `key`
    pub fn downstream(&self, key: &AssetKey) -> BTreeSet<AssetKey> {
        self.walk(key, Direction::Outgoing)
    }

    /// Every asset `key` transitively depends on
    pub fn upstream(&self, key: &AssetKey) -> BTreeSet<AssetKey> {
        self.walk(key, Direction::Incoming)
    }

    /// Direct dependencies of `key`
    pub fn parents(&self, key: &AssetKey) -> BTreeSet<AssetKey> {
        match self.index.get(key) {
            Some(idx) => self
                .graph
                .neighbors_directed(*idx, Direction::Incoming)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    fn walk(&self, key: &AssetKey, direction: Direction) -> BTreeSet<AssetKey> {
        let mut found = BTreeSet::new();
        let Some(start) = self.index.get(key) else {
            return found;
        };

        let mut queue = VecDeque::from([*start]);
        while let Some(idx) = queue.pop_front() {
            for next in self.graph.neighbors_directed(idx, direction) {
                if found.insert(self.graph[next].clone()) {
                    queue.push_back(next);
                }
            }
        }
        found
    }
}
