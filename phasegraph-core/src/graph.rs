//! Single-tier state graph.
//!
//! A graph owns its nodes and edges and tracks at most one current node.
//! Outgoing edges are kept per source node in insertion order, and that
//! order is the transition priority: the first edge whose guard holds wins.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use crate::edge::{Edge, GuardedTransition};
use crate::error::CoreError;
use crate::node::{IdentifiedState, Node};

/// A graph of states connected by guarded, side-effecting edges.
#[derive(Debug, Clone)]
pub struct Graph<N = Node, E = Edge> {
    nodes: Vec<N>,
    edges: Vec<E>,
    node_index: HashMap<String, usize>,
    /// Outgoing edge indices per node, in insertion order.
    adjacency: Vec<Vec<usize>>,
    current: Option<usize>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            node_index: HashMap::new(),
            adjacency: Vec::new(),
            current: None,
        }
    }
}

impl<N, E> Graph<N, E>
where
    N: IdentifiedState,
    E: GuardedTransition<N>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all nodes and edges and unsets the current node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.node_index.clear();
        self.adjacency.clear();
        self.current = None;
    }

    /// Adds a node. Node ids must be unique.
    pub fn add_node(&mut self, node: N) -> Result<(), CoreError> {
        if self.node_index.contains_key(node.id()) {
            return Err(CoreError::DuplicateNode {
                id: node.id().to_string(),
            });
        }

        self.node_index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        Ok(())
    }

    /// Adds an edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: E) -> Result<(), CoreError> {
        let from = self.index_of(edge.from_id())?;
        self.index_of(edge.to_id())?;

        self.adjacency[from].push(self.edges.len());
        self.edges.push(edge);
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize, CoreError> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| CoreError::UnknownNode { id: id.to_string() })
    }

    /// Makes `id` the current node. Returns false if no such node exists.
    pub fn set_initial_state(&mut self, id: &str) -> bool {
        match self.node_index.get(id) {
            Some(&idx) => {
                self.current = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn has_current_state(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_state_id(&self) -> Option<&str> {
        self.current.map(|idx| self.nodes[idx].id())
    }

    pub fn current_node(&self) -> Option<&N> {
        self.current.map(|idx| &self.nodes[idx])
    }

    /// Mutable access to the current node, for hosts that write variables
    /// between steps.
    pub fn current_node_mut(&mut self) -> Option<&mut N> {
        self.current.map(|idx| &mut self.nodes[idx])
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        self.node_index.get(id).map(|&idx| &mut self.nodes[idx])
    }

    /// Returns nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.iter()
    }

    /// Returns edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &E> {
        self.edges.iter()
    }

    /// Returns the outgoing edges of `id` in priority order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &E> {
        let indices: &[usize] = match self.node_index.get(id) {
            Some(&idx) => &self.adjacency[idx],
            None => &[],
        };
        indices.iter().map(|&e| &self.edges[e])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Takes at most one transition from the current node.
    ///
    /// Outgoing edges are tried in insertion order; the first whose guard
    /// holds fires: the destination becomes current and the edge's actions
    /// are applied to it. Returns the destination id, or `None` when no
    /// current node is set or no guard holds. A guard evaluation error
    /// aborts the step without changing any state.
    pub fn step(&mut self) -> Result<Option<&str>, CoreError> {
        let Some(from) = self.current else {
            return Ok(None);
        };

        let mut fired = None;
        for &edge_idx in &self.adjacency[from] {
            let edge = &self.edges[edge_idx];
            if edge.evaluate(&self.nodes[from])? {
                fired = Some(edge_idx);
                break;
            }
            tracing::trace!(
                "guard not satisfied: {} -> {}",
                edge.from_id(),
                edge.to_id()
            );
        }

        let Some(edge_idx) = fired else {
            return Ok(None);
        };

        let edge = &self.edges[edge_idx];
        let to = self.node_index[edge.to_id()];
        tracing::debug!("edge fired: {} -> {}", edge.from_id(), edge.to_id());

        self.current = Some(to);
        edge.apply(&mut self.nodes[to]);
        Ok(Some(self.nodes[to].id()))
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "N: DeserializeOwned, E: DeserializeOwned"))]
struct GraphDocument<N, E> {
    nodes: Vec<N>,
    edges: Vec<E>,
}

impl<N, E> Graph<N, E>
where
    N: IdentifiedState + DeserializeOwned,
    E: GuardedTransition<N> + DeserializeOwned,
{
    /// Loads a single-tier graph document:
    ///
    /// ```json
    /// {
    ///   "nodes": [{"id": "idle", "vars": {"ticks": 0}}, {"id": "busy"}],
    ///   "edges": [{"from": "idle", "to": "busy", "condition": "ticks >= 3"}]
    /// }
    /// ```
    ///
    /// Existing content is discarded first. On success the first declared
    /// node becomes current; on failure the graph is left empty.
    pub fn load(&mut self, doc: &serde_json::Value) -> Result<(), CoreError> {
        self.clear();
        let result = self.load_document(doc);
        match &result {
            Ok(()) => tracing::info!(
                "loaded graph: {} nodes, {} edges",
                self.nodes.len(),
                self.edges.len()
            ),
            Err(e) => {
                tracing::warn!("failed to load graph: {}", e);
                self.clear();
            }
        }
        result
    }

    /// Parses `text` as JSON and loads it.
    pub fn load_str(&mut self, text: &str) -> Result<(), CoreError> {
        let doc: serde_json::Value = match serde_json::from_str(text) {
            Ok(doc) => doc,
            Err(e) => {
                self.clear();
                return Err(e.into());
            }
        };
        self.load(&doc)
    }

    fn load_document(&mut self, doc: &serde_json::Value) -> Result<(), CoreError> {
        let doc = GraphDocument::<N, E>::deserialize(doc).map_err(CoreError::from_document)?;

        for node in doc.nodes {
            self.add_node(node)?;
        }
        for edge in doc.edges {
            self.add_edge(edge)?;
        }
        if !self.nodes.is_empty() {
            self.current = Some(0);
        }
        Ok(())
    }

    /// Builds a graph from a single-tier document.
    pub fn from_json(doc: &serde_json::Value) -> Result<Self, CoreError> {
        let mut graph = Self::default();
        graph.load(doc)?;
        Ok(graph)
    }
}
