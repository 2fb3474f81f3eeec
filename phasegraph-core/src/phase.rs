//! Two-tier phase graph.
//!
//! Each phase owns an independent [`Graph`]. A compound step first steps the
//! current phase's graph, then scans the phase's outgoing phase edges against
//! the (possibly just-updated) current node. At most one phase transition
//! happens per step.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::edge::{Edge, GuardedTransition, PhaseEdge};
use crate::error::CoreError;
use crate::graph::Graph;
use crate::node::{IdentifiedState, Node};

/// A named graph with an optional entry node.
#[derive(Debug, Clone)]
pub struct Phase<N = Node, E = Edge> {
    id: String,
    graph: Graph<N, E>,
    initial_state: Option<String>,
}

impl<N, E> Phase<N, E>
where
    N: IdentifiedState,
    E: GuardedTransition<N>,
{
    pub fn new(id: impl Into<String>, graph: Graph<N, E>) -> Self {
        Self {
            id: id.into(),
            graph,
            initial_state: None,
        }
    }

    /// Sets the node the graph is seeded with when the phase is entered
    /// without a current node.
    pub fn with_initial_state(mut self, id: impl Into<String>) -> Self {
        self.initial_state = Some(id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn graph(&self) -> &Graph<N, E> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph<N, E> {
        &mut self.graph
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.initial_state.as_deref()
    }

    /// Seeds the graph from `initial_state` unless it already has a current
    /// node. Returns true if a seed happened.
    fn seed(&mut self) -> bool {
        if self.graph.has_current_state() {
            return false;
        }
        match &self.initial_state {
            Some(initial) => self.graph.set_initial_state(initial),
            None => false,
        }
    }
}

/// Outcome of a compound step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub phase_changed: bool,
    pub state_changed: bool,
    pub phase_id: String,
    pub state_id: Option<String>,
}

/// A graph of phases connected by guarded phase edges.
#[derive(Debug, Clone)]
pub struct PhaseGraph<N = Node, E = Edge, P = PhaseEdge> {
    phases: Vec<Phase<N, E>>,
    phase_edges: Vec<P>,
    phase_index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
    current: Option<usize>,
}

impl<N, E, P> Default for PhaseGraph<N, E, P> {
    fn default() -> Self {
        Self {
            phases: Vec::new(),
            phase_edges: Vec::new(),
            phase_index: HashMap::new(),
            adjacency: Vec::new(),
            current: None,
        }
    }
}

impl<N, E, P> PhaseGraph<N, E, P>
where
    N: IdentifiedState,
    E: GuardedTransition<N>,
    P: GuardedTransition<N>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all phases and phase edges and unsets the current phase.
    pub fn clear(&mut self) {
        self.phases.clear();
        self.phase_edges.clear();
        self.phase_index.clear();
        self.adjacency.clear();
        self.current = None;
    }

    /// Adds a phase. Phase ids must be unique, and an `initial_state` must
    /// name a node of the phase's graph.
    pub fn add_phase(&mut self, phase: Phase<N, E>) -> Result<(), CoreError> {
        if self.phase_index.contains_key(&phase.id) {
            return Err(CoreError::DuplicatePhase { id: phase.id });
        }
        if let Some(initial) = &phase.initial_state {
            if phase.graph.node(initial).is_none() {
                return Err(CoreError::UnknownNode {
                    id: initial.clone(),
                });
            }
        }

        self.phase_index.insert(phase.id.clone(), self.phases.len());
        self.phases.push(phase);
        self.adjacency.push(Vec::new());
        Ok(())
    }

    /// Adds a phase edge. Both endpoint phases must already exist.
    pub fn add_phase_edge(&mut self, edge: P) -> Result<(), CoreError> {
        let from = self.index_of(edge.from_id())?;
        self.index_of(edge.to_id())?;

        self.adjacency[from].push(self.phase_edges.len());
        self.phase_edges.push(edge);
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize, CoreError> {
        self.phase_index
            .get(id)
            .copied()
            .ok_or_else(|| CoreError::UnknownPhase { id: id.to_string() })
    }

    fn enter(&mut self, idx: usize) {
        self.current = Some(idx);
        let phase = &mut self.phases[idx];
        if phase.seed() {
            tracing::debug!(
                "seeded phase {} at {}",
                phase.id,
                phase.graph.current_state_id().unwrap_or_default()
            );
        }
    }

    /// Makes `id` the current phase, seeding its graph from the phase's
    /// initial state if the graph has no current node. Returns false if no
    /// such phase exists.
    pub fn set_initial_phase(&mut self, id: &str) -> bool {
        match self.phase_index.get(id) {
            Some(&idx) => {
                self.enter(idx);
                true
            }
            None => false,
        }
    }

    pub fn current_phase_id(&self) -> Option<&str> {
        self.current_phase().map(Phase::id)
    }

    pub fn current_state_id(&self) -> Option<&str> {
        self.current_phase()
            .and_then(|phase| phase.graph.current_state_id())
    }

    pub fn current_node(&self) -> Option<&N> {
        self.current_phase().and_then(|phase| phase.graph.current_node())
    }

    pub fn current_node_mut(&mut self) -> Option<&mut N> {
        self.current_phase_mut()
            .and_then(|phase| phase.graph.current_node_mut())
    }

    pub fn current_phase(&self) -> Option<&Phase<N, E>> {
        self.current.map(|idx| &self.phases[idx])
    }

    pub fn current_phase_mut(&mut self) -> Option<&mut Phase<N, E>> {
        self.current.map(|idx| &mut self.phases[idx])
    }

    pub fn phase(&self, id: &str) -> Option<&Phase<N, E>> {
        self.phase_index.get(id).map(|&idx| &self.phases[idx])
    }

    pub fn phase_mut(&mut self, id: &str) -> Option<&mut Phase<N, E>> {
        self.phase_index.get(id).map(|&idx| &mut self.phases[idx])
    }

    /// Returns phases in declaration order.
    pub fn phases(&self) -> impl Iterator<Item = &Phase<N, E>> {
        self.phases.iter()
    }

    /// Returns the outgoing phase edges of `id` in priority order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &P> {
        let indices: &[usize] = match self.phase_index.get(id) {
            Some(&idx) => &self.adjacency[idx],
            None => &[],
        };
        indices.iter().map(|&e| &self.phase_edges[e])
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn phase_edge_count(&self) -> usize {
        self.phase_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Performs one compound step.
    ///
    /// Returns `None` when there is no current phase. Otherwise a
    /// [`StepResult`] is always returned, even if nothing moved. An
    /// evaluation error in the phase scan is reported after the inner step
    /// has already taken effect.
    pub fn step(&mut self) -> Result<Option<StepResult>, CoreError> {
        let Some(idx) = self.current else {
            return Ok(None);
        };

        let state_changed = self.phases[idx].graph.step()?.is_some();

        let mut target = None;
        if let Some(node) = self.phases[idx].graph.current_node() {
            for &edge_idx in &self.adjacency[idx] {
                let edge = &self.phase_edges[edge_idx];
                if edge.evaluate(node)? {
                    target = Some(self.phase_index[edge.to_id()]);
                    tracing::debug!(
                        "phase edge fired: {} -> {} at {}",
                        edge.from_id(),
                        edge.to_id(),
                        node.id()
                    );
                    break;
                }
                tracing::trace!(
                    "phase guard not satisfied: {} -> {}",
                    edge.from_id(),
                    edge.to_id()
                );
            }
        }

        let phase_changed = target.is_some();
        if let Some(to) = target {
            self.enter(to);
        }

        let phase = &self.phases[self.current.unwrap_or(idx)];
        Ok(Some(StepResult {
            phase_changed,
            state_changed,
            phase_id: phase.id.clone(),
            state_id: phase.graph.current_state_id().map(str::to_string),
        }))
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "N: DeserializeOwned, E: DeserializeOwned"))]
struct PhaseSpec<N, E> {
    id: String,
    #[serde(default)]
    initial_state: Option<String>,
    #[serde(default = "Vec::new")]
    nodes: Vec<N>,
    #[serde(default = "Vec::new")]
    edges: Vec<E>,
}

#[derive(Deserialize)]
#[serde(bound(
    deserialize = "N: DeserializeOwned, E: DeserializeOwned, P: DeserializeOwned"
))]
struct PhaseDocument<N, E, P> {
    phases: Vec<PhaseSpec<N, E>>,
    #[serde(default = "Vec::new")]
    phase_edges: Vec<P>,
}

impl<N, E, P> PhaseGraph<N, E, P>
where
    N: IdentifiedState + DeserializeOwned,
    E: GuardedTransition<N> + DeserializeOwned,
    P: GuardedTransition<N> + DeserializeOwned,
{
    /// Loads a two-tier document:
    ///
    /// ```json
    /// {
    ///   "phases": [
    ///     {"id": "setup", "initial_state": "a", "nodes": [...], "edges": [...]},
    ///     {"id": "play", "initial_state": "p1", "nodes": [...], "edges": [...]}
    ///   ],
    ///   "phase_edges": [{"from": "setup", "to": "play", "condition": "score >= 50"}]
    /// }
    /// ```
    ///
    /// Existing content is discarded first. On success the first declared
    /// phase becomes current; on failure the engine is left empty with no
    /// current phase.
    pub fn load(&mut self, doc: &serde_json::Value) -> Result<(), CoreError> {
        self.clear();
        let result = self.load_document(doc);
        match &result {
            Ok(()) => tracing::info!(
                "loaded phase graph: {} phases, {} nodes, {} phase edges",
                self.phases.len(),
                self.phases
                    .iter()
                    .map(|p| p.graph.node_count())
                    .sum::<usize>(),
                self.phase_edges.len()
            ),
            Err(e) => {
                tracing::warn!("failed to load phase graph: {}", e);
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
        let doc = PhaseDocument::<N, E, P>::deserialize(doc).map_err(CoreError::from_document)?;

        for spec in doc.phases {
            let mut graph = Graph::new();
            for node in spec.nodes {
                graph.add_node(node)?;
            }
            for edge in spec.edges {
                graph.add_edge(edge)?;
            }

            let mut phase = Phase::new(spec.id, graph);
            // an empty initial state means none
            phase.initial_state = spec.initial_state.filter(|id| !id.is_empty());
            self.add_phase(phase)?;
        }

        for edge in doc.phase_edges {
            self.add_phase_edge(edge)?;
        }

        if !self.phases.is_empty() {
            self.enter(0);
        }
        Ok(())
    }

    /// Builds a phase graph from a two-tier document.
    pub fn from_json(doc: &serde_json::Value) -> Result<Self, CoreError> {
        let mut graph = Self::default();
        graph.load(doc)?;
        Ok(graph)
    }
}
