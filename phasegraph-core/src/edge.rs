//! Guarded transitions: node-level edges and phase edges.
//!
//! Both kinds deserialize from the document shape
//! `{"from": .., "to": .., "condition": ..}` and compile their condition at
//! construction time, so a malformed guard fails the load rather than the
//! first step.

use serde::Deserialize;

use crate::error::CoreError;
use crate::expression::{Bindings, Expression};
use crate::node::{Node, ValueMap};
use crate::value::Value;

/// A directed transition guarded by a condition evaluated against a state.
pub trait GuardedTransition<N> {
    /// Id of the source endpoint.
    fn from_id(&self) -> &str;

    /// Id of the target endpoint.
    fn to_id(&self) -> &str;

    /// Evaluates the guard against the current state.
    fn evaluate(&self, state: &N) -> Result<bool, CoreError>;

    /// Applies side effects to the destination state after the transition
    /// has been selected.
    fn apply(&self, _target: &mut N) {}
}

#[derive(Debug, Deserialize)]
struct EdgeSpec {
    from: String,
    to: String,
    condition: String,
    #[serde(default)]
    actions: ValueMap,
}

/// A transition between two nodes of the same graph.
///
/// An edge without a condition is always taken.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "EdgeSpec")]
pub struct Edge {
    from: String,
    to: String,
    condition: Option<Expression>,
    actions: ValueMap,
}

impl Edge {
    /// Creates an edge, compiling its condition.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        condition: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            from: from.into(),
            to: to.into(),
            condition: Some(Expression::compile(condition)?),
            actions: ValueMap::new(),
        })
    }

    /// Creates an edge with no condition.
    pub fn unguarded(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: None,
            actions: ValueMap::new(),
        }
    }

    /// Adds a variable assignment applied to the destination node.
    pub fn with_action(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.actions.insert(key.into(), value.into());
        self
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn condition(&self) -> Option<&Expression> {
        self.condition.as_ref()
    }

    pub fn condition_source(&self) -> Option<&str> {
        self.condition.as_ref().map(Expression::source)
    }

    pub fn actions(&self) -> &ValueMap {
        &self.actions
    }
}

impl TryFrom<EdgeSpec> for Edge {
    type Error = CoreError;

    fn try_from(spec: EdgeSpec) -> Result<Self, Self::Error> {
        let mut edge = Edge::new(spec.from, spec.to, &spec.condition)?;
        edge.actions = spec.actions;
        Ok(edge)
    }
}

impl GuardedTransition<Node> for Edge {
    fn from_id(&self) -> &str {
        &self.from
    }

    fn to_id(&self) -> &str {
        &self.to
    }

    fn evaluate(&self, state: &Node) -> Result<bool, CoreError> {
        match &self.condition {
            Some(expr) => expr.evaluate(state),
            None => Ok(true),
        }
    }

    fn apply(&self, target: &mut Node) {
        for (key, value) in &self.actions {
            target.set_var(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Deserialize)]
struct PhaseEdgeSpec {
    from: String,
    to: String,
    condition: String,
}

/// A transition between two phases, evaluated against the current node of
/// the source phase. Phase edges carry no actions.
///
/// A phase edge without a condition never fires.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "PhaseEdgeSpec")]
pub struct PhaseEdge {
    from: String,
    to: String,
    condition: Option<Expression>,
}

impl PhaseEdge {
    /// Creates a phase edge, compiling its condition.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        condition: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            from: from.into(),
            to: to.into(),
            condition: Some(Expression::compile(condition)?),
        })
    }

    /// Creates a phase edge with no condition.
    pub fn unguarded(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: None,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn condition(&self) -> Option<&Expression> {
        self.condition.as_ref()
    }

    pub fn condition_source(&self) -> Option<&str> {
        self.condition.as_ref().map(Expression::source)
    }
}

impl TryFrom<PhaseEdgeSpec> for PhaseEdge {
    type Error = CoreError;

    fn try_from(spec: PhaseEdgeSpec) -> Result<Self, Self::Error> {
        PhaseEdge::new(spec.from, spec.to, &spec.condition)
    }
}

impl<N: Bindings> GuardedTransition<N> for PhaseEdge {
    fn from_id(&self) -> &str {
        &self.from
    }

    fn to_id(&self) -> &str {
        &self.to
    }

    fn evaluate(&self, state: &N) -> Result<bool, CoreError> {
        match &self.condition {
            Some(expr) => expr.evaluate(state),
            None => Ok(false),
        }
    }
}
