//! Graph nodes and the state capability trait.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::expression::Bindings;
use crate::value::Value;

/// Named value map used for every node namespace.
pub type ValueMap = HashMap<String, Value>;

/// Something that can be a state in a graph.
pub trait IdentifiedState {
    /// Returns the id, unique within the owning graph.
    fn id(&self) -> &str;
}

/// A named state holding three independent namespaces.
///
/// - `params`: configuration set at load time; never written by the engine.
/// - `vars`: runtime variables; written by edge actions or the host.
/// - `properties`: static identity/classification facts, readable from
///   guards through the `properties.` prefix.
///
/// The id is fixed at construction and only readable through
/// [`IdentifiedState::id`], so graphs can index nodes by it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: String,

    #[serde(default)]
    params: ValueMap,

    #[serde(default)]
    vars: ValueMap,

    #[serde(default)]
    properties: ValueMap,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn get_param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn has_var(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn get_var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Writes a runtime variable, replacing any previous value.
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn params(&self) -> &ValueMap {
        &self.params
    }

    pub fn vars(&self) -> &ValueMap {
        &self.vars
    }

    pub fn properties(&self) -> &ValueMap {
        &self.properties
    }
}

impl IdentifiedState for Node {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Bindings for Node {
    fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}
