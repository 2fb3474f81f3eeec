//! # phasegraph-core
//!
//! Guarded state graph engine for phasegraph.
//!
//! This crate provides:
//! - A compiler and evaluator for boolean guard expressions
//! - Nodes with independent param/var/property namespaces
//! - A single-tier graph whose edges fire on guards and apply actions
//! - A two-tier phase graph layering phases of graphs
//! - JSON document loading for both tiers

pub mod edge;
pub mod error;
pub mod expression;
pub mod graph;
pub mod lexer;
pub mod node;
pub mod phase;
pub mod value;

pub use edge::{Edge, GuardedTransition, PhaseEdge};
pub use error::CoreError;
pub use expression::{compile, Bindings, CmpOp, ExprNode, Expression, Leaf};
pub use graph::Graph;
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use node::{IdentifiedState, Node, ValueMap};
pub use phase::{Phase, PhaseGraph, StepResult};
pub use value::Value;
