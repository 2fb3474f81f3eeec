//! Core error types.

use thiserror::Error;

const INVALID_EXPRESSION_PREFIX: &str = "invalid expression: ";

/// Errors from the expression compiler, the evaluator and the graph engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid expression: {reason}")]
    InvalidExpression { reason: String },

    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("unknown property: {name}")]
    UnknownProperty { name: String },

    #[error("non-numeric operand in '{op}' comparison: {found}")]
    NonNumericOperand { op: String, found: &'static str },

    #[error("duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("duplicate phase id: {id}")]
    DuplicatePhase { id: String },

    #[error("unknown node: {id}")]
    UnknownNode { id: String },

    #[error("unknown phase: {id}")]
    UnknownPhase { id: String },

    #[error("invalid document: {reason}")]
    InvalidDocument { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid_expression(reason: impl Into<String>) -> Self {
        CoreError::InvalidExpression {
            reason: reason.into(),
        }
    }

    /// Converts a document deserialization failure into a load error.
    ///
    /// Guards compile while their edge deserializes, so a compile error
    /// arrives as a serde message. It is restored to `InvalidExpression`;
    /// everything else is an `InvalidDocument`.
    pub(crate) fn from_document(e: serde_json::Error) -> Self {
        let message = e.to_string();
        match message.strip_prefix(INVALID_EXPRESSION_PREFIX) {
            Some(reason) => CoreError::invalid_expression(reason),
            None => CoreError::InvalidDocument { reason: message },
        }
    }

    /// Returns whether this error was raised while evaluating a guard.
    ///
    /// Evaluation errors point at a content bug (a comparison against a
    /// missing identifier, or an ordering comparison on a non-number) and
    /// are surfaced from `step()` rather than from loading.
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownVariable { .. }
                | CoreError::UnknownProperty { .. }
                | CoreError::NonNumericOperand { .. }
        )
    }

    /// Returns a stable error code suitable for host-facing reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidExpression { .. } => "INVALID_EXPRESSION",
            CoreError::UnknownVariable { .. } => "UNKNOWN_VARIABLE",
            CoreError::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            CoreError::NonNumericOperand { .. } => "NON_NUMERIC_OPERAND",
            CoreError::DuplicateNode { .. } => "DUPLICATE_NODE",
            CoreError::DuplicatePhase { .. } => "DUPLICATE_PHASE",
            CoreError::UnknownNode { .. } => "UNKNOWN_NODE",
            CoreError::UnknownPhase { .. } => "UNKNOWN_PHASE",
            CoreError::InvalidDocument { .. } => "INVALID_DOCUMENT",
            CoreError::Json(_) => "INVALID_DOCUMENT",
        }
    }
}
