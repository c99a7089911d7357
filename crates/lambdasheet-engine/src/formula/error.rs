use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::CellRef;

/// Why a formula could not produce a number.
///
/// The first three variants come from validation and mean the formula was
/// never executed. The rest are raised while (or right after) executing it.
/// `Display` is the text shown as the failing cell's output.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum FormulaError {
    #[error("Syntax error: {0}")]
    SyntaxViolation(String),

    #[error("Forbidden construct: {0}")]
    ForbiddenConstruct(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Runtime error: {0}")]
    RuntimeFailure(String),

    #[error("Formula result must be a number, not {0}")]
    NonNumericResult(String),

    #[error("No numeric value bound for cell {0}")]
    MissingBinding(CellRef),

    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl FormulaError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        FormulaError::SyntaxViolation(message.into())
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        FormulaError::ForbiddenConstruct(message.into())
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        FormulaError::RuntimeFailure(message.into())
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        FormulaError::InvalidRange(message.into())
    }

    /// True if the formula was rejected before execution.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            FormulaError::SyntaxViolation(_)
                | FormulaError::ForbiddenConstruct(_)
                | FormulaError::UnknownSymbol(_)
        )
    }
}
