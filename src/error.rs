use thiserror::Error;

use crate::position::Action;

/// Errors reported by the rules engine and its drivers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaflError {
    #[error("Unknown variant: {0} (expected historical, copenhagen or mini)")]
    UnknownVariant(String),

    #[error("Illegal action: {action}")]
    IllegalAction { action: Action },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Convenience Result type for rules engine operations
pub type Result<T> = std::result::Result<T, TaflError>;
