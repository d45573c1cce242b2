//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Engine-level error type.
//! CONTEXT: Formula failures are values (`CellError`) and never appear here. This type
//! covers failures of the surfaces around the engine: snapshot JSON, cell keys and
//! assistant actions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid cell key: {0:?}")]
    InvalidCellKey(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
