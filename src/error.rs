//! Import error taxonomy
//!
//! Only blocking failures are errors. Per-organization write failures and
//! aborted contact batches are partial results and travel in the
//! `ImportReport` instead.

use thiserror::Error;

use crate::types::SingleField;

/// Errors that stop an import run before (or while) it touches storage
#[derive(Debug, Error)]
pub enum ImportError {
    /// The uploaded file could not be decoded
    #[error("could not read file: {0}")]
    Format(String),

    /// The column mapping is incomplete or inconsistent
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A storage read the pipeline depends on failed
    #[error("storage error: {0}")]
    Store(String),
}

impl ImportError {
    /// Stable code used in error responses
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::Format(_) => "FORMAT_ERROR",
            ImportError::Mapping(_) => "MAPPING_ERROR",
            ImportError::Store(_) => "STORE_ERROR",
        }
    }

    pub(crate) fn store(err: anyhow::Error) -> Self {
        ImportError::Store(format!("{:#}", err))
    }
}

/// Column mapping problems
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("organization name column must be mapped")]
    MissingOrgName,

    #[error("select at least one email or phone column")]
    NoContactColumns,

    #[error("column {index} does not exist (file has {count} columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("column {index} is already mapped to {field}")]
    ColumnTaken { index: usize, field: SingleField },
}
