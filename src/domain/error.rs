//! Domain error types for pr-builder.
//!
//! Validation, not-found and reconciliation failures are never recovered
//! locally: they travel up to the command surface unchanged so the process
//! can report them and exit non-zero. Storage failures carry the path that
//! could not be read or written.

use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before any state was mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("filter name is required")]
    MissingFilterName,

    #[error("filter '{0}' needs at least one include or exclude pattern")]
    MissingPattern(String),

    #[error("invalid filter index {index} (have {len} active filters)")]
    FilterIndexOutOfRange { index: usize, len: usize },

    #[error("invalid context item index {index} (have {len} context items)")]
    ContextIndexOutOfRange { index: usize, len: usize },

    #[error("invalid git context index {index} (have {len} git context items)")]
    GitContextIndexOutOfRange { index: usize, len: usize },

    #[error("no files included for generation")]
    NoFilesIncluded,

    #[error("preset name is required")]
    MissingPresetName,

    #[error("cannot save presets to the {0} location")]
    ReadOnlyPresetLocation(String),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// A referenced entity does not exist.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("file not found: {0}")]
    File(String),

    #[error("prompt preset not found: {0}")]
    PromptPreset(String),

    #[error("filter preset not found: {0}")]
    FilterPreset(String),
}

/// A stored session was recorded against a different branch than the one
/// currently checked out.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("session source branch ({stored}) doesn't match current branch ({live})")]
pub struct ReconciliationError {
    pub stored: String,
    pub live: String,
}

/// Reading or writing one of the tool's files failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_yaml::Error,
    },

    #[error("could not determine home directory")]
    HomeDirUnavailable,
}

/// Unified error type returned by the controller and the command surface.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("repository operation failed: {0:#}")]
    Repository(anyhow::Error),

    #[error("generation failed: {0:#}")]
    Generation(anyhow::Error),
}

impl DomainError {
    /// True for errors caused by user input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_) | DomainError::NotFound(_) | DomainError::Reconciliation(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
