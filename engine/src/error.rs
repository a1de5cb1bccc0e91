//! Error types for the curation engine.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`ConfigError`] - Pipeline-build errors (unknown operation, bad kwargs)
//! - [`TableError`] - Tabular contract violations
//! - [`OperationError`] - Failures raised by an operation's work function
//! - [`LoaderError`] - Dataset loading errors
//! - [`LogError`] - Unknown level / log type / purpose names
//! - [`ExportError`] - Artifact writing errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Data-quality problems are never errors: operations log them and move on.
//! Everything here is either a configuration mistake (caught before data is
//! touched) or a broken contract that aborts the current dataset.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors raised while building a pipeline, before any data is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No operation registered under this name.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Keyword arguments could not be applied to the operation.
    #[error("Invalid kwargs for '{operation}': {message}")]
    InvalidKwargs { operation: String, message: String },

    /// Applicability sets are malformed.
    #[error("Invalid applicability for '{operation}': {message}")]
    InvalidApplicability { operation: String, message: String },

    /// Pipeline definition does not match the schema.
    #[error("Invalid pipeline definition: {errors:?}")]
    InvalidPipeline { errors: Vec<String> },

    /// Invalid setting value.
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    /// IO error.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Table Errors
// =============================================================================

/// Contract violations on the tabular backend.
#[derive(Debug, Error)]
pub enum TableError {
    /// Column does not exist.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Column already exists.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Row or column length does not match the table shape.
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

// =============================================================================
// Operation Errors
// =============================================================================

/// Errors raised by an operation's work function.
///
/// These propagate uncaught through `apply` and abort the current dataset.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation's own invariant was broken.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Table contract violation.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Writing an artifact failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Nested composite failure.
    #[error("Child '{child}' failed: {source}")]
    Child {
        child: String,
        #[source]
        source: Box<OperationError>,
    },

    /// Child could not be instantiated.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors while turning a data source into a `DataHolder`.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Failed to read the source.
    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the content.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid CSV content.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Delimiter the CSV reader cannot split on.
    #[error("Delimiter {0:?} is not a single ASCII character")]
    Delimiter(char),

    /// Source is empty.
    #[error("Source is empty")]
    EmptyFile,

    /// No header row.
    #[error("No headers found")]
    NoHeaders,

    /// Loaded rows do not fit a table.
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

// =============================================================================
// Diagnostics Errors
// =============================================================================

/// Unknown names for diagnostics axes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogError {
    /// Not one of debug, info, warning, error, critical.
    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    /// Not one of validation, transformation, export, workflow.
    #[error("Unknown log type: {0}")]
    UnknownLogType(String),

    /// Not one of general, feedback.
    #[error("Unknown purpose: {0}")]
    UnknownPurpose(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing an artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("Export CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error.
    #[error("Export JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors returned by the controller and workflow.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pipeline could not be built.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// An operation failed; the dataset run was aborted.
    #[error("Operation '{operation}' failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: OperationError,
    },

    /// Dataset could not be loaded.
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    /// A stage ran before a data holder was set.
    #[error("No data holder set")]
    NoDataHolder,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for pipeline-build operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for operation work functions.
pub type OperationResult<T> = Result<T, OperationError>;

/// Result type for loaders.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Result type for exporters.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for controller and workflow runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // TableError -> OperationError
        let table_err = TableError::UnknownColumn("depth".into());
        let op_err: OperationError = table_err.into();
        assert!(op_err.to_string().contains("depth"));

        // ConfigError -> PipelineError
        let config_err = ConfigError::UnknownOperation("nope".into());
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("nope"));
    }

    #[test]
    fn test_operation_failure_format() {
        let err = PipelineError::Operation {
            operation: "to_number".into(),
            source: OperationError::Contract("row count changed".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("to_number"));
        assert!(msg.contains("row count changed"));
    }
}
