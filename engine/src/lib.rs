//! # Curator - operation dispatch and diagnostics for monitoring datasets
//!
//! Curator runs ordered validate/transform/export pipelines over monitoring
//! datasets (water quality, biology, ...) and keeps a structured diagnostics
//! log of everything the operations found along the way.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────────┐     ┌─────────────┐
//! │ Data source │────▶│   Loader    │────▶│        Controller        │────▶│  Exported   │
//! │ (CSV, ...)  │     │ (auto-enc)  │     │ validate ▶ transform ▶   │     │  datasets   │
//! └─────────────┘     └─────────────┘     │ validate ▶ export        │     └─────────────┘
//!                                         └────────────┬─────────────┘
//!                                                      ▼
//!                                         ┌──────────────────────────┐
//!                                         │ DiagnosticsLog + events  │──▶ spreadsheet / changelog / feedback
//!                                         └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use curator::{CsvLoader, OperationRegistry, PipelineConfig, Session, Settings, Workflow};
//!
//! let registry = OperationRegistry::with_builtins();
//! let config = PipelineConfig::load("pipeline.json".as_ref())?;
//! let mut session = Session::new(Settings::from_env()?);
//!
//! let report = Workflow::new(config, Box::new(CsvLoader::new()))
//!     .with_sources(["lake_2024.csv"])
//!     .run(&registry, &mut session)?;
//! println!("{} datasets processed", report.succeeded());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment settings
//! - [`data`] - Tabular backend and `DataHolder`
//! - [`diagnostics`] - Structured log, filters and exporters
//! - [`events`] - Priority-ordered event bus
//! - [`session`] - Log, bus and settings passed through every run
//! - [`operation`] - Operation trait, applicability, composites, registry, built-ins
//! - [`pipeline`] - Pipeline files, controller and workflow
//! - [`loader`] - Data sources to `DataHolder`s

// Core modules
pub mod config;
pub mod error;
pub mod session;

// Data
pub mod data;
pub mod loader;

// Diagnostics
pub mod diagnostics;
pub mod events;

// Operations and pipelines
pub mod operation;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, ExportError, ExportResult, LoaderError, LoaderResult, LogError,
    OperationError, OperationResult, PipelineError, PipelineResult, TableError, TableResult,
};

// =============================================================================
// Re-exports - Data
// =============================================================================

pub use data::{canonical_data_type, DataHolder, DataStructure, Table, UNKNOWN_DATA_TYPE};

// =============================================================================
// Re-exports - Diagnostics
// =============================================================================

pub use diagnostics::{
    ChangelogExporter, ConsoleEcho, DiagnosticsLog, FeedbackExporter, FilterOptions, Level,
    LogDraft, LogEntry, LogExporter, LogType, Purpose, SpreadsheetExporter,
};
pub use events::{Event, EventBus, SubscriptionId};

// =============================================================================
// Re-exports - Operations
// =============================================================================

pub use operation::{
    Applicability, Flow, Kwargs, MultiOperation, MultiReport, Operation, OperationContext,
    OperationInfo, OperationKind, OperationRegistry,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::Settings;
pub use loader::{CsvLoader, DatasetLoader};
pub use pipeline::{Controller, ControllerReport, PipelineConfig, StepSpec, Workflow, WorkflowReport};
pub use session::Session;
