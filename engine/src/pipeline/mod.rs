//! Pipeline composition.
//!
//! - `config`: pipeline definition files (`{name, kwargs}` per stage)
//! - `controller`: the four ordered stages bound to one dataset
//! - `workflow`: batch driver over many data sources
//!
//! ## Usage Flow
//!
//! ```text
//! PipelineConfig ─▶ Workflow::run
//!                     ├─ Controller::from_config (fails fast on config errors)
//!                     └─ per source: DatasetLoader::load ─▶ Controller::start_data_handling
//! ```

pub mod config;
pub mod controller;
pub mod workflow;

pub use config::{validate_pipeline, PipelineConfig, Stage, StepSpec};
pub use controller::{Controller, ControllerReport, CONTROLLER_SOURCE};
pub use workflow::{DatasetOutcome, Workflow, WorkflowReport, DATASETS_LABEL, WORKFLOW_SOURCE};
