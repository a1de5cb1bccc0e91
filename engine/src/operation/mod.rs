//! Operations: named, applicability-checked units of work.
//!
//! This module provides:
//! - [`Operation`]: the trait every transformer, validator and exporter implements
//! - `applicability`: allow/deny sets on the data type, holder kind and data structure axes
//! - `multi`: ordered composites with early termination
//! - `registry`: explicit name -> constructor table
//! - `builtin`: the built-in catalog
//!
//! ## Dispatch
//!
//! ```text
//! apply(holder)
//!   ├─ applicability.check(holder) fails ─▶ DEBUG "Invalid <axis> `<value>` for `<name>`" ─▶ Skipped
//!   └─ passes ─▶ DEBUG "Applying `<name>`" ─▶ run(holder, ctx) (timed) ─▶ DEBUG elapsed ─▶ Ran
//! ```
//!
//! `apply` never fails because an operation does not apply. Errors returned by
//! `run` propagate untouched and abort the dataset.

pub mod applicability;
pub mod builtin;
pub mod context;
pub mod info;
pub mod multi;
pub mod registry;

pub use applicability::{Applicability, Axis, AxisRule, SkipReason, APPLICABILITY_KEYS};
pub use context::OperationContext;
pub use info::{OperationInfo, OperationStatus};
pub use multi::{ChildFactory, MultiOperation, MultiReport};
pub use registry::{CatalogEntry, Factory, OperationRegistry, OperationSpec};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;

use crate::data::DataHolder;
use crate::diagnostics::{Level, LogDraft, LogType};
use crate::error::OperationResult;
use crate::session::Session;

/// Keyword configuration of an operation.
pub type Kwargs = Map<String, Value>;

/// Operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Transformer,
    Validator,
    Exporter,
}

impl OperationKind {
    /// Log type of entries emitted by this family.
    pub fn log_type(&self) -> LogType {
        match self {
            OperationKind::Transformer => LogType::Transformation,
            OperationKind::Validator => LogType::Validation,
            OperationKind::Exporter => LogType::Export,
        }
    }

    /// Whether unclassified holders pass the data-type axis by default.
    ///
    /// Transformers and validators may run before classification is done;
    /// exporters only write classified data.
    pub fn bypasses_unknown_data_type(&self) -> bool {
        !matches!(self, OperationKind::Exporter)
    }
}

/// Outcome of a work function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Stop the surrounding composite.
    Terminate,
}

/// A unit of validate/transform/export work.
pub trait Operation {
    /// Identifier of the concrete operation, as used in pipeline files.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> OperationKind;

    fn applicability(&self) -> &Applicability;

    /// Configuration to persist in a pipeline file.
    fn kwargs(&self) -> Kwargs {
        Kwargs::new()
    }

    /// The work function.
    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow>;

    /// Check applicability, then run and time the work function.
    fn apply(&mut self, holder: &mut DataHolder, session: &mut Session) -> OperationResult<OperationInfo> {
        let name = self.name().to_string();
        let log_type = self.kind().log_type();
        let dataset = holder.dataset_name.clone();

        if let Err(reason) = self.applicability().check(holder) {
            session.log(
                LogDraft::new(
                    log_type,
                    &name,
                    format!("Invalid {} `{}` for `{}`", reason.axis, reason.value, name),
                )
                .level(Level::Debug)
                .dataset(&dataset),
            );
            return Ok(OperationInfo::skipped(name, reason));
        }

        session.log(
            LogDraft::new(log_type, &name, format!("Applying `{}`: {}", name, self.description()))
                .level(Level::Debug)
                .dataset(&dataset),
        );

        let started = Instant::now();
        let flow = {
            let mut ctx = OperationContext::new(session, &name, log_type, &dataset);
            self.run(holder, &mut ctx)?
        };
        let elapsed = started.elapsed();

        session.log(
            LogDraft::new(
                log_type,
                &name,
                format!("`{}` finished in {:.3}s", name, elapsed.as_secs_f64()),
            )
            .level(Level::Debug)
            .dataset(&dataset),
        );

        Ok(OperationInfo::ran(name, flow, elapsed))
    }
}
