//! Batch driver: load every source and run one fresh controller per dataset.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::config::PipelineConfig;
use super::controller::{Controller, ControllerReport};
use crate::diagnostics::{Level, LogDraft, LogType, Purpose};
use crate::error::PipelineResult;
use crate::events::DatasetStatus;
use crate::loader::{dataset_name, DatasetLoader};
use crate::operation::OperationRegistry;
use crate::session::Session;

/// Source name of entries logged by the workflow itself.
pub const WORKFLOW_SOURCE: &str = "workflow";

/// Progress label of the dataset loop.
pub const DATASETS_LABEL: &str = "datasets";

#[derive(Debug, Clone, Serialize)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub source: PathBuf,
    pub status: DatasetStatus,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ControllerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub datasets: Vec<DatasetOutcome>,
}

impl WorkflowReport {
    pub fn succeeded(&self) -> usize {
        self.count(DatasetStatus::Finished)
    }

    pub fn failed(&self) -> usize {
        self.count(DatasetStatus::Failed)
    }

    fn count(&self, status: DatasetStatus) -> usize {
        self.datasets.iter().filter(|d| d.status == status).count()
    }
}

pub struct Workflow {
    config: PipelineConfig,
    loader: Box<dyn DatasetLoader>,
    sources: Vec<PathBuf>,
    save_config: Option<PathBuf>,
}

impl Workflow {
    pub fn new(config: PipelineConfig, loader: Box<dyn DatasetLoader>) -> Self {
        Self {
            config,
            loader,
            sources: Vec::new(),
            save_config: None,
        }
    }

    pub fn with_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Persist the pipeline definition before running.
    pub fn save_config_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_config = Some(path.into());
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every source in order.
    ///
    /// The pipeline is built once up front so that configuration errors
    /// surface before any data is loaded. Sources that fail to load are
    /// logged and recorded; an operation failure stops the batch.
    pub fn run(&self, registry: &OperationRegistry, session: &mut Session) -> PipelineResult<WorkflowReport> {
        let run_id = Uuid::new_v4();
        let started_at = Local::now();

        let validated = Controller::from_config(registry, &self.config)?;
        if let Some(path) = &self.save_config {
            validated.pipeline_config().save(path)?;
        }

        log::info!("Workflow {} started with {} sources", run_id, self.sources.len());
        self.log(
            session,
            Level::Info,
            "",
            format!("Processing {} datasets", self.sources.len()),
        );

        let total = self.sources.len();
        let mut datasets = Vec::with_capacity(total);
        for (index, source) in self.sources.iter().enumerate() {
            let outcome = self.run_one(registry, session, source)?;
            datasets.push(outcome);
            session.progress(DATASETS_LABEL, index + 1, total);
        }

        let report = WorkflowReport {
            run_id,
            started_at,
            finished_at: Local::now(),
            datasets,
        };
        self.log(
            session,
            Level::Info,
            "",
            format!(
                "Finished: {} datasets processed, {} failed",
                report.succeeded(),
                report.failed()
            ),
        );
        log::info!("Workflow {} finished", run_id);
        Ok(report)
    }

    fn run_one(
        &self,
        registry: &OperationRegistry,
        session: &mut Session,
        source: &Path,
    ) -> PipelineResult<DatasetOutcome> {
        let dataset = dataset_name(source);
        session.workflow_event(&dataset, DatasetStatus::Started, source.display().to_string());

        let holder = match self.loader.load(source) {
            Ok(holder) => holder,
            Err(e) => {
                let message = format!("Could not load dataset: {}", e);
                session.log(
                    LogDraft::new(LogType::Workflow, WORKFLOW_SOURCE, message.clone())
                        .level(Level::Error)
                        .purpose(Purpose::Feedback)
                        .item(source.display().to_string())
                        .dataset(&dataset),
                );
                session.workflow_event(&dataset, DatasetStatus::Failed, &message);
                return Ok(DatasetOutcome {
                    dataset,
                    source: source.to_path_buf(),
                    status: DatasetStatus::Failed,
                    rows: 0,
                    error: Some(e.to_string()),
                    report: None,
                });
            }
        };
        let dataset = holder.dataset_name.clone();
        self.log(
            session,
            Level::Info,
            &dataset,
            format!(
                "Loaded {} rows as `{}` ({} structure)",
                holder.data.len(),
                holder.data_type_internal,
                holder.data_structure
            ),
        );

        let mut controller = Controller::from_config(registry, &self.config)?;
        controller.set_data_holder(holder);
        let report = match controller.start_data_handling(session) {
            Ok(report) => report,
            Err(e) => {
                session.workflow_event(&dataset, DatasetStatus::Failed, e.to_string());
                return Err(e);
            }
        };

        let rows = controller.data_holder().map(|h| h.data.len()).unwrap_or(0);
        session.workflow_event(&dataset, DatasetStatus::Finished, format!("{} rows", rows));
        Ok(DatasetOutcome {
            dataset,
            source: source.to_path_buf(),
            status: DatasetStatus::Finished,
            rows,
            error: None,
            report: Some(report),
        })
    }

    fn log(&self, session: &mut Session, level: Level, dataset: &str, message: String) {
        session.log(
            LogDraft::new(LogType::Workflow, WORKFLOW_SOURCE, message)
                .level(level)
                .dataset(dataset),
        );
    }
}
