//! Four-stage driver bound to one dataset.
//!
//! ```text
//! validators_before -> transformers -> validators_after -> exporters
//! ```
//!
//! Stages run strictly in that order and every operation of a stage is
//! applied in the order it was given. The first failing operation aborts
//! the rest of the run: no retry, no rollback.

use serde::Serialize;
use std::fmt;

use super::config::{PipelineConfig, Stage, StepSpec};
use crate::data::DataHolder;
use crate::diagnostics::{Level, LogDraft, LogType};
use crate::error::{ConfigResult, PipelineError, PipelineResult};
use crate::operation::{Operation, OperationInfo, OperationRegistry};
use crate::session::Session;

/// Source name of entries logged by the controller itself.
pub const CONTROLLER_SOURCE: &str = "controller";

/// What each stage did for one dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControllerReport {
    pub dataset: String,
    pub stages: Vec<(Stage, Vec<OperationInfo>)>,
}

impl ControllerReport {
    pub fn stage(&self, stage: Stage) -> &[OperationInfo] {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, infos)| infos.as_slice())
            .unwrap_or(&[])
    }

    pub fn ran(&self) -> usize {
        self.operations().filter(|i| i.has_run()).count()
    }

    pub fn skipped(&self) -> usize {
        self.operations().filter(|i| i.is_skipped()).count()
    }

    fn operations(&self) -> impl Iterator<Item = &OperationInfo> {
        self.stages.iter().flat_map(|(_, infos)| infos.iter())
    }
}

#[derive(Default)]
pub struct Controller {
    holder: Option<DataHolder>,
    validators_before: Vec<Box<dyn Operation>>,
    transformers: Vec<Box<dyn Operation>>,
    validators_after: Vec<Box<dyn Operation>>,
    exporters: Vec<Box<dyn Operation>>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |ops: &[Box<dyn Operation>]| ops.iter().map(|o| o.name().to_string()).collect::<Vec<_>>();
        f.debug_struct("Controller")
            .field("dataset", &self.holder.as_ref().map(|h| h.dataset_name.as_str()))
            .field("validators_before", &names(&self.validators_before))
            .field("transformers", &names(&self.transformers))
            .field("validators_after", &names(&self.validators_after))
            .field("exporters", &names(&self.exporters))
            .finish()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every stage from a pipeline definition, before any data is touched.
    pub fn from_config(registry: &OperationRegistry, config: &PipelineConfig) -> ConfigResult<Self> {
        let build = |steps: &[StepSpec]| -> ConfigResult<Vec<Box<dyn Operation>>> {
            steps
                .iter()
                .map(|step| registry.build(&step.name, &step.kwargs))
                .collect()
        };

        let mut controller = Self::new();
        controller.set_validators_before(build(&config.validators_before)?);
        controller.set_transformers(build(&config.transformers)?);
        controller.set_validators_after(build(&config.validators_after)?);
        controller.set_exporters(build(&config.exporters)?);
        log::debug!("Controller built: {:?}", controller);
        Ok(controller)
    }

    /// The `{name, kwargs}` lists that rebuild this controller.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let specs = |ops: &[Box<dyn Operation>]| -> Vec<StepSpec> {
            ops.iter()
                .map(|op| StepSpec::new(op.name()).with_kwargs(op.kwargs()))
                .collect()
        };
        PipelineConfig {
            validators_before: specs(&self.validators_before),
            transformers: specs(&self.transformers),
            validators_after: specs(&self.validators_after),
            exporters: specs(&self.exporters),
        }
    }

    pub fn set_data_holder(&mut self, holder: DataHolder) {
        self.holder = Some(holder);
    }

    pub fn data_holder(&self) -> Option<&DataHolder> {
        self.holder.as_ref()
    }

    pub fn take_data_holder(&mut self) -> Option<DataHolder> {
        self.holder.take()
    }

    pub fn set_validators_before(&mut self, operations: Vec<Box<dyn Operation>>) {
        self.validators_before = operations;
    }

    pub fn set_transformers(&mut self, operations: Vec<Box<dyn Operation>>) {
        self.transformers = operations;
    }

    pub fn set_validators_after(&mut self, operations: Vec<Box<dyn Operation>>) {
        self.validators_after = operations;
    }

    pub fn set_exporters(&mut self, operations: Vec<Box<dyn Operation>>) {
        self.exporters = operations;
    }

    pub fn validate_before_all(&mut self, session: &mut Session) -> PipelineResult<Vec<OperationInfo>> {
        self.run_stage(Stage::ValidatorsBefore, session)
    }

    pub fn transform_all(&mut self, session: &mut Session) -> PipelineResult<Vec<OperationInfo>> {
        self.run_stage(Stage::Transformers, session)
    }

    pub fn validate_after_all(&mut self, session: &mut Session) -> PipelineResult<Vec<OperationInfo>> {
        self.run_stage(Stage::ValidatorsAfter, session)
    }

    pub fn export_all(&mut self, session: &mut Session) -> PipelineResult<Vec<OperationInfo>> {
        self.run_stage(Stage::Exporters, session)
    }

    /// Run the four stages in order on the bound holder.
    pub fn start_data_handling(&mut self, session: &mut Session) -> PipelineResult<ControllerReport> {
        let dataset = self
            .holder
            .as_ref()
            .map(|h| h.dataset_name.clone())
            .ok_or(PipelineError::NoDataHolder)?;
        session.log(
            LogDraft::new(LogType::Workflow, CONTROLLER_SOURCE, format!("Handling dataset `{}`", dataset))
                .level(Level::Debug)
                .dataset(&dataset),
        );

        let mut report = ControllerReport {
            dataset,
            stages: Vec::with_capacity(Stage::ALL.len()),
        };
        report.stages.push((Stage::ValidatorsBefore, self.validate_before_all(session)?));
        report.stages.push((Stage::Transformers, self.transform_all(session)?));
        report.stages.push((Stage::ValidatorsAfter, self.validate_after_all(session)?));
        report.stages.push((Stage::Exporters, self.export_all(session)?));
        Ok(report)
    }

    fn run_stage(&mut self, stage: Stage, session: &mut Session) -> PipelineResult<Vec<OperationInfo>> {
        let holder = self.holder.as_mut().ok_or(PipelineError::NoDataHolder)?;
        let operations = match stage {
            Stage::ValidatorsBefore => &mut self.validators_before,
            Stage::Transformers => &mut self.transformers,
            Stage::ValidatorsAfter => &mut self.validators_after,
            Stage::Exporters => &mut self.exporters,
        };

        let mut infos = Vec::with_capacity(operations.len());
        for operation in operations.iter_mut() {
            match operation.apply(holder, session) {
                Ok(info) => infos.push(info),
                Err(source) => {
                    session.log(
                        LogDraft::new(
                            LogType::Workflow,
                            CONTROLLER_SOURCE,
                            format!("`{}` failed during {}: {}", operation.name(), stage, source),
                        )
                        .level(Level::Critical)
                        .dataset(&holder.dataset_name),
                    );
                    return Err(PipelineError::Operation {
                        operation: operation.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataStructure, Table};
    use crate::error::{OperationError, OperationResult};
    use crate::operation::{Applicability, Flow, OperationContext, OperationKind};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        name: &'static str,
        kind: OperationKind,
        calls: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
        applicability: Applicability,
    }

    impl Tracked {
        fn boxed(name: &'static str, kind: OperationKind, calls: &Rc<RefCell<Vec<&'static str>>>) -> Box<dyn Operation> {
            Box::new(Self {
                name,
                kind,
                calls: Rc::clone(calls),
                fail: false,
                applicability: Applicability::for_kind(kind),
            })
        }

        fn failing(name: &'static str, calls: &Rc<RefCell<Vec<&'static str>>>) -> Box<dyn Operation> {
            Box::new(Self {
                name,
                kind: OperationKind::Transformer,
                calls: Rc::clone(calls),
                fail: true,
                applicability: Applicability::for_kind(OperationKind::Transformer),
            })
        }
    }

    impl Operation for Tracked {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "tracked"
        }

        fn kind(&self) -> OperationKind {
            self.kind
        }

        fn applicability(&self) -> &Applicability {
            &self.applicability
        }

        fn run(&mut self, _holder: &mut DataHolder, _ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
            self.calls.borrow_mut().push(self.name);
            if self.fail {
                return Err(OperationError::Contract("bad shape".into()));
            }
            Ok(Flow::Continue)
        }
    }

    fn holder() -> DataHolder {
        DataHolder::new("lake", Table::from_records(&[json!({"value": "1"})]))
            .with_data_type("physicalchemical")
    }

    #[test]
    fn test_stage_order() {
        let calls = Rc::default();
        let mut controller = Controller::new();
        // Set in reverse to show that order comes from the stages, not the calls.
        controller.set_exporters(vec![Tracked::boxed("export", OperationKind::Exporter, &calls)]);
        controller.set_validators_after(vec![Tracked::boxed("after", OperationKind::Validator, &calls)]);
        controller.set_transformers(vec![
            Tracked::boxed("t1", OperationKind::Transformer, &calls),
            Tracked::boxed("t2", OperationKind::Transformer, &calls),
        ]);
        controller.set_validators_before(vec![Tracked::boxed("before", OperationKind::Validator, &calls)]);
        controller.set_data_holder(holder());

        let report = controller.start_data_handling(&mut Session::default()).unwrap();
        assert_eq!(*calls.borrow(), vec!["before", "t1", "t2", "after", "export"]);
        assert_eq!(report.ran(), 5);
        assert_eq!(report.stage(Stage::Transformers).len(), 2);
    }

    #[test]
    fn test_setters_replace() {
        let calls = Rc::default();
        let mut controller = Controller::new();
        controller.set_transformers(vec![Tracked::boxed("old", OperationKind::Transformer, &calls)]);
        controller.set_transformers(vec![Tracked::boxed("new", OperationKind::Transformer, &calls)]);
        controller.set_data_holder(holder());
        controller.transform_all(&mut Session::default()).unwrap();
        assert_eq!(*calls.borrow(), vec!["new"]);
    }

    #[test]
    fn test_failure_aborts_remaining_stages() {
        let calls = Rc::default();
        let mut controller = Controller::new();
        controller.set_transformers(vec![
            Tracked::failing("broken", &calls),
            Tracked::boxed("t2", OperationKind::Transformer, &calls),
        ]);
        controller.set_exporters(vec![Tracked::boxed("export", OperationKind::Exporter, &calls)]);
        controller.set_data_holder(holder());

        let mut session = Session::default();
        let err = controller.start_data_handling(&mut session).unwrap_err();
        assert!(matches!(err, PipelineError::Operation { ref operation, .. } if operation == "broken"));
        assert_eq!(*calls.borrow(), vec!["broken"]);

        let critical: Vec<_> = session
            .log
            .all_entries()
            .iter()
            .filter(|e| e.level == Level::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].log_type, LogType::Workflow);
        assert_eq!(critical[0].dataset_name, "lake");
    }

    #[test]
    fn test_no_data_holder() {
        let mut controller = Controller::new();
        let err = controller.start_data_handling(&mut Session::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoDataHolder));
    }

    #[test]
    fn test_pipeline_config_round_trip() {
        let registry = OperationRegistry::with_builtins();
        let config = PipelineConfig::from_value(json!({
            "validators_before": [{ "name": "required_columns", "kwargs": { "columns": ["value"] } }],
            "transformers": [
                { "name": "to_number", "kwargs": { "column": "value", "invalid_data_types": ["biology"] } },
                { "name": "wide_to_long", "kwargs": { "id_columns": [] } }
            ],
            "exporters": [{ "name": "json_export", "kwargs": { "pretty": false } }]
        }))
        .unwrap();

        let controller = Controller::from_config(&registry, &config).unwrap();
        let rebuilt = controller.pipeline_config();
        assert_eq!(rebuilt.transformers[0].kwargs["invalid_data_types"], json!(["biology"]));

        let again = Controller::from_config(&registry, &rebuilt).unwrap().pipeline_config();
        assert_eq!(again, rebuilt);
    }

    #[test]
    fn test_unknown_operation_fails_before_data() {
        let registry = OperationRegistry::with_builtins();
        let config = PipelineConfig::from_value(json!({ "transformers": [{ "name": "teleport" }] })).unwrap();
        assert!(Controller::from_config(&registry, &config).is_err());
    }

    #[test]
    fn test_skipped_operations_are_reported() {
        let registry = OperationRegistry::with_builtins();
        let config = PipelineConfig::from_value(json!({
            "transformers": [{ "name": "long_to_wide" }]
        }))
        .unwrap();
        let mut controller = Controller::from_config(&registry, &config).unwrap();
        controller.set_data_holder(holder().with_structure(DataStructure::Column));
        let report = controller.start_data_handling(&mut Session::default()).unwrap();
        assert_eq!(report.skipped(), 1);
    }
}
