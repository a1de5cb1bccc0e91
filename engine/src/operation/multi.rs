//! Ordered composites of operations.
//!
//! A [`MultiOperation`] owns the constructors of its children, not the
//! children themselves: each run instantiates every child fresh with the
//! composite's shared kwargs, so no state survives between datasets. A child
//! that terminates stops the composite; later children are never built.

use std::fmt;

use super::applicability::Applicability;
use super::context::OperationContext;
use super::info::OperationInfo;
use super::{Flow, Kwargs, Operation, OperationKind};
use crate::data::DataHolder;
use crate::diagnostics::{Level, LogDraft};
use crate::error::{ConfigResult, OperationError, OperationResult};
use crate::session::Session;

/// Builds one child from the composite's shared kwargs.
pub type ChildFactory = Box<dyn Fn(&Kwargs) -> ConfigResult<Box<dyn Operation>>>;

/// Child name -> result, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiReport {
    entries: Vec<(String, OperationInfo)>,
}

impl MultiReport {
    fn push(&mut self, name: impl Into<String>, info: OperationInfo) {
        self.entries.push((name.into(), info));
    }

    pub fn get(&self, name: &str) -> Option<&OperationInfo> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, info)| info)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any child asked to stop.
    pub fn terminated(&self) -> bool {
        self.entries.iter().any(|(_, info)| info.terminate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OperationInfo)> {
        self.entries.iter().map(|(n, info)| (n.as_str(), info))
    }
}

pub struct MultiOperation {
    name: String,
    description: String,
    kind: OperationKind,
    kwargs: Kwargs,
    applicability: Applicability,
    children: Vec<(String, ChildFactory)>,
}

impl fmt::Debug for MultiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiOperation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("children", &self.child_names())
            .finish()
    }
}

impl MultiOperation {
    /// Build a composite. Every child is constructed once here so that bad
    /// kwargs are reported before any data is touched.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: OperationKind,
        kwargs: Kwargs,
        children: Vec<(String, ChildFactory)>,
    ) -> ConfigResult<Self> {
        let name = name.into();
        let applicability = Applicability::for_kind(kind).with_kwargs(&name, &kwargs)?;
        for (_, factory) in &children {
            factory(&kwargs)?;
        }

        Ok(Self {
            name,
            description: description.into(),
            kind,
            kwargs,
            applicability,
            children,
        })
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Check the composite's own applicability, then run its children.
    ///
    /// An inapplicable composite yields a report holding only its own
    /// skipped entry.
    pub fn apply_children(
        &mut self,
        holder: &mut DataHolder,
        session: &mut Session,
        stop_on_termination: bool,
    ) -> OperationResult<MultiReport> {
        if let Err(reason) = self.applicability.check(holder) {
            session.log(
                LogDraft::new(
                    self.kind.log_type(),
                    &self.name,
                    format!("Invalid {} `{}` for `{}`", reason.axis, reason.value, self.name),
                )
                .level(Level::Debug)
                .dataset(&holder.dataset_name),
            );
            let mut report = MultiReport::default();
            report.push(self.name.clone(), OperationInfo::skipped(self.name.clone(), reason));
            return Ok(report);
        }

        self.run_children(holder, session, stop_on_termination)
    }

    fn run_children(
        &mut self,
        holder: &mut DataHolder,
        session: &mut Session,
        stop_on_termination: bool,
    ) -> OperationResult<MultiReport> {
        let mut report = MultiReport::default();
        let total = self.children.len();

        for (index, (child_name, factory)) in self.children.iter().enumerate() {
            let mut child = factory(&self.kwargs)?;
            let info = child
                .apply(holder, session)
                .map_err(|source| OperationError::Child {
                    child: child_name.clone(),
                    source: Box::new(source),
                })?;
            let terminate = info.terminate;
            report.push(child_name.clone(), info);
            session.progress(self.name.clone(), index + 1, total);

            if terminate && stop_on_termination {
                session.log(
                    LogDraft::new(
                        self.kind.log_type(),
                        &self.name,
                        format!("`{}` requested termination of `{}`", child_name, self.name),
                    )
                    .level(Level::Debug)
                    .dataset(&holder.dataset_name),
                );
                break;
            }
        }

        Ok(report)
    }
}

impl Operation for MultiOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    fn kwargs(&self) -> Kwargs {
        self.kwargs.clone()
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let report = self.run_children(holder, ctx.session(), true)?;
        if report.terminated() {
            Ok(Flow::Terminate)
        } else {
            Ok(Flow::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<String>>>;

    /// Records construction and runs; terminates or fails on request.
    struct Recorder {
        name: String,
        calls: Calls,
        flow: Flow,
        fail: bool,
        applicability: Applicability,
    }

    impl Operation for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "records its calls"
        }

        fn kind(&self) -> OperationKind {
            OperationKind::Validator
        }

        fn applicability(&self) -> &Applicability {
            &self.applicability
        }

        fn run(&mut self, _holder: &mut DataHolder, _ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
            self.calls.borrow_mut().push(format!("run {}", self.name));
            if self.fail {
                return Err(OperationError::Contract("broken".into()));
            }
            Ok(self.flow)
        }
    }

    fn child(name: &str, calls: &Calls, flow: Flow, fail: bool) -> (String, ChildFactory) {
        let calls = Rc::clone(calls);
        let owned = name.to_string();
        let factory: ChildFactory = Box::new(move |_kwargs| {
            calls.borrow_mut().push(format!("new {}", owned));
            Ok(Box::new(Recorder {
                name: owned.clone(),
                calls: Rc::clone(&calls),
                flow,
                fail,
                applicability: Applicability::for_kind(OperationKind::Validator),
            }) as Box<dyn Operation>)
        });
        (name.to_string(), factory)
    }

    fn holder() -> DataHolder {
        DataHolder::new("ds", Table::from_records(&[json!({"a": 1})])).with_data_type("x")
    }

    #[test]
    fn test_termination_stops_later_children() {
        let calls: Calls = Rc::default();
        let mut multi = MultiOperation::new(
            "checks",
            "three checks",
            OperationKind::Validator,
            Kwargs::new(),
            vec![
                child("c1", &calls, Flow::Continue, false),
                child("c2", &calls, Flow::Terminate, false),
                child("c3", &calls, Flow::Continue, false),
            ],
        )
        .unwrap();
        calls.borrow_mut().clear();

        let mut session = Session::default();
        let report = multi.apply_children(&mut holder(), &mut session, true).unwrap();

        assert_eq!(report.names(), vec!["c1", "c2"]);
        assert!(report.get("c2").unwrap().terminate);
        assert!(report.get("c3").is_none());
        assert_eq!(*calls.borrow(), vec!["new c1", "run c1", "new c2", "run c2"]);
    }

    #[test]
    fn test_without_stop_runs_all_children() {
        let calls: Calls = Rc::default();
        let mut multi = MultiOperation::new(
            "checks",
            "",
            OperationKind::Validator,
            Kwargs::new(),
            vec![
                child("c1", &calls, Flow::Terminate, false),
                child("c2", &calls, Flow::Continue, false),
            ],
        )
        .unwrap();

        let report = multi
            .apply_children(&mut holder(), &mut Session::default(), false)
            .unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.terminated());
    }

    #[test]
    fn test_inapplicable_composite_reports_itself() {
        let calls: Calls = Rc::default();
        let kwargs = json!({ "invalid_data_types": ["x"] });
        let mut multi = MultiOperation::new(
            "checks",
            "",
            OperationKind::Validator,
            kwargs.as_object().unwrap().clone(),
            vec![child("c1", &calls, Flow::Continue, false)],
        )
        .unwrap();
        calls.borrow_mut().clear();

        let report = multi
            .apply_children(&mut holder(), &mut Session::default(), true)
            .unwrap();
        assert_eq!(report.names(), vec!["checks"]);
        assert!(report.get("checks").unwrap().is_skipped());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_child_error_is_wrapped() {
        let calls: Calls = Rc::default();
        let mut multi = MultiOperation::new(
            "checks",
            "",
            OperationKind::Validator,
            Kwargs::new(),
            vec![
                child("c1", &calls, Flow::Continue, true),
                child("c2", &calls, Flow::Continue, false),
            ],
        )
        .unwrap();

        let err = multi
            .apply_children(&mut holder(), &mut Session::default(), true)
            .unwrap_err();
        assert!(matches!(err, OperationError::Child { ref child, .. } if child == "c1"));
        assert!(!calls.borrow().iter().any(|c| c == "run c2"));
    }

    #[test]
    fn test_as_operation_terminates() {
        let calls: Calls = Rc::default();
        let mut multi = MultiOperation::new(
            "checks",
            "",
            OperationKind::Validator,
            Kwargs::new(),
            vec![child("c1", &calls, Flow::Terminate, false)],
        )
        .unwrap();

        let info = multi.apply(&mut holder(), &mut Session::default()).unwrap();
        assert!(info.has_run());
        assert!(info.terminate);
    }
}
