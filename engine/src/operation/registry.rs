//! Explicit name -> constructor table.
//!
//! Pipelines refer to operations by name. Every operation the engine knows
//! about is registered here once at startup; there is no discovery.

use serde::Serialize;
use std::collections::BTreeMap;

use super::builtin::{self, Builtin, NotEmpty, RequiredColumns, UniqueRows};
use super::multi::{ChildFactory, MultiOperation};
use super::{Kwargs, Operation, OperationKind};
use crate::error::{ConfigError, ConfigResult};

/// Builds a configured operation from its kwargs.
pub type Factory = fn(&Kwargs) -> ConfigResult<Box<dyn Operation>>;

/// A single registered operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub kind: OperationKind,
    pub description: &'static str,
    /// Default kwargs, as listed in pipeline templates.
    pub defaults: fn() -> Kwargs,
    /// Rejects kwargs keys the operation does not know.
    pub build: Factory,
    /// Ignores unknown keys; used for children of composites.
    pub build_shared: Factory,
}

#[derive(Debug, Clone)]
struct CompositeSpec {
    kind: OperationKind,
    description: String,
    children: Vec<&'static str>,
}

#[derive(Debug, Clone)]
enum Entry {
    Single(OperationSpec),
    Composite(CompositeSpec),
}

/// One row of `curator operations`.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: OperationKind,
    pub description: String,
    pub defaults: Kwargs,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    entries: BTreeMap<String, Entry>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the whole built-in catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in builtin::specs() {
            registry.register(spec);
        }
        registry.insert_composite(
            "basic_checks",
            OperationKind::Validator,
            "Required columns, blank cells and duplicate rows",
            vec![
                RequiredColumns::NAME,
                NotEmpty::NAME,
                UniqueRows::NAME,
            ],
        );
        registry
    }

    /// Add or replace a single operation.
    pub fn register(&mut self, spec: OperationSpec) {
        log::debug!("Registering operation {}", spec.name);
        self.entries.insert(spec.name.to_string(), Entry::Single(spec));
    }

    /// Add a composite of already registered single operations.
    pub fn register_composite(
        &mut self,
        name: &str,
        kind: OperationKind,
        description: &str,
        children: &[&str],
    ) -> ConfigResult<()> {
        let mut resolved = Vec::with_capacity(children.len());
        for child in children {
            match self.entries.get(*child) {
                Some(Entry::Single(spec)) => resolved.push(spec.name),
                Some(Entry::Composite(_)) => {
                    return Err(ConfigError::InvalidKwargs {
                        operation: name.to_string(),
                        message: format!("child '{}' is itself a composite", child),
                    })
                }
                None => return Err(ConfigError::UnknownOperation(child.to_string())),
            }
        }

        self.insert_composite(name, kind, description, resolved);
        Ok(())
    }

    fn insert_composite(
        &mut self,
        name: &str,
        kind: OperationKind,
        description: &str,
        children: Vec<&'static str>,
    ) {
        log::debug!("Registering composite {} ({})", name, children.join(", "));
        self.entries.insert(
            name.to_string(),
            Entry::Composite(CompositeSpec {
                kind,
                description: description.to_string(),
                children,
            }),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Construct the operation registered under `name`.
    pub fn build(&self, name: &str, kwargs: &Kwargs) -> ConfigResult<Box<dyn Operation>> {
        match self.entry(name)? {
            Entry::Single(spec) => (spec.build)(kwargs),
            Entry::Composite(composite) => {
                builtin::reject_unknown_keys(name, kwargs, &self.defaults(name)?)?;
                let children = composite
                    .children
                    .iter()
                    .map(|child| self.child_factory(child))
                    .collect::<ConfigResult<Vec<_>>>()?;
                let multi = MultiOperation::new(
                    name,
                    composite.description.clone(),
                    composite.kind,
                    kwargs.clone(),
                    children,
                )?;
                Ok(Box::new(multi))
            }
        }
    }

    /// Default kwargs; a composite merges the defaults of its children.
    pub fn defaults(&self, name: &str) -> ConfigResult<Kwargs> {
        match self.entry(name)? {
            Entry::Single(spec) => Ok((spec.defaults)()),
            Entry::Composite(composite) => {
                let mut merged = Kwargs::new();
                for child in &composite.children {
                    merged.extend(self.defaults(child)?);
                }
                Ok(merged)
            }
        }
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let (kind, description, children) = match entry {
                    Entry::Single(spec) => (spec.kind, spec.description.to_string(), Vec::new()),
                    Entry::Composite(c) => (
                        c.kind,
                        c.description.clone(),
                        c.children.iter().map(|s| s.to_string()).collect(),
                    ),
                };
                CatalogEntry {
                    name: name.clone(),
                    kind,
                    description,
                    defaults: self.defaults(name).unwrap_or_default(),
                    children,
                }
            })
            .collect()
    }

    fn entry(&self, name: &str) -> ConfigResult<&Entry> {
        self.entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownOperation(name.to_string()))
    }

    fn child_factory(&self, name: &str) -> ConfigResult<(String, ChildFactory)> {
        match self.entry(name)? {
            Entry::Single(spec) => {
                let build = spec.build_shared;
                let factory: ChildFactory = Box::new(move |kwargs: &Kwargs| build(kwargs));
                Ok((spec.name.to_string(), factory))
            }
            Entry::Composite(_) => Err(ConfigError::UnknownOperation(name.to_string())),
        }
    }
}
