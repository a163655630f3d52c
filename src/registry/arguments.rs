//! Positional argument resolution.

use std::any::Any;
use std::sync::Arc;

use crate::registry::metadata::{ParamKind, ParameterSpec};
use crate::services::{ConstructionError, ServiceLocator, SharedService};

/// Named values captured from a path, in pattern declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    entries: Vec<(String, String)>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures holding a single `name = value` pair.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut captures = Self::new();
        captures.push(name, value);
        captures
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One resolved argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Path(String),
    Service(SharedService),
    /// No spec for this index, or the named capture was missing.
    Absent,
}

/// Positional arguments handed to a handler or constructor.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
}

impl Arguments {
    pub fn new(values: Vec<Argument>) -> Self {
        Self { values }
    }

    /// Legacy convention: every captured value, in declaration order.
    pub fn from_captures(captures: &Captures) -> Self {
        Self {
            values: captures
                .iter()
                .map(|(_, value)| Argument::Path(value.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    /// The string at `index`, if it is a path argument.
    pub fn path(&self, index: usize) -> Option<&str> {
        match self.values.get(index) {
            Some(Argument::Path(value)) => Some(value),
            _ => None,
        }
    }

    /// The service at `index`, if present and of type `T`.
    pub fn service<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        match self.values.get(index) {
            Some(Argument::Service(service)) => service.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build the argument list for `specs`.
///
/// Specs may arrive in any order; the list is sized by the highest index.
/// An empty spec list falls back to [`Arguments::from_captures`].
pub fn resolve_arguments(
    specs: &[ParameterSpec],
    captures: &Captures,
    locator: &ServiceLocator,
) -> Result<Arguments, ConstructionError> {
    if specs.is_empty() {
        return Ok(Arguments::from_captures(captures));
    }

    let len = specs.iter().map(|s| s.index + 1).max().unwrap_or_default();
    let mut values = vec![Argument::Absent; len];

    for spec in specs {
        values[spec.index] = match spec.kind {
            ParamKind::PathParam => spec
                .literal_name
                .as_deref()
                .and_then(|name| captures.get(name))
                .map(|value| Argument::Path(value.to_string()))
                .unwrap_or(Argument::Absent),
            ParamKind::InjectedService => match spec.service {
                Some(id) => Argument::Service(locator.get_or_create(id)?),
                None => Argument::Absent,
            },
        };
    }

    Ok(Arguments::new(values))
}
