//! Query execution capability and per-section manager resolution.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::metadata::EntityType;
use crate::query::Query;
use crate::types::Row;

/// Executes rendered queries against a database.
pub trait Executor: Send + Sync {
    /// Runs a statement returning rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement cannot be prepared or executed.
    fn query(&self, query: &Query) -> anyhow::Result<Vec<Row>>;

    /// Runs a statement returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement cannot be prepared or executed.
    fn exec(&self, query: &Query) -> anyhow::Result<u64>;
}

impl<T: Executor + ?Sized> Executor for &T {
    fn query(&self, query: &Query) -> anyhow::Result<Vec<Row>> {
        (**self).query(query)
    }

    fn exec(&self, query: &Query) -> anyhow::Result<u64> {
        (**self).exec(query)
    }
}

impl<T: Executor + ?Sized> Executor for Arc<T> {
    fn query(&self, query: &Query) -> anyhow::Result<Vec<Row>> {
        (**self).query(query)
    }

    fn exec(&self, query: &Query) -> anyhow::Result<u64> {
        (**self).exec(query)
    }
}

/// Executors keyed by the section namespaces they serve.
///
/// A section is served by the last registered manager with a namespace prefix
/// matching its identifier, falling back to the default manager.
#[derive(Debug, Clone)]
pub struct Managers<X> {
    managers: Vec<(Vec<String>, X)>,
    default: Option<X>,
}

impl<X> Default for Managers<X> {
    fn default() -> Self {
        Self {
            managers: Vec::new(),
            default: None,
        }
    }
}

impl<X> Managers<X> {
    /// Creates an empty set of managers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback manager.
    #[must_use]
    pub fn with_default(mut self, manager: X) -> Self {
        self.default = Some(manager);
        self
    }

    /// Registers a manager for sections within the given namespaces.
    #[must_use]
    pub fn with_manager<S: Into<String>>(
        mut self, namespaces: impl IntoIterator<Item = S>, manager: X,
    ) -> Self {
        let namespaces = namespaces.into_iter().map(Into::into).collect();
        self.managers.push((namespaces, manager));
        self
    }

    /// The manager serving `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoManagerFound`] when no namespace matches and there is
    /// no default manager.
    pub fn resolve(&self, entity: &EntityType) -> Result<&X> {
        let matched = self.managers.iter().rev().find(|(namespaces, _)| {
            namespaces.iter().any(|namespace| entity.as_str().starts_with(namespace.as_str()))
        });

        match matched {
            Some((_, manager)) => Ok(manager),
            None => self.default.as_ref().ok_or_else(|| Error::NoManagerFound(entity.clone())),
        }
    }
}
