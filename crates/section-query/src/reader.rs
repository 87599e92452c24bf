use serde_json::{Map, Value};

use crate::compile::compile;
use crate::error::{Error, Result};
use crate::executor::{Executor, Managers};
use crate::metadata::MetadataProvider;
use crate::options::ReadOptions;
use crate::query::Query;
use crate::shape::make_nested;
use crate::structure::QueryStructure;
use crate::types::Row;

/// Reads only the requested fields of a section, and its related sections, in
/// a single query.
#[derive(Debug, Clone)]
pub struct SectionReader<M, X> {
    metadata: M,
    managers: Managers<X>,
}

impl<M: MetadataProvider, X: Executor> SectionReader<M, X> {
    /// Creates a reader executing every section read on `executor`.
    #[must_use]
    pub fn new(metadata: M, executor: X) -> Self {
        Self::with_managers(metadata, Managers::new().with_default(executor))
    }

    /// Creates a reader resolving the executor per section.
    #[must_use]
    pub const fn with_managers(metadata: M, managers: Managers<X>) -> Self {
        Self { metadata, managers }
    }

    /// The metadata the reader compiles against.
    #[must_use]
    pub const fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Compile `options` without rendering or executing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFetchFieldsQuery`] when the request cannot be
    /// satisfied by the section metadata.
    pub fn compile(&self, options: &ReadOptions) -> Result<QueryStructure> {
        compile(&self.metadata, options)
    }

    /// Compile and render `options`, for callers adding their own execution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFetchFieldsQuery`] for unsatisfiable requests, or
    /// [`Error::Execution`] when a parameter cannot be rendered.
    pub fn build_query(&self, options: &ReadOptions) -> Result<Query> {
        Ok(self.compile(options)?.to_query()?)
    }

    /// Read flat rows keyed by output path, e.g. `product:prices:price`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] when no rows match, and passes through
    /// compile, manager and execution errors.
    pub fn read(&self, options: &ReadOptions) -> Result<Vec<Map<String, Value>>> {
        let query = self.build_query(options)?;
        let executor = self.managers.resolve(&options.section)?;
        let rows = executor.query(&query)?;

        tracing::debug!(section = %options.section, rows = rows.len(), "section read");
        if rows.is_empty() {
            return Err(Error::EntryNotFound);
        }
        Ok(rows.into_iter().map(Row::into_flat).collect())
    }

    /// Like [`Self::read`], with every row nested on its output paths.
    ///
    /// # Errors
    ///
    /// Same as [`Self::read`].
    pub fn read_nested(&self, options: &ReadOptions) -> Result<Vec<Map<String, Value>>> {
        Ok(self.read(options)?.iter().map(make_nested).collect())
    }
}
