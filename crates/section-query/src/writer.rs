use anyhow::Context;
use sea_query::{Alias, Expr, OnConflict, SimpleExpr, Value};

use crate::error::{Error, Result};
use crate::executor::{Executor, Managers};
use crate::metadata::{EntityType, FieldKind, MetadataProvider, SectionMetadata};
use crate::options::Scalar;
use crate::query::{Query, QueryBuilder};
use crate::types::values_to_datatypes;

/// Column values of one section entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub section: EntityType,
    pub values: Vec<(String, Scalar)>,
}

impl Entry {
    /// Creates an entry with no values.
    #[must_use]
    pub fn new(section: impl Into<EntityType>) -> Self {
        Self {
            section: section.into(),
            values: Vec::new(),
        }
    }

    /// Sets a column value, replacing any previous value.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((column, value)),
        }
        self
    }

    /// Look up a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.values.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }
}

/// Persists and removes section entries.
#[derive(Debug, Clone)]
pub struct SectionWriter<M, X> {
    metadata: M,
    managers: Managers<X>,
}

impl<M: MetadataProvider, X: Executor> SectionWriter<M, X> {
    /// Creates a writer executing every statement on `executor`.
    #[must_use]
    pub fn new(metadata: M, executor: X) -> Self {
        Self::with_managers(metadata, Managers::new().with_default(executor))
    }

    /// Creates a writer resolving the executor per section.
    #[must_use]
    pub const fn with_managers(metadata: M, managers: Managers<X>) -> Self {
        Self { metadata, managers }
    }

    /// Insert the entry, or update it when its primary key already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSection`] when the section is unknown or the entry
    /// sets a value that has no column, and passes through manager and execution
    /// errors.
    pub fn save(&self, entry: &Entry) -> Result<u64> {
        let section = self.section(&entry.section)?;
        for (column, _) in &entry.values {
            if !has_column(section, column) {
                return Err(Error::InvalidSection(format!(
                    "{} has no column {column}",
                    entry.section
                )));
            }
        }

        let query = upsert_query(section, entry)?;
        let affected = self.managers.resolve(&entry.section)?.exec(&query)?;
        tracing::debug!(section = %entry.section, affected, "saved entry");
        Ok(affected)
    }

    /// Delete the entry by primary key. Returns `false` when nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSection`] when the section is unknown or the entry
    /// has no primary key value, and passes through manager and execution errors.
    pub fn delete(&self, entry: &Entry) -> Result<bool> {
        let section = self.section(&entry.section)?;
        let Some(id) = entry.get(section.primary_key()) else {
            return Err(Error::InvalidSection(format!(
                "{} entry has no {} value",
                entry.section,
                section.primary_key()
            )));
        };

        let query = delete_query(section, id.clone())?;
        let affected = self.managers.resolve(&entry.section)?.exec(&query)?;
        tracing::debug!(section = %entry.section, affected, "deleted entry");
        Ok(affected > 0)
    }

    fn section(&self, entity: &EntityType) -> Result<&SectionMetadata> {
        self.metadata
            .section(entity)
            .ok_or_else(|| Error::InvalidSection(format!("section {entity} is not registered")))
    }
}

// Scalars, slugs and owning single-valued relationships are stored on the
// section's own table.
fn has_column(section: &SectionMetadata, column: &str) -> bool {
    if column == section.primary_key() {
        return true;
    }
    section.get(column).is_some_and(|field| match &field.kind {
        FieldKind::Scalar | FieldKind::Slug => true,
        FieldKind::Relationship(info) => info.owner && !info.is_plural(),
    })
}

fn upsert_query(section: &SectionMetadata, entry: &Entry) -> anyhow::Result<Query> {
    let table = section.table();
    let primary_key = section.primary_key();

    let mut statement = sea_query::Query::insert();
    statement.into_table(Alias::new(&table));

    let columns: Vec<_> = entry.values.iter().map(|(column, _)| Alias::new(column)).collect();
    let row: Vec<SimpleExpr> = entry
        .values
        .iter()
        .map(|(_, value)| SimpleExpr::Value(Value::from(value.clone())))
        .collect();
    statement.columns(columns);
    statement.values(row).context("building insert values")?;

    let updates: Vec<Alias> = entry
        .values
        .iter()
        .map(|(column, _)| column)
        .filter(|column| column.as_str() != primary_key)
        .map(Alias::new)
        .collect();
    let on_conflict = if updates.is_empty() {
        OnConflict::column(Alias::new(primary_key)).do_nothing().to_owned()
    } else {
        OnConflict::column(Alias::new(primary_key)).update_columns(updates).to_owned()
    };
    statement.on_conflict(on_conflict);

    let (sql, values) = statement.build(QueryBuilder::default());
    let params = values_to_datatypes(values)?;

    tracing::debug!(table = %table, sql = %sql, param_count = params.len(), "upsert generated SQL");
    Ok(Query { sql, params })
}

fn delete_query(section: &SectionMetadata, id: Scalar) -> anyhow::Result<Query> {
    let table = section.table();

    let mut statement = sea_query::Query::delete();
    statement.from_table(Alias::new(&table));
    statement.and_where(Expr::col(Alias::new(section.primary_key())).eq(Value::from(id)));

    let (sql, values) = statement.build(QueryBuilder::default());
    let params = values_to_datatypes(values)?;

    tracing::debug!(table = %table, sql = %sql, param_count = params.len(), "delete generated SQL");
    Ok(Query { sql, params })
}
