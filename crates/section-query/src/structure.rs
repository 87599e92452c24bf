//! The compiled, engine-independent shape of a section read.

use std::fmt;

use crate::filter::{Column, FilterSpec, Parameter};
use crate::join::JoinSpec;
use crate::metadata::EntityType;
use crate::options::Direction;
use crate::path::PATH_DELIMITER;

/// One selected column: `alias.field AS "alias:field"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSpec {
    pub alias: String,
    pub field: String,
    pub output_path: String,
}

impl ProjectionSpec {
    /// Projects `column`, naming the output after its alias and field.
    #[must_use]
    pub fn new(column: &Column) -> Self {
        Self {
            alias: column.alias.clone(),
            field: column.field.clone(),
            output_path: format!("{}{PATH_DELIMITER}{}", column.alias, column.field),
        }
    }

    /// The projected column.
    #[must_use]
    pub fn column(&self) -> Column {
        Column::new(&self.alias, &self.field)
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: Column,
    pub direction: Direction,
}

/// Everything needed to render a section read.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStructure {
    pub root: EntityType,
    pub root_table: String,
    pub root_alias: String,

    /// Joins, in discovery order.
    pub joins: Vec<JoinSpec>,

    /// Selected columns, in discovery order.
    pub projections: Vec<ProjectionSpec>,

    /// WHERE predicates, ANDed together.
    pub filters: Vec<FilterSpec>,

    pub order_by: Vec<OrderSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryStructure {
    /// Logical parameters in bind order: join restrictions first, then filters.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        let restricts = self.joins.iter().filter_map(|join| join.restrict.as_ref());
        restricts.chain(&self.filters).map(|filter| &filter.parameter)
    }

    /// Look up a join by alias.
    #[must_use]
    pub fn join(&self, alias: &str) -> Option<&JoinSpec> {
        self.joins.iter().find(|join| join.alias == alias)
    }

    /// Output paths of the projected columns.
    pub fn output_paths(&self) -> impl Iterator<Item = &str> {
        self.projections.iter().map(|projection| projection.output_path.as_str())
    }
}

/// The alias assigned to one walked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAlias {
    pub alias: String,
    pub entity: EntityType,
    pub primary_key: String,
}

/// Maps relationship paths (field names below the root) to their aliases.
///
/// Built once while walking the graph. Filters and ordering resolve their
/// field paths through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    root: PathAlias,
    entries: Vec<(Vec<String>, PathAlias)>,
}

impl AliasTable {
    /// Creates a table holding only the root alias.
    #[must_use]
    pub fn new(entity: &EntityType, primary_key: impl Into<String>) -> Self {
        Self {
            root: PathAlias {
                alias: entity.simplified(),
                entity: entity.clone(),
                primary_key: primary_key.into(),
            },
            entries: Vec::new(),
        }
    }

    /// The root entity's alias.
    #[must_use]
    pub const fn root(&self) -> &PathAlias {
        &self.root
    }

    /// The alias a path gets, whether or not it is registered.
    #[must_use]
    pub fn alias_for<S: AsRef<str>>(&self, hops: &[S]) -> String {
        let mut alias = self.root.alias.clone();
        for hop in hops {
            alias.push(PATH_DELIMITER);
            alias.push_str(hop.as_ref());
        }
        alias
    }

    /// Look up a registered path. The empty path is the root.
    #[must_use]
    pub fn get<S: AsRef<str>>(&self, hops: &[S]) -> Option<&PathAlias> {
        if hops.is_empty() {
            return Some(&self.root);
        }
        self.entries
            .iter()
            .find(|(path, _)| {
                path.len() == hops.len() && path.iter().zip(hops).all(|(a, b)| a == b.as_ref())
            })
            .map(|(_, alias)| alias)
    }

    /// Registers a path. Returns `false`, leaving the table unchanged, when the
    /// path is already registered.
    pub fn insert(&mut self, hops: Vec<String>, alias: PathAlias) -> bool {
        if self.get(&hops).is_some() {
            return false;
        }
        self.entries.push((hops, alias));
        true
    }

    /// Number of registered paths, excluding the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when only the root is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AliasTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root.alias)?;
        for (_, alias) in &self.entries {
            write!(f, ", {}", alias.alias)?;
        }
        Ok(())
    }
}
