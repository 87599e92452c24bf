//! Feeds a [`QueryStructure`] into a query builder.

use sea_query::{Alias, Order, SelectStatement, SimpleExpr};

use crate::filter::FilterSpec;
use crate::join::JoinSpec;
use crate::options::Direction;
use crate::query::{Query, QueryBuilder};
use crate::structure::{OrderSpec, ProjectionSpec, QueryStructure};
use crate::types::values_to_datatypes;

/// The query-builder capabilities needed to assemble a section read.
pub trait QueryTarget {
    /// Sets the root table and its alias.
    fn from(&mut self, table: &str, alias: &str);

    /// Adds a selected column.
    fn add_select(&mut self, projection: &ProjectionSpec);

    /// Adds a join.
    fn join(&mut self, join: &JoinSpec);

    /// Adds a predicate, ANDed with the others.
    fn and_where(&mut self, filter: &FilterSpec);

    /// Adds an ORDER BY term.
    fn order_by(&mut self, order: &OrderSpec);

    /// Limits the number of rows.
    fn set_max_results(&mut self, limit: u64);

    /// Skips rows.
    fn set_first_result(&mut self, offset: u64);
}

/// Assemble `structure` into `target`.
///
/// Calls are made in a fixed order: FROM, selects, joins, predicates, ORDER BY,
/// LIMIT, then OFFSET.
pub fn assemble<T: QueryTarget + ?Sized>(structure: &QueryStructure, target: &mut T) {
    target.from(&structure.root_table, &structure.root_alias);
    for projection in &structure.projections {
        target.add_select(projection);
    }
    for join in &structure.joins {
        target.join(join);
    }
    for filter in &structure.filters {
        target.and_where(filter);
    }
    for order in &structure.order_by {
        target.order_by(order);
    }
    if let Some(limit) = structure.limit {
        target.set_max_results(limit);
    }
    if let Some(offset) = structure.offset {
        target.set_first_result(offset);
    }
}

/// Row limit rendered when only an offset is set; `OFFSET` is not valid on
/// its own in `SQLite`.
const UNBOUNDED_LIMIT: u64 = i64::MAX.unsigned_abs();

/// [`QueryTarget`] rendering SQL through ``SeaQuery``.
#[derive(Debug, Clone)]
pub struct SqlTarget {
    statement: SelectStatement,
    table: String,
    builder: QueryBuilder,
    limited: bool,
}

impl Default for SqlTarget {
    fn default() -> Self {
        Self::new(QueryBuilder::default())
    }
}

impl SqlTarget {
    /// Creates an empty SELECT rendered with `builder`.
    #[must_use]
    pub fn new(builder: QueryBuilder) -> Self {
        Self {
            statement: sea_query::Query::select(),
            table: String::new(),
            builder,
            limited: false,
        }
    }

    /// Build the SELECT query.
    ///
    /// # Errors
    ///
    /// Returns an error if query values cannot be converted to data types.
    pub fn build(&self) -> anyhow::Result<Query> {
        let (sql, values) = self.statement.build(self.builder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = %self.table,
            sql = %sql,
            param_count = params.len(),
            "SqlTarget generated SQL"
        );

        Ok(Query { sql, params })
    }
}

impl QueryTarget for SqlTarget {
    fn from(&mut self, table: &str, alias: &str) {
        self.table = table.to_string();
        self.statement.from_as(Alias::new(table), Alias::new(alias));
    }

    fn add_select(&mut self, projection: &ProjectionSpec) {
        let column = SimpleExpr::Column(projection.column().column_ref());
        self.statement.expr_as(column, Alias::new(&projection.output_path));
    }

    fn join(&mut self, join: &JoinSpec) {
        self.statement.join_as(
            join.kind.into_join_type(),
            Alias::new(&join.table),
            Alias::new(&join.alias),
            join.on_expr(),
        );
    }

    fn and_where(&mut self, filter: &FilterSpec) {
        self.statement.and_where(filter.to_expr());
    }

    fn order_by(&mut self, order: &OrderSpec) {
        let direction = match order.direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        };
        self.statement.order_by(order.column.column_ref(), direction);
    }

    fn set_max_results(&mut self, limit: u64) {
        self.limited = true;
        self.statement.limit(limit);
    }

    fn set_first_result(&mut self, offset: u64) {
        if !self.limited {
            self.statement.limit(UNBOUNDED_LIMIT);
        }
        self.statement.offset(offset);
    }
}

impl QueryStructure {
    /// Render the structure as SQL.
    ///
    /// # Errors
    ///
    /// Returns an error if query values cannot be converted to data types.
    pub fn to_query(&self) -> anyhow::Result<Query> {
        let mut target = SqlTarget::default();
        assemble(self, &mut target);
        target.build()
    }
}
