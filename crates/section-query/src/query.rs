use sea_query::backend::{
    EscapeBuilder, OperLeftAssocDecider, PrecedenceDecider, QuotedBuilder, TableRefBuilder,
};
use sea_query::prepare::SqlWriter;
use sea_query::{BinOper, Oper, Quote, SimpleExpr, SubQueryStatement, Value};

use crate::types::DataType;

/// A rendered SQL statement with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<DataType>,
}

/// Placeholder style used when rendering statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `$1, $2, ...`
    Numbered,
    /// `?, ?, ...`
    Positional,
}

/// ``SeaQuery`` backend shared by every statement this crate renders.
///
/// Identifiers are double quoted, so path aliases such as `product:prices` are
/// valid table aliases on both `SQLite` and `PostgreSQL`.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    quote: Quote,
    placeholder: Placeholder,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(Placeholder::Numbered)
    }
}

impl QueryBuilder {
    /// Creates a backend with the given placeholder style.
    #[must_use]
    pub fn new(placeholder: Placeholder) -> Self {
        Self {
            quote: Quote::new(b'"'),
            placeholder,
        }
    }
}

impl QuotedBuilder for QueryBuilder {
    fn quote(&self) -> Quote {
        self.quote
    }
}

impl EscapeBuilder for QueryBuilder {}

impl TableRefBuilder for QueryBuilder {}

impl OperLeftAssocDecider for QueryBuilder {
    fn well_known_left_associative(&self, op: &BinOper) -> bool {
        // Same as sea-query 0.32.7 `common_well_known_left_associative`
        matches!(
            op,
            BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
        )
    }
}

impl PrecedenceDecider for QueryBuilder {
    fn inner_expr_well_known_greater_precedence(
        &self, inner: &SimpleExpr, _outer_oper: &Oper,
    ) -> bool {
        // Atoms and self-wrapping expressions go bare. A second pair of
        // parentheses around an `IN` list turns it into a row value.
        // Nested operators are always parenthesized.
        matches!(
            inner,
            SimpleExpr::Column(_)
                | SimpleExpr::Tuple(_)
                | SimpleExpr::Constant(_)
                | SimpleExpr::FunctionCall(_)
                | SimpleExpr::Value(_)
                | SimpleExpr::Keyword(_)
                | SimpleExpr::Case(_)
                | SimpleExpr::SubQuery(_, _)
        )
    }
}

impl sea_query::backend::QueryBuilder for QueryBuilder {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        match query {
            SubQueryStatement::SelectStatement(s) => self.prepare_select_statement(s, sql),
            SubQueryStatement::InsertStatement(s) => self.prepare_insert_statement(s, sql),
            SubQueryStatement::UpdateStatement(s) => self.prepare_update_statement(s, sql),
            SubQueryStatement::DeleteStatement(s) => self.prepare_delete_statement(s, sql),
            SubQueryStatement::WithStatement(s) => self.prepare_with_query(s, sql),
        }
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self);
    }

    fn placeholder(&self) -> (&str, bool) {
        match self.placeholder {
            Placeholder::Numbered => ("$", true),
            Placeholder::Positional => ("?", false),
        }
    }
}
