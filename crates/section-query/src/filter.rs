use std::fmt;

use chrono::{DateTime, Utc};
use sea_query::{Alias, ColumnRef, Expr, ExprTrait, IntoIden, SimpleExpr, Value};

use crate::options::{FilterValue, Scalar};

/// A column on an aliased table, e.g. `"product:prices"."price"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// Table alias.
    pub alias: String,

    /// Field (column) name.
    pub field: String,
}

impl Column {
    /// Creates a column reference.
    #[must_use]
    pub fn new(alias: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            field: field.into(),
        }
    }

    pub(crate) fn column_ref(&self) -> ColumnRef {
        table_column(&self.alias, &self.field)
    }

    pub(crate) fn expr(&self) -> SimpleExpr {
        Expr::col(self.column_ref()).into()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.field)
    }
}

/// Comparison applied by a [`FilterSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `column = ?`, or `column IS NULL` for a null value.
    Eq,
    /// `column IN (?)`, ORed with `column IS NULL` when the list holds a null.
    In,
    /// `column < ?`
    Lt,
    /// `column > ?`
    Gt,
}

/// Value bound to a logical parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Scalar(Scalar),
    /// Array parameter; rendered as one placeholder per element.
    List(Vec<Scalar>),
    Instant(DateTime<Utc>),
}

impl ParameterValue {
    /// Returns `true` for a null scalar.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }
}

impl From<FilterValue> for ParameterValue {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::One(scalar) => Self::Scalar(scalar),
            FilterValue::Many(list) => Self::List(list),
        }
    }
}

impl From<Scalar> for ParameterValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<DateTime<Utc>> for ParameterValue {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Instant(instant)
    }
}

/// A numbered logical parameter. Indexes start at 1 and increase within a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub index: usize,
    pub value: ParameterValue,
}

/// A single predicate on an aliased column.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub column: Column,
    pub operator: Operator,
    pub parameter: Parameter,
}

impl FilterSpec {
    /// Equality for a scalar, membership for a list.
    #[must_use]
    pub fn matching(column: Column, index: usize, value: impl Into<ParameterValue>) -> Self {
        let value = value.into();
        let operator = match value {
            ParameterValue::List(_) => Operator::In,
            ParameterValue::Scalar(_) | ParameterValue::Instant(_) => Operator::Eq,
        };
        Self::new(column, operator, index, value)
    }

    /// Creates a predicate with an explicit operator.
    #[must_use]
    pub fn new(
        column: Column, operator: Operator, index: usize, value: impl Into<ParameterValue>,
    ) -> Self {
        Self {
            column,
            operator,
            parameter: Parameter {
                index,
                value: value.into(),
            },
        }
    }

    /// Convert the predicate into a ``SeaQuery`` expression.
    ///
    /// A null compiles to `IS NULL` and a list to membership, whatever the
    /// operator.
    pub(crate) fn to_expr(&self) -> SimpleExpr {
        let column = self.column.expr();

        let value = match &self.parameter.value {
            ParameterValue::Scalar(Scalar::Null) => return column.is_null(),
            ParameterValue::List(values) => return in_expr(column, values),
            ParameterValue::Scalar(scalar) => Value::from(scalar.clone()),
            ParameterValue::Instant(instant) => Value::from(*instant),
        };

        match self.operator {
            Operator::Eq | Operator::In => column.eq(value),
            Operator::Lt => column.lt(value),
            Operator::Gt => column.gt(value),
        }
    }
}

// Nulls never match `IN`, so they are split out into an `IS NULL` alternative.
fn in_expr(column: SimpleExpr, values: &[Scalar]) -> SimpleExpr {
    let has_null = values.iter().any(Scalar::is_null);
    let values: Vec<Value> =
        values.iter().filter(|v| !v.is_null()).cloned().map(Value::from).collect();

    match (has_null, values.is_empty()) {
        (true, true) => column.is_null(),
        (true, false) => column.clone().is_in(values).or(column.is_null()),
        (false, _) => column.is_in(values),
    }
}

pub(crate) fn table_column(table: &str, column: &str) -> ColumnRef {
    ColumnRef::TableColumn(Alias::new(table).into_iden(), Alias::new(column).into_iden())
}
