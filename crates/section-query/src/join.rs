use sea_query::{Expr, JoinType, SimpleExpr};

use crate::filter::{FilterSpec, table_column};
use crate::metadata::EntityType;

/// Join types emitted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Relationship traversal; missing related rows yield nulls.
    Left,
    /// Existence join; rows without a matching related entry are dropped.
    Inner,
}

impl JoinKind {
    pub(crate) const fn into_join_type(self) -> JoinType {
        match self {
            Self::Left => JoinType::LeftJoin,
            Self::Inner => JoinType::InnerJoin,
        }
    }
}

/// How a joined alias is linked to its parent alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    /// The parent row holds the foreign key: `alias.key = parent.field`.
    Owner {
        parent: String,
        field: String,
        key: String,
    },
    /// The joined row holds the foreign key: `parent.key = alias.field`.
    Inverse {
        parent: String,
        key: String,
        field: String,
    },
}

impl JoinCondition {
    /// Alias of the table this join hangs off.
    #[must_use]
    pub fn parent(&self) -> &str {
        match self {
            Self::Owner { parent, .. } | Self::Inverse { parent, .. } => parent,
        }
    }
}

/// A single aliased join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    /// Table alias, unique within a query.
    pub alias: String,

    /// Section reached through the join; `None` for many-to-many link tables.
    pub target: Option<EntityType>,

    /// Joined table.
    pub table: String,

    pub kind: JoinKind,
    pub condition: JoinCondition,

    /// Extra predicate ANDed into the ON clause.
    pub restrict: Option<FilterSpec>,
}

impl JoinSpec {
    /// Creates a LEFT JOIN.
    #[must_use]
    pub fn left(
        alias: impl Into<String>, target: Option<EntityType>, table: impl Into<String>,
        condition: JoinCondition,
    ) -> Self {
        Self {
            alias: alias.into(),
            target,
            table: table.into(),
            kind: JoinKind::Left,
            condition,
            restrict: None,
        }
    }

    /// Sets the join kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Restricts the joined rows with an extra predicate.
    #[must_use]
    pub fn with_restrict(mut self, restrict: FilterSpec) -> Self {
        self.restrict = Some(restrict);
        self
    }

    /// The ON clause as a ``SeaQuery`` expression.
    pub(crate) fn on_expr(&self) -> SimpleExpr {
        let on = match &self.condition {
            JoinCondition::Owner { parent, field, key } => {
                let left = table_column(&self.alias, key);
                let right = table_column(parent, field);
                Expr::col(left).eq(Expr::col(right))
            }
            JoinCondition::Inverse { parent, key, field } => {
                let left = table_column(parent, key);
                let right = table_column(&self.alias, field);
                Expr::col(left).eq(Expr::col(right))
            }
        };

        match &self.restrict {
            Some(restrict) => on.and(restrict.to_expr()),
            None => on,
        }
    }
}
