//! Read request options.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::metadata::EntityType;

/// Field filter text that stands for SQL `NULL`.
const NULL_KEYWORD: &str = "null";

/// A scalar filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Returns `true` for [`Scalar::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Reads the text `"null"` as [`Scalar::Null`].
    #[must_use]
    pub fn null_keyword(self) -> Self {
        match self {
            Self::Text(text) if text == NULL_KEYWORD => Self::Null,
            other => other,
        }
    }
}

impl From<Scalar> for sea_query::Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null => Self::String(None),
            Scalar::Bool(v) => Self::Bool(Some(v)),
            Scalar::Int(v) => Self::BigInt(Some(v)),
            Scalar::Float(v) => Self::Double(Some(v)),
            Scalar::Text(v) => Self::String(Some(Box::new(v))),
        }
    }
}

/// A filter value: one scalar (equality) or a list (membership).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl FilterValue {
    /// Reads the text `"null"` as null, alone or inside a list.
    #[must_use]
    pub fn null_keyword(self) -> Self {
        match self {
            Self::One(scalar) => Self::One(scalar.null_keyword()),
            Self::Many(list) => Self::Many(list.into_iter().map(Scalar::null_keyword).collect()),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }

            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    Self::One(value.into())
                }
            }

            impl From<Vec<$ty>> for FilterValue {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Many(values.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    &str => Text,
    String => Text,
}

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        Self::One(value)
    }
}

impl From<Vec<Scalar>> for FilterValue {
    fn from(values: Vec<Scalar>) -> Self {
        Self::Many(values)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// Options recognised by a section read.
///
/// Deserializes from the option object used by callers:
///
/// ```json
/// {
///     "section": "shop::Product",
///     "fetchFields": "name,slug,prices,price",
///     "field": { "name": ["Space Frikandel", "Ongewokkel"] },
///     "orderBy": { "prices:price": "ASC" },
///     "limit": 10
/// }
/// ```
///
/// Map-valued options keep the order they were given in, so the compiled query
/// is the same every time the same request is compiled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOptions {
    /// Root section to read from.
    pub section: EntityType,

    /// Comma-separated field paths to fetch.
    #[serde(default)]
    pub fetch_fields: String,

    /// Field path filters, ANDed together.
    #[serde(default, deserialize_with = "ordered")]
    pub field: Vec<(String, FilterValue)>,

    /// Slug of the root entry.
    #[serde(default)]
    pub slug: Option<String>,

    /// Primary key of the root entry.
    #[serde(default)]
    pub id: Option<i64>,

    /// Maximum number of rows.
    #[serde(default)]
    pub limit: Option<u64>,

    /// Number of rows to skip.
    #[serde(default)]
    pub offset: Option<u64>,

    /// Field path ordering, applied in sequence.
    #[serde(default, deserialize_with = "ordered")]
    pub order_by: Vec<(String, Direction)>,

    /// Only entries created before this instant.
    #[serde(default)]
    pub before: Option<DateTime<Utc>>,

    /// Only entries created after this instant.
    #[serde(default)]
    pub after: Option<DateTime<Utc>>,

    /// Root relationships that must contain the related id (inner joins).
    #[serde(default, deserialize_with = "ordered")]
    pub join: Vec<(String, i64)>,
}

impl ReadOptions {
    /// Creates options for reading `section` with no fields selected.
    #[must_use]
    pub fn new(section: impl Into<EntityType>) -> Self {
        Self {
            section: section.into(),
            fetch_fields: String::new(),
            field: Vec::new(),
            slug: None,
            id: None,
            limit: None,
            offset: None,
            order_by: Vec::new(),
            before: None,
            after: None,
            join: Vec::new(),
        }
    }

    /// Sets the comma-separated fetch fields.
    #[must_use]
    pub fn fetch_fields(mut self, fields: impl Into<String>) -> Self {
        self.fetch_fields = fields.into();
        self
    }

    /// Adds a field path filter.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.field.push((path.into(), value.into()));
        self
    }

    /// Filters on the root entry's slug.
    #[must_use]
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Filters on the root entry's primary key.
    #[must_use]
    pub const fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Adds an ORDER BY on a field path.
    #[must_use]
    pub fn order_by(mut self, path: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((path.into(), direction));
        self
    }

    /// Only entries created before `instant`.
    #[must_use]
    pub const fn before(mut self, instant: DateTime<Utc>) -> Self {
        self.before = Some(instant);
        self
    }

    /// Only entries created after `instant`.
    #[must_use]
    pub const fn after(mut self, instant: DateTime<Utc>) -> Self {
        self.after = Some(instant);
        self
    }

    /// Requires the root relationship `field` to contain the entry with `id`.
    #[must_use]
    pub fn join(mut self, field: impl Into<String>, id: i64) -> Self {
        self.join.push((field.into(), id));
        self
    }
}

// Deserialize a map into a vector of entries, keeping source order.
fn ordered<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of field paths")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or_default());
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}
