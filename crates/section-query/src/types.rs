//! Wire-level values exchanged with an [`Executor`](crate::Executor).

use anyhow::{Result, bail};
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use sea_query::Values;
use serde_json::{Map, Value};

/// A single bound parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Int32(Option<i32>),
    Int64(Option<i64>),
    Uint32(Option<u32>),
    Uint64(Option<u64>),
    Float(Option<f32>),
    Double(Option<f64>),
    Str(Option<String>),
    Boolean(Option<bool>),
    Date(Option<String>),
    Time(Option<String>),
    Timestamp(Option<String>),
    Binary(Option<Vec<u8>>),
}

/// A named column value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column alias as returned by the database.
    pub name: String,

    /// Column value.
    pub value: DataType,
}

/// A result row, with fields in projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub fields: Vec<Field>,
}

impl Row {
    /// Look up a field value by column alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }

    /// Convert the row into a flat `output path -> value` map, keeping column order.
    #[must_use]
    pub fn into_flat(self) -> Map<String, Value> {
        self.fields.into_iter().map(|field| (field.name, field.value.into_json())).collect()
    }
}

impl DataType {
    /// Returns `true` for any of the `None` variants.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
                | Self::Date(None)
                | Self::Time(None)
                | Self::Timestamp(None)
        )
    }

    /// Convert into a JSON value. Binary data is base64 encoded.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Int32(Some(v)) => Value::Number(v.into()),
            Self::Int64(Some(v)) => Value::Number(v.into()),
            Self::Uint32(Some(v)) => Value::Number(v.into()),
            Self::Uint64(Some(v)) => Value::Number(v.into()),
            Self::Float(Some(v)) => {
                serde_json::Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
            }
            Self::Double(Some(v)) => {
                serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
            }
            Self::Str(Some(v))
            | Self::Date(Some(v))
            | Self::Time(Some(v))
            | Self::Timestamp(Some(v)) => Value::String(v),
            Self::Boolean(Some(v)) => Value::Bool(v),
            Self::Binary(Some(v)) => Value::String(Base64::encode_string(&v)),
            Self::Int32(None)
            | Self::Int64(None)
            | Self::Uint32(None)
            | Self::Uint64(None)
            | Self::Float(None)
            | Self::Double(None)
            | Self::Str(None)
            | Self::Boolean(None)
            | Self::Date(None)
            | Self::Time(None)
            | Self::Timestamp(None)
            | Self::Binary(None) => Value::Null,
        }
    }
}

// Outbound conversion (internal use only)
pub(crate) fn values_to_datatypes(values: Values) -> Result<Vec<DataType>> {
    values.into_iter().map(value_to_datatype).collect()
}

fn value_to_datatype(value: sea_query::Value) -> Result<DataType> {
    use sea_query::Value;

    let data_type = match value {
        Value::Bool(v) => DataType::Boolean(v),
        Value::TinyInt(v) => DataType::Int32(v.map(i32::from)),
        Value::SmallInt(v) => DataType::Int32(v.map(i32::from)),
        Value::Int(v) => DataType::Int32(v),
        Value::BigInt(v) => DataType::Int64(v),
        Value::TinyUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::SmallUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::Unsigned(v) => DataType::Uint32(v),
        Value::BigUnsigned(v) => DataType::Uint64(v),
        Value::Float(v) => DataType::Float(v),
        Value::Double(v) => DataType::Double(v),
        Value::String(v) => DataType::Str(v.map(|value| *value)),
        Value::ChronoDate(v) => DataType::Date(v.map(|value| value.to_string())),
        Value::ChronoTime(v) => DataType::Time(v.map(|value| value.to_string())),
        Value::ChronoDateTime(v) => DataType::Timestamp(v.map(|value| value.to_string())),
        Value::ChronoDateTimeUtc(v) => DataType::Timestamp(v.map(|value| {
            let dt: DateTime<Utc> = *value;
            dt.to_rfc3339()
        })),
        Value::Char(v) => DataType::Str(v.map(|ch| ch.to_string())),
        Value::Bytes(v) => DataType::Binary(v.map(|bytes| *bytes)),
        _ => {
            bail!("unsupported values require explicit conversion before building the query")
        }
    };
    Ok(data_type)
}
