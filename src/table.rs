// Copyright 2025 Vectable Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Table handles and row values.
//!
//! [`Table`] is the caller-facing handle. The storage engine behind it is
//! reached only through the narrow [`BaseTable`] interface (schema lookup,
//! row counting, index existence checks, index creation), so any transport
//! implementing [`BaseTable`] can back a table, and tests can substitute an
//! in-process stub.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use snafu::ensure;

use crate::error::{self, Result};
use crate::index::{IndexBuilder, IndexKind, IndexRequest};
use crate::schema::{LogicalType, Schema};

/// The narrow interface a storage engine exposes to this client.
///
/// Implementations own transport, authentication and the actual index
/// algorithms; errors they report are passed through verbatim as
/// [`Error::Engine`](crate::Error::Engine).
#[async_trait]
pub trait BaseTable: fmt::Debug + fmt::Display + Send + Sync {
    /// Get the name of the table.
    fn name(&self) -> &str;

    /// Current persisted schema of the table.
    async fn schema(&self) -> Result<Schema>;

    /// Count the number of rows in this table.
    ///
    /// * `filter` if present, only count rows matching the filter
    async fn count_rows(&self, filter: Option<String>) -> Result<usize>;

    /// Whether an index of `kind` exists on `column`.
    async fn index_exists(&self, column: &str, kind: IndexKind) -> Result<bool>;

    /// Submit an index build.
    ///
    /// The request arrives fully resolved; `replace` tells the engine to drop
    /// and rebuild an existing index of the same kind on the same column.
    async fn create_index(&self, request: IndexRequest) -> Result<()>;
}

/// A handle to a table in the store.
///
/// Handles are cheap to clone and share the underlying connection. All remote
/// effects happen inside the async methods; constructing builders from a
/// handle performs no I/O.
#[derive(Clone, Debug)]
pub struct Table {
    inner: Arc<dyn BaseTable>,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Table {
    /// Wrap an engine-side table implementation in a handle.
    pub fn new(inner: Arc<dyn BaseTable>) -> Self {
        Self { inner }
    }

    /// Get the name of the table.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Get the schema of the table.
    pub async fn schema(&self) -> Result<Schema> {
        self.inner.schema().await
    }

    /// Count the number of rows in this table.
    ///
    /// # Arguments
    ///
    /// * `filter` if present, only count rows matching the filter
    pub async fn count_rows(&self, filter: Option<String>) -> Result<usize> {
        self.inner.count_rows(filter).await
    }

    /// Create an index on a column of this table.
    ///
    /// Returns a builder: pick the target column and replace policy here,
    /// then the index family (scalar or vector), then the concrete kind, and
    /// finally `execute` the chain. Nothing is sent to the engine until
    /// `execute`; an invalid configuration fails there with a deterministic
    /// error before any build work starts.
    pub fn create_index(&self) -> IndexBuilder {
        IndexBuilder::new(self.inner.clone())
    }
}

/// Type-safe value wrapper for row data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Days since the Unix epoch.
    Date(i32),
    /// Microseconds since the Unix epoch.
    TimestampMicros(i64),
    /// Fixed length embedding vector.
    Vector(Vec<f32>),
    List(Vec<Value>),
    Struct(Vec<Value>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the string value as a str slice (zero-copy).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get the vector value as a slice (zero-copy).
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    fn type_description(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Date(_) => "date32",
            Value::TimestampMicros(_) => "timestamp[us]",
            Value::Vector(_) => "vector",
            Value::List(_) => "list",
            Value::Struct(_) => "struct",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Vector(v)
    }
}

/// A data row matching a [`Schema`] positionally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a new empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row directly from values.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Add a value to the row.
    pub fn add_value(mut self, value: Value) -> Self {
        self.values.push(value);
        self
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Validate this row against `schema`.
    ///
    /// Checks arity, nullability and value shape positionally. A vector value
    /// must match the declared fixed length exactly; over- and under-length
    /// vectors are rejected.
    pub fn check(&self, schema: &Schema) -> Result<()> {
        ensure!(
            self.values.len() == schema.fields().len(),
            error::InvalidColumnCountSnafu {
                expected: schema.fields().len(),
                actual: self.values.len(),
            }
        );
        for (field, value) in schema.fields().iter().zip(&self.values) {
            check_value(&field.name, &field.logical_type, field.nullable, value)?;
        }
        Ok(())
    }
}

fn check_value(field: &str, logical: &LogicalType, nullable: bool, value: &Value) -> Result<()> {
    if matches!(value, Value::Null) {
        ensure!(nullable, error::UnexpectedNullSnafu { field });
        return Ok(());
    }
    match (logical, value) {
        (LogicalType::Int64, Value::Int64(_))
        | (LogicalType::Float32, Value::Float32(_))
        | (LogicalType::Float64, Value::Float64(_))
        | (LogicalType::Utf8, Value::String(_))
        | (LogicalType::Date32, Value::Date(_))
        | (LogicalType::TimestampMicros { .. }, Value::TimestampMicros(_)) => Ok(()),
        (LogicalType::FixedSizeList(element, dim), Value::Vector(values))
            if element.is_floating() =>
        {
            ensure!(
                values.len() == *dim as usize,
                error::InvalidVectorLengthSnafu {
                    field,
                    expected: *dim,
                    actual: values.len(),
                }
            );
            Ok(())
        }
        (LogicalType::List(element), Value::List(values)) => {
            // List items are nullable, matching the materialized item field.
            for value in values {
                check_value(field, element, true, value)?;
            }
            Ok(())
        }
        (LogicalType::Struct(fields), Value::Struct(values)) => {
            ensure!(
                fields.len() == values.len(),
                error::InvalidColumnCountSnafu {
                    expected: fields.len(),
                    actual: values.len(),
                }
            );
            for (field, value) in fields.iter().zip(values) {
                check_value(&field.name, &field.logical_type, field.nullable, value)?;
            }
            Ok(())
        }
        _ => error::TypeMismatchSnafu {
            field,
            expected: logical.to_string(),
            actual: value.type_description(),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{DeclaredType, FieldDecl, RecordType};

    fn sample_schema() -> Schema {
        RecordType::new(vec![
            FieldDecl::new("id", DeclaredType::Int),
            FieldDecl::new("vector", DeclaredType::Vector { dim: 8 }),
            FieldDecl::new("note", DeclaredType::Optional(Box::new(DeclaredType::Text))),
        ])
        .to_schema()
        .unwrap()
    }

    fn sample_vector(dim: usize) -> Vec<f32> {
        (0..dim).map(|i| i as f32).collect()
    }

    #[test]
    fn test_row_check_accepts_matching_row() {
        let schema = sample_schema();
        let row = Row::new()
            .add_value(Value::Int64(1))
            .add_value(Value::Vector(sample_vector(8)))
            .add_value(Value::from("hello"));
        row.check(&schema).expect("row should validate");
    }

    #[test]
    fn test_row_check_rejects_wrong_arity() {
        let schema = sample_schema();
        let row = Row::from_values(vec![Value::Int64(1)]);
        let err = row.check(&schema).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidColumnCount {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_row_check_null_handling() {
        let schema = sample_schema();

        // Nullable field accepts null.
        let row = Row::from_values(vec![
            Value::Int64(1),
            Value::Vector(sample_vector(8)),
            Value::Null,
        ]);
        row.check(&schema).expect("null note should validate");

        // Non-nullable field rejects null.
        let row = Row::from_values(vec![
            Value::Null,
            Value::Vector(sample_vector(8)),
            Value::Null,
        ]);
        let err = row.check(&schema).unwrap_err();
        assert!(matches!(err, Error::UnexpectedNull { field, .. } if field == "id"));
    }

    #[test]
    fn test_row_check_vector_length() {
        let schema = sample_schema();

        for dim in [7, 9] {
            let row = Row::from_values(vec![
                Value::Int64(1),
                Value::Vector(sample_vector(dim)),
                Value::Null,
            ]);
            let err = row.check(&schema).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::InvalidVectorLength {
                        expected: 8,
                        actual,
                        ..
                    } if actual == dim
                ),
                "vector of length {dim} should be rejected"
            );
        }

        let row = Row::from_values(vec![
            Value::Int64(1),
            Value::Vector(sample_vector(8)),
            Value::Null,
        ]);
        row.check(&schema).expect("exact length should validate");
    }

    #[test]
    fn test_row_check_type_mismatch() {
        let schema = sample_schema();
        let row = Row::from_values(vec![
            Value::from("not an id"),
            Value::Vector(sample_vector(8)),
            Value::Null,
        ]);
        let err = row.check(&schema).unwrap_err();
        match err {
            Error::TypeMismatch {
                field,
                expected,
                actual,
                ..
            } => {
                assert_eq!(field, "id");
                assert_eq!(expected, "int64");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_row_check_nested_values() {
        let schema = RecordType::new(vec![
            FieldDecl::new("tags", DeclaredType::List(Box::new(DeclaredType::Text))),
            FieldDecl::new(
                "st",
                DeclaredType::Struct(RecordType::new(vec![
                    FieldDecl::new("a", DeclaredType::Text),
                    FieldDecl::new("b", DeclaredType::Optional(Box::new(DeclaredType::Float))),
                ])),
            ),
        ])
        .to_schema()
        .unwrap();

        let row = Row::from_values(vec![
            Value::List(vec![Value::from("x"), Value::Null]),
            Value::Struct(vec![Value::from("a"), Value::Null]),
        ]);
        row.check(&schema).expect("nested row should validate");

        let row = Row::from_values(vec![
            Value::List(vec![Value::Int64(1)]),
            Value::Struct(vec![Value::from("a"), Value::Null]),
        ]);
        let err = row.check(&schema).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { field, .. } if field == "tags"));
    }
}
