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

//! Record type declarations and their columnar schema mapping.
//!
//! A [`RecordType`] describes a user declared record: an ordered list of named
//! fields over the closed [`DeclaredType`] variant. [`RecordType::to_schema`]
//! maps the declaration to the columnar [`Schema`] the storage engine
//! materializes, one [`FieldDescriptor`] per declared field. The mapping is
//! purely structural: identical declarations always produce identical schemas,
//! and schemas compare element-wise so a table can be verified against an
//! independently constructed expectation.

use std::fmt;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Result};

/// A declared field type, before schema mapping.
///
/// The variants cover the declaration surface accepted by the client:
/// primitive scalars, optionality in either spelling, homogeneous containers,
/// fixed size embedding vectors and nested records. `Map` and a bare `Null`
/// can be declared but have no columnar mapping and fail with
/// [`Error::UnsupportedType`](crate::Error::UnsupportedType).
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point number.
    Float,
    /// UTF-8 encoded text.
    Text,
    /// Calendar date without a time of day.
    Date,
    /// Point in time with microsecond precision, optionally carrying a
    /// timezone annotation.
    Timestamp { timezone: Option<String> },
    /// The type of a missing value. Only meaningful as a union member.
    Null,
    /// Explicitly optional value.
    Optional(Box<DeclaredType>),
    /// Union of declared types. A union of one type with `Null` (in either
    /// order) is the union spelling of an optional value.
    Union(Vec<DeclaredType>),
    /// Variable length homogeneous sequence.
    List(Box<DeclaredType>),
    /// Fixed arity tuple.
    Tuple(Vec<DeclaredType>),
    /// Fixed length embedding vector of `dim` elements.
    Vector { dim: i32 },
    /// A nested record.
    Struct(RecordType),
    /// Key/value mapping.
    Map {
        key: Box<DeclaredType>,
        value: Box<DeclaredType>,
    },
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Date => write!(f, "date"),
            Self::Timestamp { timezone: None } => write!(f, "timestamp"),
            Self::Timestamp {
                timezone: Some(timezone),
            } => write!(f, "timestamp<{timezone}>"),
            Self::Null => write!(f, "null"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
            Self::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Tuple(elements) => {
                write!(f, "tuple<")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, ">")
            }
            Self::Vector { dim } => write!(f, "vector<{dim}>"),
            Self::Struct(record) => {
                write!(f, "struct<")?;
                for (i, field) in record.fields().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.declared)?;
                }
                write!(f, ">")
            }
            Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

/// A single field of a record type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub declared: DeclaredType,
    /// Whether the declaration carries a default value for this field.
    pub has_default: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
            has_default: false,
        }
    }

    /// Mark this field as carrying a default value.
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// An ordered record type declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordType {
    fields: Vec<FieldDecl>,
}

impl RecordType {
    pub fn new(fields: Vec<FieldDecl>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Declared field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Map this declaration to the columnar schema the engine materializes.
    ///
    /// The mapping is total over the supported declaration surface and
    /// all-or-nothing: the first field with no mapping rule fails the whole
    /// call, naming the offending field and its declared type.
    pub fn to_schema(&self) -> Result<Schema> {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let (logical_type, nullable) = map_declared(&field.name, &field.declared)?;
                Ok(FieldDescriptor {
                    name: field.name.clone(),
                    logical_type,
                    nullable,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

/// Map one declared type to its logical type and nullability.
fn map_declared(field: &str, declared: &DeclaredType) -> Result<(LogicalType, bool)> {
    let logical = match declared {
        DeclaredType::Int => LogicalType::Int64,
        DeclaredType::Float => LogicalType::Float64,
        DeclaredType::Text => LogicalType::Utf8,
        DeclaredType::Date => LogicalType::Date32,
        DeclaredType::Timestamp { timezone } => LogicalType::TimestampMicros {
            timezone: timezone.clone(),
        },
        DeclaredType::Optional(inner) => {
            let (logical, _) = map_declared(field, inner)?;
            return Ok((logical, true));
        }
        DeclaredType::Union(members) => return map_union(field, declared, members),
        DeclaredType::List(element) => {
            let (element, _) = map_declared(field, element)?;
            LogicalType::List(Box::new(element))
        }
        DeclaredType::Tuple(elements) => return map_tuple(field, declared, elements),
        DeclaredType::Vector { dim } => {
            ensure!(
                *dim > 0,
                error::InvalidVectorDimensionSnafu { field, dim: *dim }
            );
            // Vector columns are always materialized as 32-bit floats.
            LogicalType::FixedSizeList(Box::new(LogicalType::Float32), *dim)
        }
        DeclaredType::Struct(record) => LogicalType::Struct(record.to_schema()?.into_fields()),
        DeclaredType::Null | DeclaredType::Map { .. } => {
            return error::UnsupportedTypeSnafu {
                field,
                type_description: declared.to_string(),
            }
            .fail();
        }
    };
    Ok((logical, false))
}

/// A union is only mappable as the union spelling of an optional value:
/// exactly one non-null member, in either order.
fn map_union(
    field: &str,
    whole: &DeclaredType,
    members: &[DeclaredType],
) -> Result<(LogicalType, bool)> {
    let non_null: Vec<&DeclaredType> = members
        .iter()
        .filter(|member| !matches!(member, DeclaredType::Null))
        .collect();
    let nullable = non_null.len() < members.len();
    match non_null.as_slice() {
        [single] => {
            let (logical, inner_nullable) = map_declared(field, single)?;
            Ok((logical, nullable || inner_nullable))
        }
        _ => error::UnsupportedTypeSnafu {
            field,
            type_description: whole.to_string(),
        }
        .fail(),
    }
}

/// A homogeneous tuple is stored as a variable length list; the arity is not
/// recorded in the schema.
fn map_tuple(
    field: &str,
    whole: &DeclaredType,
    elements: &[DeclaredType],
) -> Result<(LogicalType, bool)> {
    match elements.split_first() {
        Some((first, rest)) if rest.iter().all(|element| element == first) => {
            let (element, _) = map_declared(field, first)?;
            Ok((LogicalType::List(Box::new(element)), false))
        }
        _ => error::UnsupportedTypeSnafu {
            field,
            type_description: whole.to_string(),
        }
        .fail(),
    }
}

/// The columnar type assigned to a field, independent of the storage
/// representation.
///
/// The fixed length of a [`LogicalType::FixedSizeList`] is part of the type
/// identity: two vector columns with different declared lengths are distinct
/// types and compare unequal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalType {
    Int64,
    Float32,
    Float64,
    Utf8,
    Date32,
    TimestampMicros { timezone: Option<String> },
    List(Box<LogicalType>),
    FixedSizeList(Box<LogicalType>, i32),
    Struct(Vec<FieldDescriptor>),
}

impl LogicalType {
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Whether this is a vector column type, a fixed size list of floats.
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::FixedSizeList(element, _) if element.is_floating())
    }

    /// The equivalent Arrow data type.
    ///
    /// List items are named `item` and nullable, matching what the engine
    /// materializes for container columns.
    pub fn to_arrow(&self) -> DataType {
        match self {
            Self::Int64 => DataType::Int64,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
            Self::Date32 => DataType::Date32,
            Self::TimestampMicros { timezone } => DataType::Timestamp(
                TimeUnit::Microsecond,
                timezone.as_deref().map(Arc::from),
            ),
            Self::List(element) => {
                DataType::List(Arc::new(Field::new("item", element.to_arrow(), true)))
            }
            Self::FixedSizeList(element, dim) => DataType::FixedSizeList(
                Arc::new(Field::new("item", element.to_arrow(), true)),
                *dim,
            ),
            Self::Struct(fields) => {
                DataType::Struct(fields.iter().map(FieldDescriptor::to_arrow).collect())
            }
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64 => write!(f, "int64"),
            Self::Float32 => write!(f, "float32"),
            Self::Float64 => write!(f, "float64"),
            Self::Utf8 => write!(f, "utf8"),
            Self::Date32 => write!(f, "date32"),
            Self::TimestampMicros { timezone: None } => write!(f, "timestamp[us]"),
            Self::TimestampMicros {
                timezone: Some(timezone),
            } => write!(f, "timestamp[us, {timezone}]"),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::FixedSizeList(element, dim) => write!(f, "fixed_size_list<{element}, {dim}>"),
            Self::Struct(fields) => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.logical_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// A named, typed, nullable column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable,
        }
    }

    /// The equivalent Arrow field.
    pub fn to_arrow(&self) -> Field {
        Field::new(&self.name, self.logical_type.to_arrow(), self.nullable)
    }
}

/// An ordered columnar schema.
///
/// Order reflects declaration order and is significant: two schemas compare
/// equal iff their field descriptors are equal element-wise in name, type and
/// nullability.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<FieldDescriptor> {
        self.fields
    }

    /// Look up a field by name.
    pub fn field_with_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// The columns typed as fixed size float lists.
    pub fn vector_columns(&self) -> Vec<&FieldDescriptor> {
        self.fields
            .iter()
            .filter(|field| field.logical_type.is_vector())
            .collect()
    }

    /// The equivalent Arrow schema.
    pub fn to_arrow(&self) -> ArrowSchema {
        ArrowSchema::new(
            self.fields
                .iter()
                .map(FieldDescriptor::to_arrow)
                .collect::<Vec<_>>(),
        )
    }
}

impl From<Vec<FieldDescriptor>> for Schema {
    fn from(fields: Vec<FieldDescriptor>) -> Self {
        Self::new(fields)
    }
}
