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

use snafu::{Location, Snafu};

use crate::index::IndexKind;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unsupported declared type for field '{}': {}", field, type_description))]
    UnsupportedType {
        field: String,
        type_description: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Invalid vector dimension {} for field '{}', the dimension must be positive",
        dim,
        field
    ))]
    InvalidVectorDimension {
        field: String,
        dim: i32,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("A column must be specified to create a scalar index"))]
    MissingColumn {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Found {} vector columns in the schema, please specify the column to index",
        candidates
    ))]
    AmbiguousColumn {
        candidates: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Index of kind {} already exists on column '{}'", kind, column))]
    IndexAlreadyExists {
        column: String,
        kind: IndexKind,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Column '{}' was not found in the table schema", column))]
    ColumnNotFound {
        column: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Column '{}' has type {}, expected a fixed size list of floats",
        column,
        data_type
    ))]
    NotAVectorColumn {
        column: String,
        data_type: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid distance type '{}'. Must be one of l2, cosine, or dot", value))]
    InvalidDistanceType {
        value: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid column count: expected {}, got {}", expected, actual))]
    InvalidColumnCount {
        expected: usize,
        actual: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Field '{}' is not nullable but the value is null", field))]
    UnexpectedNull {
        field: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Field '{}' expects {} but got {}", field, expected, actual))]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Invalid vector length for field '{}': expected {}, got {}",
        field,
        expected,
        actual
    ))]
    InvalidVectorLength {
        field: String,
        expected: i32,
        actual: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serialize index request"))]
    SerializeRequest {
        #[snafu(source)]
        error: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    // Failure reported by the storage engine, passed through verbatim.
    #[snafu(display("Engine error: {}", message))]
    Engine {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an arbitrary engine-side failure.
    pub fn engine(message: impl Into<String>) -> Self {
        EngineSnafu {
            message: message.into(),
        }
        .build()
    }

    /// Indicate if the error is retriable.
    ///
    /// Configuration and validation errors are deterministic; reissuing the
    /// same call cannot succeed. Only engine-side failures may be transient,
    /// and even those are left to the caller to retry.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }
}
