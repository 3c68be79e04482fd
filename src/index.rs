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

//! Staged construction of index-creation requests.
//!
//! [`Table::create_index`](crate::table::Table::create_index) returns an
//! [`IndexBuilder`] holding the target column (if any) and the replace policy.
//! Selecting the index family narrows it to a [`ScalarIndexBuilder`] or a
//! [`VectorIndexBuilder`], and selecting the concrete kind produces the final
//! builder whose `execute` resolves the target column, enforces the replace
//! policy, fills in parameter defaults and submits the finished
//! [`IndexRequest`] to the engine. Every step before `execute` is a pure local
//! state transition; `execute` is the only point that touches the engine, so
//! the whole chain is validated before any expensive remote work starts.

use std::cmp::max;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};

use crate::error::{self, Error, Result};
use crate::schema::{FieldDescriptor, LogicalType, Schema};
use crate::table::BaseTable;

/// Distance metric used to compare vectors when building and searching a
/// vector index.
///
/// The metric used to build an index must match the metric used to search it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceType {
    /// Euclidean distance.
    #[default]
    L2,
    /// Cosine distance.
    Cosine,
    /// Dot product.
    Dot,
}

impl FromStr for DistanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "l2" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            _ => error::InvalidDistanceTypeSnafu { value: s }.fail(),
        }
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L2 => write!(f, "l2"),
            Self::Cosine => write!(f, "cosine"),
            Self::Dot => write!(f, "dot"),
        }
    }
}

/// Kinds of scalar index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    #[serde(rename = "btree")]
    BTree,
}

/// Kinds of vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    #[serde(rename = "ivf_pq")]
    IvfPq,
}

/// The (family, kind) pair identifying what sort of index lives on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Scalar(ScalarKind),
    Vector(VectorKind),
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ScalarKind::BTree) => write!(f, "BTREE"),
            Self::Vector(VectorKind::IvfPq) => write!(f, "IVF_PQ"),
        }
    }
}

/// Training parameters of an IVF_PQ index, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvfPqParams {
    pub distance_type: DistanceType,
    pub num_partitions: u32,
    pub num_sub_vectors: u32,
    pub num_bits: u32,
    pub sample_rate: u32,
    pub max_iterations: u32,
}

/// Kind-specific parameters carried by a finalized request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexParams {
    #[serde(rename = "btree")]
    BTree,
    #[serde(rename = "ivf_pq")]
    IvfPq(IvfPqParams),
}

impl IndexParams {
    pub fn kind(&self) -> IndexKind {
        match self {
            Self::BTree => IndexKind::Scalar(ScalarKind::BTree),
            Self::IvfPq(_) => IndexKind::Vector(VectorKind::IvfPq),
        }
    }
}

/// A finalized index-creation request.
///
/// The column is already resolved and all parameters carry concrete values;
/// the engine receives the request as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub column: String,
    pub params: IndexParams,
    pub replace: bool,
}

impl IndexRequest {
    pub fn kind(&self) -> IndexKind {
        self.params.kind()
    }

    /// JSON wire form of the request, for transports that submit requests as
    /// serialized metadata.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context(error::SerializeRequestSnafu)
    }
}

/// Builder for creating some kind of index.
///
/// Holds the parts common to every index: the target column (optional until
/// finalization) and the replace policy. The methods selecting the index
/// family return builders specific to that family.
pub struct IndexBuilder {
    parent: Arc<dyn BaseTable>,
    pub(crate) column: Option<String>,
    pub(crate) replace: bool,
}

impl IndexBuilder {
    pub(crate) fn new(parent: Arc<dyn BaseTable>) -> Self {
        Self {
            parent,
            column: None,
            replace: false,
        }
    }

    /// The column to index.
    ///
    /// Required for a scalar index. Optional for a vector index: when absent,
    /// the column is inferred at execution time, provided the table has
    /// exactly one vector column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Whether to replace an existing index on the same column.
    ///
    /// If not set, an existing index is left untouched and execution fails
    /// instead of rebuilding it.
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Create a scalar index.
    ///
    /// Scalar indices are exact lookup structures over ordinary column values,
    /// used to satisfy filters like `x = 10` or `x > 10` quickly.
    pub fn scalar(self) -> ScalarIndexBuilder {
        ScalarIndexBuilder::new(self.parent.clone(), self)
    }

    /// Create a vector index.
    ///
    /// Vector indices are approximate structures over fixed size float list
    /// columns, used to find rows similar to a query vector.
    pub fn vector(self) -> VectorIndexBuilder {
        VectorIndexBuilder::new(self.parent.clone(), self)
    }
}

/// Builder for creating some kind of scalar index.
pub struct ScalarIndexBuilder {
    parent: Arc<dyn BaseTable>,
    common: IndexBuilder,
}

impl ScalarIndexBuilder {
    pub(crate) fn new(parent: Arc<dyn BaseTable>, common: IndexBuilder) -> Self {
        Self { parent, common }
    }

    /// Create a btree index.
    ///
    /// A btree index keeps a sorted copy of the column and does best on
    /// columns with mostly distinct values and highly selective queries.
    pub fn btree(self) -> BTreeIndexBuilder {
        BTreeIndexBuilder::new(self.parent, self.common)
    }
}

/// Builder for creating some kind of vector index.
pub struct VectorIndexBuilder {
    parent: Arc<dyn BaseTable>,
    common: IndexBuilder,
}

impl VectorIndexBuilder {
    pub(crate) fn new(parent: Arc<dyn BaseTable>, common: IndexBuilder) -> Self {
        Self { parent, common }
    }

    /// Create an IVF_PQ index.
    ///
    /// Vectors are grouped into partitions of similar vectors (IVF) and each
    /// vector is stored as a product-quantized code (PQ). `num_partitions`
    /// trades off the two phases of a search; `num_sub_vectors` trades index
    /// size against accuracy.
    pub fn ivf_pq(self) -> IvfPqIndexBuilder {
        IvfPqIndexBuilder::new(self.parent, self.common)
    }
}

/// Builder for creating a btree index.
pub struct BTreeIndexBuilder {
    parent: Arc<dyn BaseTable>,
    common: IndexBuilder,
}

impl BTreeIndexBuilder {
    pub(crate) fn new(parent: Arc<dyn BaseTable>, common: IndexBuilder) -> Self {
        Self { parent, common }
    }

    /// Build the btree index.
    ///
    /// The column must have been specified up front; scalar indexes are never
    /// inferred. If an index already exists on the column and `replace` was
    /// not set, the call fails before anything is submitted to the engine.
    /// Whether the column exists and supports a btree index is checked by the
    /// engine.
    pub async fn execute(self) -> Result<()> {
        let column = self.common.column.context(error::MissingColumnSnafu)?;
        let kind = IndexKind::Scalar(ScalarKind::BTree);

        if !self.common.replace && self.parent.index_exists(&column, kind).await? {
            return error::IndexAlreadyExistsSnafu { column, kind }.fail();
        }

        log::debug!(
            "creating btree index on column '{}' of table '{}'",
            column,
            self.parent.name()
        );
        self.parent
            .create_index(IndexRequest {
                column,
                params: IndexParams::BTree,
                replace: self.common.replace,
            })
            .await
    }
}

/// Builder for creating an IVF_PQ index.
pub struct IvfPqIndexBuilder {
    parent: Arc<dyn BaseTable>,
    common: IndexBuilder,
    distance_type: DistanceType,
    num_partitions: Option<u32>,
    num_sub_vectors: Option<u32>,
    sample_rate: u32,
    max_iterations: u32,
}

impl IvfPqIndexBuilder {
    pub(crate) fn new(parent: Arc<dyn BaseTable>, common: IndexBuilder) -> Self {
        Self {
            parent,
            common,
            distance_type: DistanceType::default(),
            num_partitions: None,
            num_sub_vectors: None,
            sample_rate: 256,
            max_iterations: 50,
        }
    }

    /// [DistanceType] used to train the index. Defaults to [DistanceType::L2].
    pub fn distance_type(mut self, distance_type: DistanceType) -> Self {
        self.distance_type = distance_type;
        self
    }

    /// The number of IVF partitions to create.
    ///
    /// Defaults to the square root of the number of rows in the table.
    pub fn num_partitions(mut self, num_partitions: u32) -> Self {
        self.num_partitions = Some(num_partitions);
        self
    }

    /// Number of PQ sub-vectors.
    ///
    /// Defaults to the vector dimension divided by 16 (or by 8 when the
    /// dimension is not divisible by 16).
    pub fn num_sub_vectors(mut self, num_sub_vectors: u32) -> Self {
        self.num_sub_vectors = Some(num_sub_vectors);
        self
    }

    /// Sample rate for the kmeans training pass. Defaults to 256.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Max kmeans iterations when computing partitions. Defaults to 50.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Train the IVF_PQ index.
    ///
    /// Resolves the target column (inferring it when the table has exactly
    /// one vector column), enforces the replace policy against the existing
    /// indexes, fills in parameter defaults and submits the request. The
    /// existence check runs before any expensive work; training a vector
    /// index on a large table is slow.
    pub async fn execute(self) -> Result<()> {
        let schema = self.parent.schema().await?;
        let column = match self.common.column {
            Some(column) => column,
            None => default_vector_column(&schema)?.name.clone(),
        };
        let kind = IndexKind::Vector(VectorKind::IvfPq);

        if !self.common.replace && self.parent.index_exists(&column, kind).await? {
            return error::IndexAlreadyExistsSnafu { column, kind }.fail();
        }

        let num_partitions = match self.num_partitions {
            Some(n) => n,
            None => suggested_num_partitions(self.parent.count_rows(None).await?),
        };
        let num_sub_vectors = match self.num_sub_vectors {
            Some(n) => n,
            None => {
                let field = schema
                    .field_with_name(&column)
                    .context(error::ColumnNotFoundSnafu {
                        column: column.as_str(),
                    })?;
                match &field.logical_type {
                    LogicalType::FixedSizeList(element, dim) if element.is_floating() => {
                        suggested_num_sub_vectors(*dim as u32)
                    }
                    other => {
                        return error::NotAVectorColumnSnafu {
                            column,
                            data_type: other.to_string(),
                        }
                        .fail();
                    }
                }
            }
        };

        log::debug!(
            "creating ivf_pq index on column '{}' of table '{}' ({} partitions, {} sub-vectors)",
            column,
            self.parent.name(),
            num_partitions,
            num_sub_vectors
        );
        self.parent
            .create_index(IndexRequest {
                column,
                params: IndexParams::IvfPq(IvfPqParams {
                    distance_type: self.distance_type,
                    num_partitions,
                    num_sub_vectors,
                    // PQ currently always uses 8-bit codes.
                    num_bits: 8,
                    sample_rate: self.sample_rate,
                    max_iterations: self.max_iterations,
                }),
                replace: self.common.replace,
            })
            .await
    }
}

/// Pick the vector column to index when none was specified.
///
/// Inference is only safe when it is unambiguous: the schema must contain
/// exactly one fixed size float list column.
fn default_vector_column(schema: &Schema) -> Result<&FieldDescriptor> {
    let candidates = schema.vector_columns();
    if candidates.len() == 1 {
        Ok(candidates[0])
    } else {
        error::AmbiguousColumnSnafu {
            candidates: candidates.len(),
        }
        .fail()
    }
}

pub(crate) fn suggested_num_partitions(rows: usize) -> u32 {
    let num_partitions = (rows as f64).sqrt() as u32;
    max(1, num_partitions)
}

pub(crate) fn suggested_num_sub_vectors(dim: u32) -> u32 {
    if dim % 16 == 0 {
        dim / 16
    } else if dim % 8 == 0 {
        dim / 8
    } else {
        log::warn!(
            "The dimension of the vector is not divisible by 8 or 16, \
                which may cause performance degradation in PQ"
        );
        1
    }
}
