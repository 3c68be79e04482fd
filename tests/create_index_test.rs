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

// End-to-end tests for the index creation flow, driven through the public
// API against an in-process engine stub.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use vectable_client::{
    BaseTable, DeclaredType, DistanceType, Error, FieldDecl, IndexKind, IndexParams, IndexRequest,
    IvfPqParams, RecordType, Result, Schema, Table,
};

const DIM: i32 = 8;
const NROWS: usize = 256;

#[derive(Debug)]
struct StubTable {
    name: String,
    schema: Schema,
    rows: usize,
    fail_create: bool,
    indexes: Mutex<HashSet<(String, IndexKind)>>,
    requests: Mutex<Vec<IndexRequest>>,
}

impl StubTable {
    fn new(name: &str, record: &RecordType) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            schema: record.to_schema().expect("stub record should map"),
            rows: NROWS,
            fail_create: false,
            indexes: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &str, record: &RecordType) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            schema: record.to_schema().expect("stub record should map"),
            rows: NROWS,
            fail_create: true,
            indexes: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<IndexRequest> {
        self.requests.lock().clone()
    }
}

impl fmt::Display for StubTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StubTable({})", self.name)
    }
}

#[async_trait]
impl BaseTable for StubTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn count_rows(&self, _filter: Option<String>) -> Result<usize> {
        Ok(self.rows)
    }

    async fn index_exists(&self, column: &str, kind: IndexKind) -> Result<bool> {
        Ok(self.indexes.lock().contains(&(column.to_string(), kind)))
    }

    async fn create_index(&self, request: IndexRequest) -> Result<()> {
        if self.fail_create {
            return Err(Error::engine("index build rejected by storage"));
        }
        self.indexes
            .lock()
            .insert((request.column.clone(), request.kind()));
        self.requests.lock().push(request);
        Ok(())
    }
}

fn one_vector_record() -> RecordType {
    RecordType::new(vec![
        FieldDecl::new("id", DeclaredType::Int),
        FieldDecl::new("vector", DeclaredType::Vector { dim: DIM }),
    ])
}

fn two_vector_record() -> RecordType {
    RecordType::new(vec![
        FieldDecl::new("id", DeclaredType::Int),
        FieldDecl::new("vector1", DeclaredType::Vector { dim: DIM }),
        FieldDecl::new("vector2", DeclaredType::Vector { dim: DIM }),
    ])
}

#[tokio::test]
async fn test_create_scalar_index() {
    let stub = StubTable::new("some_table", &one_vector_record());
    let table = Table::new(stub.clone());

    // Can create.
    table
        .create_index()
        .column("id")
        .scalar()
        .btree()
        .execute()
        .await
        .expect("first btree build should succeed");

    // Can't recreate while the existing index is left untouched.
    let err = table
        .create_index()
        .column("id")
        .scalar()
        .btree()
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IndexAlreadyExists { .. }));
    assert!(err.to_string().contains("already exists"));
    // The conflict is detected before anything reaches the engine.
    assert_eq!(stub.requests().len(), 1);

    // Can recreate with replace.
    table
        .create_index()
        .column("id")
        .replace(true)
        .scalar()
        .btree()
        .execute()
        .await
        .expect("replacing build should succeed");
    assert_eq!(stub.requests().len(), 2);
    assert!(stub.requests()[1].replace);
}

#[tokio::test]
async fn test_scalar_index_requires_column() {
    let stub = StubTable::new("some_table", &one_vector_record());
    let table = Table::new(stub.clone());

    let err = table
        .create_index()
        .scalar()
        .btree()
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingColumn { .. }));
    assert!(err.to_string().contains("column must be specified"));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_create_vector_index_infers_column() {
    let stub = StubTable::new("some_table", &one_vector_record());
    let table = Table::new(stub.clone());

    table
        .create_index()
        .vector()
        .ivf_pq()
        .execute()
        .await
        .expect("vector build should succeed");

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].column, "vector");
    assert!(!requests[0].replace);
    assert_eq!(
        requests[0].params,
        IndexParams::IvfPq(IvfPqParams {
            distance_type: DistanceType::L2,
            // Defaults derived from the table: sqrt of the row count, and
            // the vector dimension divided down for PQ.
            num_partitions: 16,
            num_sub_vectors: 1,
            num_bits: 8,
            sample_rate: 256,
            max_iterations: 50,
        })
    );
}

#[tokio::test]
async fn test_create_vector_index_replace_gating() {
    let stub = StubTable::new("some_table", &one_vector_record());
    let table = Table::new(stub.clone());

    table
        .create_index()
        .vector()
        .ivf_pq()
        .execute()
        .await
        .expect("first vector build should succeed");

    let err = table
        .create_index()
        .vector()
        .ivf_pq()
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IndexAlreadyExists { .. }));
    assert_eq!(stub.requests().len(), 1);

    table
        .create_index()
        .replace(true)
        .vector()
        .ivf_pq()
        .execute()
        .await
        .expect("replacing vector build should succeed");
    assert_eq!(stub.requests().len(), 2);
}

#[tokio::test]
async fn test_create_vector_index_two_vector_cols() {
    let stub = StubTable::new("some_table", &two_vector_record());
    let table = Table::new(stub.clone());

    // Cannot infer with two candidate columns.
    let err = table
        .create_index()
        .vector()
        .ivf_pq()
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousColumn { candidates: 2, .. }));
    assert!(err.to_string().contains("specify the column to index"));

    // Can create when the column is specified.
    table
        .create_index()
        .column("vector1")
        .vector()
        .ivf_pq()
        .execute()
        .await
        .expect("explicit column build should succeed");
    assert_eq!(stub.requests()[0].column, "vector1");
}

#[tokio::test]
async fn test_ivf_pq_parameters_pass_through() {
    let stub = StubTable::new("some_table", &one_vector_record());
    let table = Table::new(stub.clone());

    table
        .create_index()
        .column("vector")
        .vector()
        .ivf_pq()
        .distance_type(DistanceType::Cosine)
        .num_partitions(4)
        .num_sub_vectors(2)
        .sample_rate(128)
        .max_iterations(10)
        .execute()
        .await
        .expect("parameterized build should succeed");

    assert_eq!(
        stub.requests()[0].params,
        IndexParams::IvfPq(IvfPqParams {
            distance_type: DistanceType::Cosine,
            num_partitions: 4,
            num_sub_vectors: 2,
            num_bits: 8,
            sample_rate: 128,
            max_iterations: 10,
        })
    );
}

#[tokio::test]
async fn test_engine_errors_pass_through() {
    let stub = StubTable::failing("some_table", &one_vector_record());
    let table = Table::new(stub.clone());

    let err = table
        .create_index()
        .column("id")
        .scalar()
        .btree()
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Engine { .. }));
    assert!(err.is_retriable());

    // Validation errors, by contrast, are deterministic.
    let err = table
        .create_index()
        .scalar()
        .btree()
        .execute()
        .await
        .unwrap_err();
    assert!(!err.is_retriable());
}
