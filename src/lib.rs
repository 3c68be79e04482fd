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

//! Client library for the Vectable columnar vector store.
//!
//! This crate provides the client-side pieces that sit between user declared
//! record types and the storage engine:
//!
//! - [`schema`] maps a [`schema::RecordType`] declaration (fields, optional
//!   markers, containers, fixed size embedding vectors, nested records) to the
//!   columnar [`schema::Schema`] the engine materializes, with full structural
//!   equality and Arrow interop.
//! - [`index`] builds validated index-creation requests through a staged
//!   builder chain; column inference, replace gating and parameter defaulting
//!   all happen when the chain is executed, before anything expensive is
//!   submitted to the engine.
//! - [`table`] exposes the [`table::Table`] handle. The engine itself is
//!   reached only through the narrow [`table::BaseTable`] trait, so any
//!   transport (or an in-process stub in tests) can back a table.

pub mod error;
pub mod index;
pub mod schema;
pub mod table;

pub use error::{Error, Result};
pub use index::{
    DistanceType, IndexBuilder, IndexKind, IndexParams, IndexRequest, IvfPqParams, ScalarKind,
    VectorKind,
};
pub use schema::{DeclaredType, FieldDecl, FieldDescriptor, LogicalType, RecordType, Schema};
pub use table::{BaseTable, Row, Table, Value};
