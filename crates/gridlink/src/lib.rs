// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Client-side partitioned retrieval and execution layer for a
//! distributed, partitioned in-memory data grid.
//!
//! A data-processing job split into independent work units (partitions)
//! uses this crate to pull the slice of cluster-resident data relevant to
//! each unit and to run server-side queries or metadata probes scoped to
//! that slice, without each work unit touching raw cluster topology. The
//! actual wire protocol and the cluster-side execution engine are
//! supplied by the underlying data-grid client and reached through the
//! contracts in [`rpc`].

pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod metadata;
pub mod record;
pub mod rpc;
pub mod util;

#[cfg(test)]
pub(crate) mod test_utils;

/// Identifier of a physical partition of a region's data.
pub type BucketId = i32;
