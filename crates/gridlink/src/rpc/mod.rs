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

//! Contracts toward the underlying data-grid client runtime.
//!
//! The wire protocol, connection pooling, and retry policy all live below
//! these traits; this layer only builds [`ExecutionRequest`]s and consumes
//! the result stream a transport pushes into a [`ResultSink`].

pub mod functions;

use crate::BucketId;
use crate::cluster::ServerLocation;
use crate::error::{RemoteError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Identifiers of the remote functions this layer depends on. Stable
/// strings, matched by the registration on every cluster node and never
/// renegotiated per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionId {
    RetrieveRegionMetadata,
    RetrieveRegion,
    Query,
}

impl FunctionId {
    pub const ALL: [FunctionId; 3] = [
        FunctionId::RetrieveRegionMetadata,
        FunctionId::RetrieveRegion,
        FunctionId::Query,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            FunctionId::RetrieveRegionMetadata => "gridlink.RetrieveRegionMetadata",
            FunctionId::RetrieveRegion => "gridlink.RetrieveRegion",
            FunctionId::Query => "gridlink.Query",
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One remote function invocation, scoped to a region and a bucket
/// subset. Constructed fresh per call, never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub function: FunctionId,
    pub region_path: String,
    pub args: Vec<String>,
    pub bucket_filter: BTreeSet<BucketId>,
    /// When set, a failure on any contributing server aborts the whole
    /// execution instead of returning partial data.
    pub wait_on_exception: bool,
}

/// A query handle compiled by the cluster's query engine without running
/// a partitioned retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    statement: String,
}

impl CompiledQuery {
    pub fn new(statement: impl Into<String>) -> CompiledQuery {
        CompiledQuery {
            statement: statement.into(),
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }
}

/// Producer-side endpoint of a result stream.
///
/// The transport calls this from its own execution context: any number of
/// `add_result` calls, then exactly one terminal `end_results`. Neither
/// call may block. Signals arriving after the terminal one are ignored.
pub trait ResultSink: Send + Sync {
    fn add_result(&self, chunk: Bytes);

    fn end_results(&self, error: Option<RemoteError>);
}

/// Locator-based server discovery, supplied by the grid client runtime.
#[async_trait]
pub trait LocatorService: Send + Sync {
    /// Returns the currently live cache servers known to the locators.
    async fn live_servers(&self, locators: &[ServerLocation]) -> Result<Vec<ServerLocation>>;
}

/// Bootstraps the native client connection, either directly against
/// chosen servers or through the locators.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect_servers(
        &self,
        servers: &[ServerLocation],
        props: &HashMap<String, String>,
    ) -> Result<Arc<dyn FunctionTransport>>;

    async fn connect_locators(
        &self,
        locators: &[ServerLocation],
        props: &HashMap<String, String>,
    ) -> Result<Arc<dyn FunctionTransport>>;
}

/// A live connection to the cluster, able to create region proxies and
/// run remote functions against them.
#[async_trait]
pub trait FunctionTransport: Send + Sync {
    /// Registers a client-side proxy for the named region with the
    /// cluster. Called at most once per region per connection.
    async fn create_region_proxy(&self, region_path: &str) -> Result<()>;

    /// Starts a remote function execution. Submission errors surface
    /// here; results and mid-stream failures are pushed into `sink` from
    /// the transport's own context.
    async fn execute(&self, request: ExecutionRequest, sink: Arc<dyn ResultSink>) -> Result<()>;

    /// Compiles a query string against the cluster's query engine.
    async fn compile_query(&self, query_string: &str) -> Result<CompiledQuery>;

    /// Releases the native handle. Idempotence is the caller's concern.
    async fn shutdown(&self);
}
