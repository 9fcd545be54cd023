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

//! In-process doubles for the grid client runtime contracts.

use crate::BucketId;
use crate::cluster::ServerLocation;
use crate::error::{Error, RemoteCode, RemoteError, Result};
use crate::metadata::RegionMetadata;
use crate::record::ChunkBuilder;
use crate::rpc::{
    CompiledQuery, ExecutionRequest, FunctionId, FunctionTransport, LocatorService, ResultSink,
    TransportFactory,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DEFAULT_TOTAL_BUCKETS: i32 = 16;

/// Locator double: a fixed server list, an empty one, or a failure.
pub(crate) struct MockLocatorService {
    servers: Option<Vec<ServerLocation>>,
}

impl MockLocatorService {
    pub(crate) fn with_servers(servers: Vec<ServerLocation>) -> Self {
        Self {
            servers: Some(servers),
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            servers: Some(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { servers: None }
    }
}

#[async_trait]
impl LocatorService for MockLocatorService {
    async fn live_servers(&self, _locators: &[ServerLocation]) -> Result<Vec<ServerLocation>> {
        match &self.servers {
            Some(servers) => Ok(servers.clone()),
            None => Err(Error::UnexpectedError {
                message: "Locator unreachable".to_string(),
                source: None,
            }),
        }
    }
}

type BootstrapCall = (Vec<ServerLocation>, HashMap<String, String>);

/// Factory double recording which bootstrap path was taken.
pub(crate) struct MockTransportFactory {
    transport: Option<Arc<MockTransport>>,
    server_bootstraps: Mutex<Vec<BootstrapCall>>,
    locator_bootstraps: Mutex<Vec<BootstrapCall>>,
}

impl MockTransportFactory {
    pub(crate) fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport: Some(transport),
            server_bootstraps: Mutex::new(Vec::new()),
            locator_bootstraps: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            transport: None,
            server_bootstraps: Mutex::new(Vec::new()),
            locator_bootstraps: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn server_bootstraps(&self) -> Vec<BootstrapCall> {
        self.server_bootstraps.lock().clone()
    }

    pub(crate) fn locator_bootstraps(&self) -> Vec<BootstrapCall> {
        self.locator_bootstraps.lock().clone()
    }

    fn transport(&self) -> Result<Arc<dyn FunctionTransport>> {
        match &self.transport {
            Some(transport) => Ok(transport.clone()),
            None => Err(Error::UnexpectedError {
                message: "No cache server accepted the connection".to_string(),
                source: None,
            }),
        }
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn connect_servers(
        &self,
        servers: &[ServerLocation],
        props: &HashMap<String, String>,
    ) -> Result<Arc<dyn FunctionTransport>> {
        self.server_bootstraps
            .lock()
            .push((servers.to_vec(), props.clone()));
        self.transport()
    }

    async fn connect_locators(
        &self,
        locators: &[ServerLocation],
        props: &HashMap<String, String>,
    ) -> Result<Arc<dyn FunctionTransport>> {
        self.locator_bootstraps
            .lock()
            .push((locators.to_vec(), props.clone()));
        self.transport()
    }
}

/// Transport double backed by an in-memory region store.
///
/// Regions registered via `with_region*` "exist on the cluster"; probing
/// any other region reports region-not-found through the stream's error
/// marker, like a real metadata function would.
#[derive(Default)]
pub(crate) struct MockTransport {
    regions: Mutex<HashMap<String, i32>>,
    data: Mutex<HashMap<String, Vec<(BucketId, Bytes, Bytes)>>>,
    proxy_creations: Mutex<HashMap<String, usize>>,
    executions: Mutex<Vec<ExecutionRequest>>,
    shutdowns: AtomicUsize,
    submission_failure: Mutex<Option<RemoteError>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_region(self, region_path: &str) -> Self {
        self.with_region_buckets(region_path, DEFAULT_TOTAL_BUCKETS)
    }

    pub(crate) fn with_region_buckets(self, region_path: &str, total_buckets: i32) -> Self {
        self.regions
            .lock()
            .insert(region_path.to_string(), total_buckets);
        self
    }

    pub(crate) fn with_entry(self, region_path: &str, bucket: BucketId, key: &[u8], value: &[u8]) -> Self {
        self.regions
            .lock()
            .entry(region_path.to_string())
            .or_insert(DEFAULT_TOTAL_BUCKETS);
        self.data.lock().entry(region_path.to_string()).or_default().push((
            bucket,
            Bytes::copy_from_slice(key),
            Bytes::copy_from_slice(value),
        ));
        self
    }

    /// Makes every execution fail at submission with the given code.
    pub(crate) fn failing_execution(self, code: RemoteCode, message: &str) -> Self {
        *self.submission_failure.lock() = Some(RemoteError::new(code, message));
        self
    }

    pub(crate) fn proxy_creations(&self, region_path: &str) -> usize {
        self.proxy_creations
            .lock()
            .get(region_path)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn executions(&self) -> Vec<ExecutionRequest> {
        self.executions.lock().clone()
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::Acquire)
    }

    fn matching_entries(&self, request: &ExecutionRequest) -> Vec<(Bytes, Bytes)> {
        self.data
            .lock()
            .get(&request.region_path)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(bucket, _, _)| request.bucket_filter.contains(bucket))
                    .map(|(_, k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl FunctionTransport for MockTransport {
    async fn create_region_proxy(&self, region_path: &str) -> Result<()> {
        // Widen the race window for concurrent-creation tests.
        tokio::time::sleep(Duration::from_millis(2)).await;
        *self
            .proxy_creations
            .lock()
            .entry(region_path.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    async fn execute(&self, request: ExecutionRequest, sink: Arc<dyn ResultSink>) -> Result<()> {
        self.executions.lock().push(request.clone());

        if let Some(failure) = self.submission_failure.lock().clone() {
            return Err(Error::Remote { source: failure });
        }

        match request.function {
            FunctionId::RetrieveRegionMetadata => {
                let total_buckets = self.regions.lock().get(&request.region_path).copied();
                match total_buckets {
                    Some(total_buckets) => {
                        let metadata = RegionMetadata {
                            partitioned: true,
                            total_buckets,
                            partition_resolver: None,
                            key_type: None,
                            value_type: None,
                        };
                        let mut builder = ChunkBuilder::new();
                        builder.push_object(&metadata.to_json());
                        sink.add_result(builder.build());
                        sink.end_results(None);
                    }
                    None => {
                        sink.end_results(Some(RemoteError::new(
                            RemoteCode::RegionNotFound,
                            format!("Region {} not found", request.region_path),
                        )));
                    }
                }
            }
            FunctionId::RetrieveRegion => {
                let mut builder = ChunkBuilder::new();
                for (key, value) in self.matching_entries(&request) {
                    builder.push_pair(&key, &value);
                }
                sink.add_result(builder.build());
                sink.end_results(None);
            }
            FunctionId::Query => {
                let mut builder = ChunkBuilder::new();
                for (_, value) in self.matching_entries(&request) {
                    builder.push_object(&value);
                }
                sink.add_result(builder.build());
                sink.end_results(None);
            }
        }
        Ok(())
    }

    async fn compile_query(&self, query_string: &str) -> Result<CompiledQuery> {
        Ok(CompiledQuery::new(query_string))
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::AcqRel);
    }
}
