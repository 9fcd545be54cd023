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

use crate::BucketId;
use crate::client::collector::{EntryStream, ObjectStream};
use crate::client::query;
use crate::client::region::RegionProxy;
use crate::client::topology::TopologyResolver;
use crate::cluster::{HostAffinity, ServerLocation};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::{PartitionDescriptor, RegionMetadata};
use crate::rpc::{
    CompiledQuery, FunctionTransport, LocatorService, TransportFactory, functions,
};
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex as AsyncMutex;

/// Read timeout injected into every bootstrap. Deliberately not
/// configurable; partitioned retrievals stream for a long time and the
/// value must match what the cluster-side functions assume.
const POOL_READ_TIMEOUT_MS: u64 = 30_000;
const POOL_READ_TIMEOUT_PROP: &str = "pool.read-timeout-ms";

/// Builds [`GridConnection`]s over the black-box grid client runtime.
pub struct GridConnectionFactory {
    locator_service: Arc<dyn LocatorService>,
    transport_factory: Arc<dyn TransportFactory>,
}

impl GridConnectionFactory {
    pub fn new(
        locator_service: Arc<dyn LocatorService>,
        transport_factory: Arc<dyn TransportFactory>,
    ) -> GridConnectionFactory {
        GridConnectionFactory {
            locator_service,
            transport_factory,
        }
    }

    /// Connects using a parsed [`Config`].
    pub async fn connect(&self, config: &Config) -> Result<GridConnection> {
        self.new_connection(
            config.locator_addresses()?,
            config.property_map()?,
            &config.resolved_worker_id(),
        )
        .await
    }

    /// Bootstraps one connection for this process.
    ///
    /// Live servers resolved from the locators are ranked by same-host
    /// affinity, then by a deterministic hash of the worker identity, and
    /// the preferred subset is dialed directly; when topology cannot be
    /// resolved (or reports nothing live) the connection degrades to
    /// locator-side server selection. Any bootstrap failure is fatal and
    /// surfaces as [`Error::ConnectionInit`]; this layer never retries.
    pub async fn new_connection(
        &self,
        locators: Vec<ServerLocation>,
        mut props: HashMap<String, String>,
        worker_id: &str,
    ) -> Result<GridConnection> {
        if locators.is_empty() {
            return Err(Error::IllegalArgument {
                message: "At least one locator is required".to_string(),
            });
        }

        functions::register_all();
        props.insert(
            POOL_READ_TIMEOUT_PROP.to_string(),
            POOL_READ_TIMEOUT_MS.to_string(),
        );

        let resolver = TopologyResolver::new(self.locator_service.clone());
        let transport = match resolver.live_servers(&locators).await {
            Ok(servers) if !servers.is_empty() => {
                let affinity = HostAffinity::detect();
                let preferred =
                    TopologyResolver::preferred_servers(servers, &affinity, worker_id);
                info!("Connecting directly to preferred servers {preferred:?}");
                self.transport_factory
                    .connect_servers(&preferred, &props)
                    .await
            }
            Ok(_) => {
                info!("No live servers resolved, connecting through locators");
                self.transport_factory
                    .connect_locators(&locators, &props)
                    .await
            }
            Err(e) => {
                warn!("Topology resolution failed ({e}), connecting through locators");
                self.transport_factory
                    .connect_locators(&locators, &props)
                    .await
            }
        }
        .map_err(|e| Error::connection_init("Cluster bootstrap failed", e))?;

        Ok(GridConnection {
            transport,
            locators,
            props,
            regions: RwLock::new(HashMap::new()),
            region_create_lock: AsyncMutex::new(()),
            closed: AtomicBool::new(false),
        })
    }
}

/// One connection per process to the data grid.
///
/// Owns the native transport handle and the region proxy cache; shared by
/// every caller in the process. Created once at worker startup, closed
/// exactly once at shutdown (close is idempotent).
pub struct GridConnection {
    transport: Arc<dyn FunctionTransport>,
    locators: Vec<ServerLocation>,
    props: HashMap<String, String>,
    regions: RwLock<HashMap<String, Arc<RegionProxy>>>,
    /// Serializes the check-create-insert sequence: proxy creation talks
    /// to the cluster and must happen at most once per region even under
    /// concurrent first use.
    region_create_lock: AsyncMutex<()>,
    closed: AtomicBool,
}

impl std::fmt::Debug for GridConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridConnection")
            .field("locators", &self.locators)
            .field("props", &self.props)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl GridConnection {
    pub fn locators(&self) -> &[ServerLocation] {
        &self.locators
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.props
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::UnexpectedError {
                message: "Connection is closed".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    /// Returns the proxy handle for `region_path`, creating it on first
    /// access. Cache hits take only the read lock.
    pub async fn get_region_proxy(&self, region_path: &str) -> Result<Arc<RegionProxy>> {
        self.ensure_open()?;

        if let Some(proxy) = self.regions.read().get(region_path) {
            return Ok(proxy.clone());
        }

        let _guard = self.region_create_lock.lock().await;
        // Re-check: another caller may have created the proxy while this
        // one waited for the lock.
        if let Some(proxy) = self.regions.read().get(region_path) {
            return Ok(proxy.clone());
        }

        self.transport.create_region_proxy(region_path).await?;
        let proxy = Arc::new(RegionProxy::new(
            region_path.to_string(),
            self.transport.clone(),
        ));
        self.regions
            .write()
            .insert(region_path.to_string(), proxy.clone());
        Ok(proxy)
    }

    /// Fetches metadata for a region; `None` when the region does not
    /// exist on the cluster. The snapshot is not cached by this layer.
    pub async fn get_region_metadata(&self, region_path: &str) -> Result<Option<RegionMetadata>> {
        let proxy = self.get_region_proxy(region_path).await?;
        proxy.metadata().await
    }

    /// Fails with [`Error::RegionNotFound`] unless the region exists.
    pub async fn validate_region(&self, region_path: &str) -> Result<()> {
        match self.get_region_metadata(region_path).await? {
            Some(_) => Ok(()),
            None => Err(Error::RegionNotFound {
                region: region_path.to_string(),
            }),
        }
    }

    /// Retrieves one partition's slice of a region as a lazy
    /// `(key, value)` sequence.
    pub async fn get_region_data(
        &self,
        region_path: &str,
        where_clause: Option<&str>,
        partition: &PartitionDescriptor,
    ) -> Result<EntryStream> {
        let proxy = self.get_region_proxy(region_path).await?;
        proxy.retrieve(where_clause, partition).await
    }

    /// Runs a query string over exactly the given buckets of a region.
    pub async fn execute_query(
        &self,
        region_path: &str,
        bucket_set: &BTreeSet<BucketId>,
        query_string: &str,
    ) -> Result<ObjectStream> {
        let proxy = self.get_region_proxy(region_path).await?;
        proxy.query(bucket_set, query_string).await
    }

    /// Compiles a query string against the cluster's query engine.
    pub async fn get_query(&self, query_string: &str) -> Result<CompiledQuery> {
        self.ensure_open()?;
        query::compile(&self.transport, query_string).await
    }

    /// Releases the native handle. Idempotent: only the first call shuts
    /// the transport down. Must be called after outstanding executions
    /// complete; racing them is undefined.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.shutdown().await;
        info!("Connection closed");
    }
}
