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

use crate::cluster::{HostAffinity, ServerLocation};
use crate::error::Result;
use crate::rpc::LocatorService;
use crate::util::murmur_hash;
use log::debug;
use std::sync::Arc;

/// Upper bound on the directly-connected server subset. Co-located
/// replicas come first; the rest of the subset spreads workers across the
/// cluster via the identity hash.
pub const MAX_PREFERRED_SERVERS: usize = 3;

/// Resolves live cluster servers from locators and ranks them relative
/// to the calling worker.
pub struct TopologyResolver {
    locator_service: Arc<dyn LocatorService>,
}

impl TopologyResolver {
    pub fn new(locator_service: Arc<dyn LocatorService>) -> TopologyResolver {
        TopologyResolver { locator_service }
    }

    /// Asks the locators for the currently live cache servers.
    pub async fn live_servers(&self, locators: &[ServerLocation]) -> Result<Vec<ServerLocation>> {
        self.locator_service.live_servers(locators).await
    }

    /// Ranks `servers` for this worker and keeps the preferred subset:
    /// servers on the worker's own host first, then the remaining servers
    /// rotated by a deterministic hash of the worker identity so that
    /// co-scheduled workers fan out over different replicas.
    pub fn preferred_servers(
        servers: Vec<ServerLocation>,
        affinity: &HostAffinity,
        worker_id: &str,
    ) -> Vec<ServerLocation> {
        let (mut local, remote): (Vec<_>, Vec<_>) =
            servers.into_iter().partition(|s| affinity.is_local(s));

        if !remote.is_empty() {
            let start = murmur_hash::hash_bytes(worker_id.as_bytes()) as usize % remote.len();
            local.extend(remote[start..].iter().cloned());
            local.extend(remote[..start].iter().cloned());
        }

        local.truncate(MAX_PREFERRED_SERVERS);
        debug!("Preferred servers for worker {worker_id}: {local:?}");
        local
    }
}
