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
use crate::client::{executor, metadata as metadata_probe, query};
use crate::error::Result;
use crate::metadata::{PartitionDescriptor, RegionMetadata};
use crate::rpc::FunctionTransport;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Client-side handle for one named region.
///
/// Created once per region per connection by the registry and shared by
/// every caller; it lives as long as the connection and is never
/// explicitly destroyed.
pub struct RegionProxy {
    path: String,
    transport: Arc<dyn FunctionTransport>,
}

impl RegionProxy {
    pub(crate) fn new(path: String, transport: Arc<dyn FunctionTransport>) -> RegionProxy {
        RegionProxy { path, transport }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fetches this region's metadata snapshot; `None` when the region
    /// does not exist on the cluster.
    pub async fn metadata(&self) -> Result<Option<RegionMetadata>> {
        metadata_probe::probe(&self.transport, &self.path).await
    }

    /// Retrieves this region's entries for one partition as a lazy
    /// `(key, value)` sequence, optionally filtered by a where-clause.
    pub async fn retrieve(
        &self,
        where_clause: Option<&str>,
        partition: &PartitionDescriptor,
    ) -> Result<EntryStream> {
        executor::retrieve(&self.transport, &self.path, where_clause, partition).await
    }

    /// Runs a query over the given buckets of this region.
    pub async fn query(
        &self,
        bucket_set: &BTreeSet<BucketId>,
        query_string: &str,
    ) -> Result<ObjectStream> {
        query::execute(&self.transport, &self.path, bucket_set, query_string).await
    }
}
