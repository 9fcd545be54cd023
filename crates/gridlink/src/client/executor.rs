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

//! Partitioned retrieval execution.

use crate::client::collector::{EntryStream, streaming_collector};
use crate::error::Result;
use crate::metadata::{PartitionDescriptor, bucket_set_string};
use crate::record::PairDecoder;
use crate::rpc::{ExecutionRequest, FunctionId, FunctionTransport};
use log::debug;
use std::sync::Arc;

/// Builds the retrieval request for one partition: the where-clause (empty
/// string when absent) plus a human-readable description for server-side
/// diagnostics, restricted to exactly the partition's buckets, with
/// wait-on-exception forced on so a failure on any contributing server
/// aborts the whole execution.
pub(crate) fn retrieval_request(
    region_path: &str,
    where_clause: Option<&str>,
    partition: &PartitionDescriptor,
) -> ExecutionRequest {
    let description = format!(
        "Retrieve region {region_path}, partition {}, buckets [{}]",
        partition.index(),
        bucket_set_string(partition.buckets()),
    );
    ExecutionRequest {
        function: FunctionId::RetrieveRegion,
        region_path: region_path.to_string(),
        args: vec![where_clause.unwrap_or("").to_string(), description],
        bucket_filter: partition.buckets().clone(),
        wait_on_exception: true,
    }
}

/// Executes the retrieval function for one partition and returns the
/// lazily decoded entry sequence. Single-pass; consuming it drives the
/// decode, so a slow consumer holds server resources open longer but
/// loses nothing.
pub(crate) async fn retrieve(
    transport: &Arc<dyn FunctionTransport>,
    region_path: &str,
    where_clause: Option<&str>,
    partition: &PartitionDescriptor,
) -> Result<EntryStream> {
    let request = retrieval_request(region_path, where_clause, partition);
    debug!(
        "Executing {} for region {region_path}, partition {}",
        request.function,
        partition.index()
    );
    let (sink, stream) = streaming_collector(PairDecoder);
    transport.execute(request, sink).await?;
    Ok(stream)
}
