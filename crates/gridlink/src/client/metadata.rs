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

//! Region metadata probe.
//!
//! A lightweight single-bucket execution used upstream for partition
//! planning. "Region not found" is a soft outcome (absent metadata);
//! every other remote failure propagates.

use crate::BucketId;
use crate::client::collector::streaming_collector;
use crate::error::{Error, RemoteCode, Result};
use crate::metadata::RegionMetadata;
use crate::record::ObjectDecoder;
use crate::rpc::{ExecutionRequest, FunctionId, FunctionTransport};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The probe always targets a single fixed bucket; the metadata function
/// answers identically from any of them.
const METADATA_BUCKET: BucketId = 0;

pub(crate) fn metadata_request(region_path: &str) -> ExecutionRequest {
    ExecutionRequest {
        function: FunctionId::RetrieveRegionMetadata,
        region_path: region_path.to_string(),
        args: Vec::new(),
        bucket_filter: BTreeSet::from([METADATA_BUCKET]),
        wait_on_exception: true,
    }
}

/// Fetches the region's metadata snapshot, or `None` when the cluster
/// reports the region does not exist.
pub(crate) async fn probe(
    transport: &Arc<dyn FunctionTransport>,
    region_path: &str,
) -> Result<Option<RegionMetadata>> {
    let request = metadata_request(region_path);
    debug!("Probing metadata for region {region_path}");
    let (sink, mut stream) = streaming_collector(ObjectDecoder);

    if let Err(e) = transport.execute(request, sink).await {
        if e.remote_code() == Some(RemoteCode::RegionNotFound) {
            return Ok(None);
        }
        return Err(e);
    }

    match stream.next().await {
        Some(Ok(payload)) => Ok(Some(RegionMetadata::from_json(&payload)?)),
        Some(Err(e)) if e.remote_code() == Some(RemoteCode::RegionNotFound) => Ok(None),
        Some(Err(e)) => Err(e),
        None => Err(Error::UnexpectedError {
            message: format!("Metadata function returned no result for region {region_path}"),
            source: None,
        }),
    }
}
