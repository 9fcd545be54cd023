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

//! Ad-hoc query execution over a bucket subset.

use crate::BucketId;
use crate::client::collector::{ObjectStream, streaming_collector};
use crate::error::{Error, Result};
use crate::metadata::bucket_set_string;
use crate::record::ObjectDecoder;
use crate::rpc::{CompiledQuery, ExecutionRequest, FunctionId, FunctionTransport};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Builds the query request. Unlike retrieval, wait-on-exception stays at
/// the transport's default, and the bucket set travels stringified as the
/// second argument.
pub(crate) fn query_request(
    region_path: &str,
    bucket_set: &BTreeSet<BucketId>,
    query_string: &str,
) -> Result<ExecutionRequest> {
    if bucket_set.is_empty() {
        return Err(Error::IllegalArgument {
            message: format!("Query on region {region_path} names an empty bucket set"),
        });
    }
    if let Some(bucket) = bucket_set.iter().find(|b| **b < 0) {
        return Err(Error::IllegalArgument {
            message: format!("Query on region {region_path} names a negative bucket id {bucket}"),
        });
    }
    Ok(ExecutionRequest {
        function: FunctionId::Query,
        region_path: region_path.to_string(),
        args: vec![query_string.to_string(), bucket_set_string(bucket_set)],
        bucket_filter: bucket_set.clone(),
        wait_on_exception: false,
    })
}

/// Runs a query over exactly the given buckets and returns the lazily
/// decoded result-object sequence.
pub(crate) async fn execute(
    transport: &Arc<dyn FunctionTransport>,
    region_path: &str,
    bucket_set: &BTreeSet<BucketId>,
    query_string: &str,
) -> Result<ObjectStream> {
    let request = query_request(region_path, bucket_set, query_string)?;
    debug!("Executing query on region {region_path}, buckets [{}]", request.args[1]);
    let (sink, stream) = streaming_collector(ObjectDecoder);
    transport.execute(request, sink).await?;
    Ok(stream)
}

/// Compiles a query string against the cluster's query engine without
/// running a partitioned retrieval.
pub(crate) async fn compile(
    transport: &Arc<dyn FunctionTransport>,
    query_string: &str,
) -> Result<CompiledQuery> {
    transport.compile_query(query_string).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_stringifies_bucket_set_sorted() {
        let buckets = BTreeSet::from([3, 0, 1]);
        let request = query_request("/orders", &buckets, "SELECT * FROM /orders").unwrap();

        assert_eq!(request.function, FunctionId::Query);
        assert_eq!(request.args, vec![
            "SELECT * FROM /orders".to_string(),
            "0,1,3".to_string()
        ]);
        assert_eq!(request.bucket_filter, buckets);
        assert!(!request.wait_on_exception);
    }

    #[test]
    fn invalid_bucket_sets_rejected() {
        assert!(query_request("/orders", &BTreeSet::new(), "SELECT *").is_err());
        assert!(query_request("/orders", &BTreeSet::from([-2, 1]), "SELECT *").is_err());
    }
}
