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
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A snapshot of a region's layout fetched by the metadata probe.
///
/// Immutable once fetched; this layer never caches it, the caller decides
/// whether and how long to keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMetadata {
    /// Whether the region's data is spread over buckets.
    pub partitioned: bool,
    /// Number of physical buckets the region is split into.
    pub total_buckets: i32,
    /// Name of the server-side partition resolver, when one is installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_resolver: Option<String>,
    /// Declared key type, when the region constrains it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Declared value type, when the region constrains it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl RegionMetadata {
    pub fn from_json(payload: &[u8]) -> Result<RegionMetadata> {
        serde_json::from_slice(payload).map_err(|e| Error::StreamDecode {
            message: format!("Invalid region metadata payload: {e}"),
        })
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("region metadata serializes")
    }
}

impl fmt::Display for RegionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RegionMetadata{{partitioned={}, totalBuckets={}}}",
            self.partitioned, self.total_buckets
        )
    }
}

/// A logical unit of work mapped onto a set of physical buckets.
///
/// Supplied by the host job scheduler; opaque to this layer beyond
/// applying the bucket set as the execution's bucket filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    index: usize,
    buckets: BTreeSet<BucketId>,
}

impl PartitionDescriptor {
    /// Creates a descriptor. The bucket set must be non-empty and hold
    /// only non-negative bucket ids; a partitioned call with an empty
    /// filter would silently target nothing.
    pub fn new(index: usize, buckets: impl IntoIterator<Item = BucketId>) -> Result<Self> {
        let buckets: BTreeSet<BucketId> = buckets.into_iter().collect();
        if buckets.is_empty() {
            return Err(Error::IllegalArgument {
                message: format!("Partition {index} has an empty bucket set"),
            });
        }
        if let Some(bucket) = buckets.iter().find(|b| **b < 0) {
            return Err(Error::IllegalArgument {
                message: format!("Partition {index} names a negative bucket id {bucket}"),
            });
        }
        Ok(Self { index, buckets })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn buckets(&self) -> &BTreeSet<BucketId> {
        &self.buckets
    }
}

impl fmt::Display for PartitionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Partition{{index={}, buckets={:?}}}", self.index, self.buckets)
    }
}

/// Renders a bucket set in ascending order as "b1,b2,...", the form the
/// query function expects on the wire.
pub fn bucket_set_string(buckets: &BTreeSet<BucketId>) -> String {
    let rendered: Vec<String> = buckets.iter().map(|b| b.to_string()).collect();
    rendered.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_round_trip() {
        let metadata = RegionMetadata {
            partitioned: true,
            total_buckets: 113,
            partition_resolver: Some("OrderResolver".to_string()),
            key_type: Some("java.lang.String".to_string()),
            value_type: None,
        };
        let restored = RegionMetadata::from_json(&metadata.to_json()).unwrap();
        assert_eq!(metadata, restored);
    }

    #[test]
    fn metadata_rejects_garbage_payload() {
        let err = RegionMetadata::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, Error::StreamDecode { .. }));
    }

    #[test]
    fn descriptor_requires_buckets() {
        assert!(PartitionDescriptor::new(0, []).is_err());
        assert!(PartitionDescriptor::new(0, [3, -1]).is_err());

        let descriptor = PartitionDescriptor::new(2, [5, 2, 5]).unwrap();
        assert_eq!(descriptor.index(), 2);
        assert_eq!(
            descriptor.buckets().iter().copied().collect::<Vec<_>>(),
            vec![2, 5]
        );
    }

    #[test]
    fn bucket_set_string_is_sorted_and_deterministic() {
        let descriptor = PartitionDescriptor::new(0, [3, 0, 1]).unwrap();
        assert_eq!(bucket_set_string(descriptor.buckets()), "0,1,3");
    }
}
