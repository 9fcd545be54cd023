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

use std::fmt;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Cluster bootstrap failed while constructing a connection. Fatal,
    /// never retried by this layer.
    #[error("Connection bootstrap failed: {message}")]
    ConnectionInit {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// A named region does not exist on the cluster.
    #[error("Region not found: {region}")]
    RegionNotFound { region: String },

    /// A remote function failed at submission time.
    #[error("Remote execution failed: {source}")]
    Remote {
        #[source]
        source: RemoteError,
    },

    /// A remote failure delivered through a result stream's error marker,
    /// surfaced after all buffered records have been drained.
    #[error("Remote execution failed mid-stream: {source}")]
    StreamRemote {
        #[source]
        source: RemoteError,
    },

    /// Malformed or truncated result chunk, surfaced at the bad record.
    #[error("Malformed result record: {message}")]
    StreamDecode { message: String },

    #[error("Illegal argument: {message}")]
    IllegalArgument { message: String },

    #[error("Unexpected error: {message}")]
    UnexpectedError {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },
}

impl Error {
    pub fn connection_init(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Error::ConnectionInit {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The structured code of the remote failure carried by this error,
    /// whether it surfaced at submission or through the stream.
    pub fn remote_code(&self) -> Option<RemoteCode> {
        match self {
            Error::Remote { source } | Error::StreamRemote { source } => Some(source.code),
            _ => None,
        }
    }
}

/// A failure reported by the cluster for a remote function execution.
///
/// Carries a structured [`RemoteCode`] so callers match on the code rather
/// than scanning the message text.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{code} ({message})")]
pub struct RemoteError {
    pub code: RemoteCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: RemoteCode, message: impl Into<String>) -> Self {
        RemoteError {
            code,
            message: message.into(),
        }
    }
}

/// Stable failure codes shared with every cluster node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCode {
    RegionNotFound,
    FunctionNotRegistered,
    ExecutionFailed,
    ServerUnavailable,
    Unknown,
}

impl RemoteCode {
    pub fn code(&self) -> i32 {
        match self {
            RemoteCode::RegionNotFound => 1,
            RemoteCode::FunctionNotRegistered => 2,
            RemoteCode::ExecutionFailed => 3,
            RemoteCode::ServerUnavailable => 4,
            RemoteCode::Unknown => -1,
        }
    }

    pub fn for_code(code: i32) -> RemoteCode {
        match code {
            1 => RemoteCode::RegionNotFound,
            2 => RemoteCode::FunctionNotRegistered,
            3 => RemoteCode::ExecutionFailed,
            4 => RemoteCode::ServerUnavailable,
            _ => RemoteCode::Unknown,
        }
    }
}

impl fmt::Display for RemoteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCode::RegionNotFound => write!(f, "RegionNotFound"),
            RemoteCode::FunctionNotRegistered => write!(f, "FunctionNotRegistered"),
            RemoteCode::ExecutionFailed => write!(f, "ExecutionFailed"),
            RemoteCode::ServerUnavailable => write!(f, "ServerUnavailable"),
            RemoteCode::Unknown => write!(f, "Unknown"),
        }
    }
}
