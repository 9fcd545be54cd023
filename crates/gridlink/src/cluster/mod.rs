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

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::net::ToSocketAddrs;

/// Environment variable overriding the local identity used for
/// host-affinity ranking during server selection.
pub const LOCAL_IP_ENV: &str = "GRIDLINK_LOCAL_IP";

/// A cluster endpoint, either a locator or a cache server.
///
/// Preference between locations is computed per connection attempt and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerLocation {
    host: String,
    port: u16,
}

impl ServerLocation {
    pub fn new(host: impl Into<String>, port: u16) -> ServerLocation {
        ServerLocation {
            host: host.into(),
            port,
        }
    }

    /// Parses `host:port`.
    pub fn parse(address: &str) -> Result<ServerLocation> {
        let Some((host, port)) = address.rsplit_once(':') else {
            return Err(Error::IllegalArgument {
                message: format!("Invalid address '{address}', expected host:port"),
            });
        };
        let port = port.parse::<u16>().map_err(|e| Error::IllegalArgument {
            message: format!("Invalid port in address '{address}': {e}"),
        })?;
        if host.is_empty() {
            return Err(Error::IllegalArgument {
                message: format!("Invalid address '{address}', empty host"),
            });
        }
        Ok(ServerLocation::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The set of names and addresses this process answers to, used to rank
/// servers on the same physical host ahead of remote ones.
#[derive(Debug, Clone, Default)]
pub struct HostAffinity {
    identities: HashSet<String>,
}

impl HostAffinity {
    /// Detects the local identity: the `GRIDLINK_LOCAL_IP` override when
    /// set, otherwise the canonical hostname plus its resolved addresses.
    pub fn detect() -> HostAffinity {
        if let Ok(ip) = std::env::var(LOCAL_IP_ENV) {
            let ip = ip.trim();
            if !ip.is_empty() {
                return HostAffinity::from_identities([ip.to_string()]);
            }
        }
        let mut identities = HashSet::new();
        if let Some(name) = hostname::get().ok().and_then(|h| h.into_string().ok()) {
            // Port 0 satisfies ToSocketAddrs; only the resolved IPs matter.
            if let Ok(addrs) = (name.as_str(), 0u16).to_socket_addrs() {
                identities.extend(addrs.map(|a| a.ip().to_string()));
            }
            identities.insert(name);
        }
        HostAffinity { identities }
    }

    pub fn from_identities(identities: impl IntoIterator<Item = String>) -> HostAffinity {
        HostAffinity {
            identities: identities.into_iter().collect(),
        }
    }

    /// Whether the given server runs on the same host as this process.
    pub fn is_local(&self, server: &ServerLocation) -> bool {
        self.identities.contains(server.host())
    }
}
