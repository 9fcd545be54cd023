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

use crate::cluster::ServerLocation;
use crate::error::{Error, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Parser, Debug, Clone, Default, Deserialize, Serialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Comma-separated locator addresses, e.g. "locator-a:10334,locator-b:10334"
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locators: Option<String>,

    /// Identity of this worker, used for deterministic server preference.
    /// Defaults to "<hostname>-<pid>" when unset.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,

    /// Extra properties forwarded opaquely to cluster bootstrap, as
    /// repeatable key=value pairs.
    #[arg(long = "prop", value_name = "KEY=VALUE")]
    #[serde(default)]
    pub extra_props: Vec<String>,
}

impl Config {
    /// Parses the locator list into `(host, port)` pairs, preserving order.
    pub fn locator_addresses(&self) -> Result<Vec<ServerLocation>> {
        let raw = self.locators.as_deref().unwrap_or_default();
        if raw.trim().is_empty() {
            return Err(Error::IllegalArgument {
                message: "No locators configured".to_string(),
            });
        }
        raw.split(',')
            .map(|entry| ServerLocation::parse(entry.trim()))
            .collect()
    }

    /// Resolves the worker identity used for preference hashing.
    pub fn resolved_worker_id(&self) -> String {
        if let Some(id) = &self.worker_id {
            return id.clone();
        }
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        format!("{host}-{}", std::process::id())
    }

    /// Materializes `extra_props` into the property mapping passed to
    /// bootstrap. Later duplicates win, matching CLI override semantics.
    pub fn property_map(&self) -> Result<HashMap<String, String>> {
        let mut props = HashMap::new();
        for entry in &self.extra_props {
            let Some((key, value)) = entry.split_once('=') else {
                return Err(Error::IllegalArgument {
                    message: format!("Invalid property '{entry}', expected key=value"),
                });
            };
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(props)
    }
}
