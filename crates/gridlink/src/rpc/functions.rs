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

//! Process-wide registration of the remote function identifiers this
//! layer depends on.
//!
//! Registration is an explicit call made at connection construction, not
//! a load-time side effect, and is idempotent: the same identifiers may
//! be registered any number of times, across any number of connections or
//! processes, without duplication.

use crate::rpc::FunctionId;
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn registry() -> &'static Mutex<BTreeSet<FunctionId>> {
    static REGISTRY: OnceLock<Mutex<BTreeSet<FunctionId>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(BTreeSet::new()))
}

/// Registers every function identifier this layer uses. Safe to call
/// repeatedly; only the first call per identifier has any effect.
pub fn register_all() {
    let mut registered = registry().lock();
    for function in FunctionId::ALL {
        if registered.insert(function) {
            debug!("Registered remote function {function}");
        }
    }
}

/// The identifiers registered so far, in stable order.
pub fn registered_functions() -> Vec<FunctionId> {
    registry().lock().iter().copied().collect()
}
