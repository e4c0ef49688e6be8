// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Store connection configuration

use crate::error::{BridgeError, BridgeResult};

/// Environment variable holding the store address list
pub const ADDRESS_ENV: &str = "SSDB";

/// Where and how the coordinator connects to the tensor store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store addresses (`host:port`, `tcp://host:port` or `unix:///path`)
    pub addresses: Vec<String>,
    /// Whether the store is a cluster
    pub clustered: bool,
    /// Name identifying this client in logs
    pub instance_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(false, "default")
    }
}

impl StoreConfig {
    /// Create a config with no addresses yet
    pub fn new(clustered: bool, instance_name: impl Into<String>) -> Self {
        Self {
            addresses: Vec::new(),
            clustered,
            instance_name: instance_name.into(),
        }
    }

    /// Create a config whose addresses come from `SSDB`.
    ///
    /// `SSDB` holds a comma-separated list, e.g. `127.0.0.1:6379` or
    /// `tcp://10.0.0.1:6379,tcp://10.0.0.2:6379` for a cluster.
    pub fn from_env(clustered: bool, instance_name: impl Into<String>) -> BridgeResult<Self> {
        let value = std::env::var(ADDRESS_ENV).map_err(|_| {
            BridgeError::Connection(format!("{} not set", ADDRESS_ENV))
        })?;
        let addresses = parse_address_list(&value);
        if addresses.is_empty() {
            return Err(BridgeError::Connection(format!("{} is empty", ADDRESS_ENV)));
        }
        Ok(Self::new(clustered, instance_name).with_addresses(addresses))
    }

    /// Add one address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    /// Replace the address list
    pub fn with_addresses(mut self, addresses: Vec<String>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Addresses as client URLs (`redis://host:port`, `redis+unix:///path`)
    pub fn connection_urls(&self) -> BridgeResult<Vec<String>> {
        if self.addresses.is_empty() {
            return Err(BridgeError::Connection("no store address configured".to_string()));
        }
        if !self.clustered && self.addresses.len() > 1 {
            return Err(BridgeError::Connection(format!(
                "{} addresses given for a non-clustered store",
                self.addresses.len()
            )));
        }
        self.addresses
            .iter()
            .map(|address| normalize_address(address, self.clustered))
            .collect()
    }
}

/// Split a comma-separated address list, dropping empty entries
pub fn parse_address_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_address(address: &str, clustered: bool) -> BridgeResult<String> {
    let address = address.trim();

    if address.starts_with("redis://") || address.starts_with("rediss://") {
        return Ok(address.to_string());
    }

    if let Some(path) = address.strip_prefix("unix://") {
        if clustered {
            return Err(BridgeError::Connection(format!(
                "unix socket {} cannot address a clustered store",
                path
            )));
        }
        if path.is_empty() {
            return Err(BridgeError::Connection("empty unix socket path".to_string()));
        }
        return Ok(format!("redis+unix://{}", path));
    }

    let host_port = address.strip_prefix("tcp://").unwrap_or(address);
    let (host, port) = host_port.rsplit_once(':').ok_or_else(|| {
        BridgeError::Connection(format!("address {} has no port", address))
    })?;
    if host.is_empty() {
        return Err(BridgeError::Connection(format!("address {} has no host", address)));
    }
    let port: u16 = port.parse().map_err(|_| {
        BridgeError::Connection(format!("address {} has an invalid port", address))
    })?;

    Ok(format!("redis://{}:{}", host, port))
}

#[cfg(feature = "redis")]
impl super::StoreConnector for StoreConfig {
    type Store = super::RedisStore;

    fn connect(&self) -> BridgeResult<super::RedisStore> {
        super::RedisStore::connect(self)
    }
}
