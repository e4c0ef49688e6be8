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

//! Redis-backed tensor store
//!
//! Tensors use the RedisAI wire format that SmartRedis clients read and
//! write, so the consumer side (e.g. a Python training loop) sees ordinary
//! SmartRedis tensors:
//!
//! - `AI.TENSORSET key DOUBLE 4 BLOB <bytes>`
//! - `AI.TENSORGET key META BLOB` replying
//!   `["dtype", DOUBLE, "shape", [4], "blob", <bytes>]`

use redis::cluster::{ClusterClient, ClusterConnection};
use redis::{Client, Connection, ConnectionLike};

use crate::data_types::{ElementKind, MemoryLayout, Tensor, TensorData};
use crate::error::{BridgeError, BridgeResult};
use crate::{srmpi_debug, srmpi_info};

use super::{StoreConfig, TensorStore};

enum RedisConnection {
    Single(Connection),
    Cluster(ClusterConnection),
}

impl RedisConnection {
    fn as_conn(&mut self) -> &mut dyn ConnectionLike {
        match self {
            RedisConnection::Single(conn) => conn,
            RedisConnection::Cluster(conn) => conn,
        }
    }
}

/// Tensor store on a standalone or clustered Redis with the RedisAI module
pub struct RedisStore {
    conn: RedisConnection,
    instance_name: String,
}

/// `AI.TENSORGET key META BLOB` reply
type TensorReply = (String, String, String, Vec<usize>, String, Vec<u8>);

impl RedisStore {
    /// Connect according to `config`; every failure is a `Connection` error
    pub fn connect(config: &StoreConfig) -> BridgeResult<Self> {
        let urls = config.connection_urls()?;

        let conn = if config.clustered {
            let client = ClusterClient::new(urls.clone()).map_err(|e| {
                BridgeError::Connection(format!("Failed to create cluster client: {}", e))
            })?;
            let conn = client.get_connection().map_err(|e| {
                BridgeError::Connection(format!("Failed to connect to store cluster: {}", e))
            })?;
            RedisConnection::Cluster(conn)
        } else {
            let client = Client::open(urls[0].as_str()).map_err(|e| {
                BridgeError::Connection(format!("Failed to open store client: {}", e))
            })?;
            let conn = client.get_connection().map_err(|e| {
                BridgeError::Connection(format!("Failed to connect to store: {}", e))
            })?;
            RedisConnection::Single(conn)
        };

        srmpi_info!(
            "[{}] connected to {} store at {}",
            config.instance_name,
            if config.clustered { "clustered" } else { "standalone" },
            urls.join(",")
        );

        Ok(Self {
            conn,
            instance_name: config.instance_name.clone(),
        })
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }
}

impl TensorStore for RedisStore {
    fn put_tensor(&mut self, key: &str, tensor: &Tensor) -> BridgeResult<()> {
        // RedisAI tensors are row-major; the bridge only writes 1-D tensors
        // so the layout tag does not change the bytes.
        let blob = tensor.data().to_le_bytes();
        srmpi_debug!("[{}] AI.TENSORSET {} {} {:?}", self.instance_name, key, tensor.kind(), tensor.dims());

        redis::cmd("AI.TENSORSET")
            .arg(key)
            .arg(tensor.kind().name())
            .arg(tensor.dims())
            .arg("BLOB")
            .arg(blob.as_slice())
            .query::<()>(self.conn.as_conn())?;
        Ok(())
    }

    fn get_tensor(&mut self, key: &str, kind: ElementKind) -> BridgeResult<Tensor> {
        if !self.tensor_exists(key)? {
            return Err(BridgeError::KeyError(format!("tensor {} does not exist", key)));
        }

        let (_, dtype, _, shape, _, blob): TensorReply = redis::cmd("AI.TENSORGET")
            .arg(key)
            .arg("META")
            .arg("BLOB")
            .query(self.conn.as_conn())?;

        let stored = ElementKind::from_name(&dtype)?;
        if stored != kind {
            return Err(BridgeError::TypeError(format!(
                "tensor {} holds {} values, not {}",
                key, stored, kind
            )));
        }

        let data = TensorData::from_le_bytes(kind, &blob)?;
        Tensor::new(shape, MemoryLayout::Contiguous, data)
    }

    fn delete_tensor(&mut self, key: &str) -> BridgeResult<()> {
        redis::cmd("DEL").arg(key).query::<i64>(self.conn.as_conn())?;
        Ok(())
    }

    fn tensor_exists(&mut self, key: &str) -> BridgeResult<bool> {
        let exists: bool = redis::cmd("EXISTS").arg(key).query(self.conn.as_conn())?;
        Ok(exists)
    }
}
