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

//! smartredis-mpi: collective access to a tensor store from a process group
//!
//! A fixed group of cooperating processes (simulation ranks) writes
//! per-rank state, reward and info shards to a single tensor store, and
//! reads back per-rank action shards from it. Only the coordinator rank
//! holds a store connection; every other rank contributes or receives its
//! shard through variable-length gather and scatter collectives.
//!
//! Every data operation on a [`Session`] is collective: all ranks must call
//! the same operations in the same order. A rank that skips or reorders a
//! call leaves the rest of the group blocked.

pub mod data_types;
pub mod error;
pub mod net;
pub mod session;
pub mod store;
pub mod util;

// Re-export commonly used types
pub use crate::data_types::{Element, ElementKind, MemoryLayout, Tensor, TensorData};
pub use crate::error::{BridgeError, BridgeResult, Code};
pub use crate::net::ops::{plan, AggregateBuffer, Aggregator, Distributor, ShardPlan};
pub use crate::net::{CommType, ProcessGroup, ThreadedGroup};
pub use crate::session::{Role, Session, SessionState, COORDINATOR_RANK};
pub use crate::store::{MemoryStore, StoreConfig, StoreConnector, TensorStore};

#[cfg(feature = "mpi")]
pub use crate::net::mpi::MpiProcessGroup;
#[cfg(feature = "redis")]
pub use crate::store::RedisStore;

/// The main entry point and version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
