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

//! Tensor store bridge
//!
//! The store is only ever touched by the coordinator rank. Implementations
//! provide put/get/delete over string keys and flat typed tensors.

pub mod config;
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use config::StoreConfig;
pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use crate::data_types::{Element, ElementKind, Tensor};
use crate::error::BridgeResult;

/// Put/get/delete access to a keyed tensor store
pub trait TensorStore {
    /// Store `tensor` under `key`, replacing any previous value
    fn put_tensor(&mut self, key: &str, tensor: &Tensor) -> BridgeResult<()>;

    /// Read the tensor stored under `key`.
    ///
    /// Fails with `KeyError` when the key is absent and `TypeError` when the
    /// stored tensor is not of `kind`.
    fn get_tensor(&mut self, key: &str, kind: ElementKind) -> BridgeResult<Tensor>;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete_tensor(&mut self, key: &str) -> BridgeResult<()>;

    fn tensor_exists(&mut self, key: &str) -> BridgeResult<bool>;
}

/// Opens store connections for the coordinator rank
pub trait StoreConnector {
    type Store: TensorStore;

    /// Open a connection; failures are `Connection` errors
    fn connect(&self) -> BridgeResult<Self::Store>;
}

/// Copy a stored tensor into a destination of fixed capacity.
///
/// Copies `min(dest.len(), tensor.len())` elements and zero-fills any
/// remaining slots of `dest`.
///
/// # Returns
/// `true` when the stored length differed from the requested capacity.
pub fn unpack_into<T: Element>(tensor: &Tensor, dest: &mut [T]) -> BridgeResult<bool> {
    let values = tensor.values::<T>()?;
    let copied = values.len().min(dest.len());
    dest[..copied].copy_from_slice(&values[..copied]);
    dest[copied..].fill(T::ZERO);
    Ok(values.len() != dest.len())
}
