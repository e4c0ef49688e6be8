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

//! In-process tensor store
//!
//! Clones share one backing map, so a handle kept outside the session can
//! seed actions and inspect what the coordinator wrote.

use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;

use crate::data_types::{ElementKind, Tensor};
use crate::error::{BridgeError, BridgeResult};

use super::{StoreConnector, TensorStore};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tensors: Arc<Mutex<HashMap<String, Tensor>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> BridgeResult<MutexGuard<'_, HashMap<String, Tensor>>> {
        self.tensors
            .lock()
            .map_err(|_| BridgeError::Store("memory store lock poisoned".to_string()))
    }

    /// Number of stored tensors
    pub fn len(&self) -> BridgeResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> BridgeResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Stored keys in sorted order
    pub fn keys(&self) -> BridgeResult<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Copy of the tensor under `key`, without any kind check
    pub fn peek(&self, key: &str) -> BridgeResult<Option<Tensor>> {
        Ok(self.lock()?.get(key).cloned())
    }
}

impl TensorStore for MemoryStore {
    fn put_tensor(&mut self, key: &str, tensor: &Tensor) -> BridgeResult<()> {
        self.lock()?.insert(key.to_string(), tensor.clone());
        Ok(())
    }

    fn get_tensor(&mut self, key: &str, kind: ElementKind) -> BridgeResult<Tensor> {
        let tensors = self.lock()?;
        let tensor = tensors
            .get(key)
            .ok_or_else(|| BridgeError::KeyError(format!("tensor {} does not exist", key)))?;
        if tensor.kind() != kind {
            return Err(BridgeError::TypeError(format!(
                "tensor {} holds {} values, not {}",
                key,
                tensor.kind(),
                kind
            )));
        }
        Ok(tensor.clone())
    }

    fn delete_tensor(&mut self, key: &str) -> BridgeResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn tensor_exists(&mut self, key: &str) -> BridgeResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }
}

impl StoreConnector for MemoryStore {
    type Store = MemoryStore;

    fn connect(&self) -> BridgeResult<MemoryStore> {
        Ok(self.clone())
    }
}
