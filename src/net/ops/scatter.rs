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

//! Distribution of a root-side buffer back into per-rank shards

use crate::data_types::Element;
use crate::error::{BridgeError, BridgeResult};
use crate::net::ProcessGroup;
use crate::srmpi_debug;

use super::plan::ShardPlan;

/// Variable-length scatter from a root rank
pub struct Distributor<'a, G: ProcessGroup> {
    group: &'a G,
    root: i32,
}

impl<'a, G: ProcessGroup> Distributor<'a, G> {
    pub fn new(group: &'a G, root: i32) -> Self {
        Self { group, root }
    }

    pub fn is_root(&self) -> bool {
        self.group.get_rank() == self.root
    }

    /// Scatter `source` so that rank `i` receives `plan.shard_range(i)`.
    ///
    /// The root passes the buffer and its plan; other ranks pass `None`.
    /// `recv_count` must match this rank's count in the plan.
    pub fn execute<T: Element>(
        &self,
        source: Option<(&[T], &ShardPlan)>,
        recv_count: usize,
    ) -> BridgeResult<Vec<T>> {
        if !self.is_root() {
            return self.group.scatter_varcount(None, recv_count, self.root);
        }

        let (buffer, plan) = source.ok_or_else(|| {
            BridgeError::Invalid("scatter root needs a source buffer".to_string())
        })?;
        if buffer.len() != plan.total() {
            return Err(BridgeError::Communication(format!(
                "scatter source holds {} elements but the plan totals {}",
                buffer.len(),
                plan.total()
            )));
        }

        srmpi_debug!("scattering {} {} elements to {} ranks", buffer.len(), T::KIND, plan.world_size());
        self.group.scatter_varcount(Some((buffer, plan)), recv_count, self.root)
    }

    /// Scatter directly into this rank's local shard
    pub fn scatter_into<T: Element>(
        &self,
        source: Option<(&[T], &ShardPlan)>,
        dest: &mut [T],
    ) -> BridgeResult<()> {
        let received = self.execute(source, dest.len())?;
        if received.len() != dest.len() {
            return Err(BridgeError::Communication(format!(
                "received {} elements for a shard of {}",
                received.len(),
                dest.len()
            )));
        }
        dest.copy_from_slice(&received);
        Ok(())
    }
}
