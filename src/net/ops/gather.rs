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

//! Aggregation of per-rank shards into one coordinator-side buffer

use crate::data_types::Element;
use crate::error::{BridgeError, BridgeResult};
use crate::net::ProcessGroup;
use crate::srmpi_debug;

use super::plan::{exchange_sizes, ShardPlan};

/// Concatenation of every rank's shard, held by the root only
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBuffer<T> {
    data: Vec<T>,
    plan: ShardPlan,
}

impl<T: Element> AggregateBuffer<T> {
    /// Wrap a buffer laid out according to `plan`
    pub fn new(data: Vec<T>, plan: ShardPlan) -> BridgeResult<Self> {
        if data.len() != plan.total() {
            return Err(BridgeError::Invalid(format!(
                "aggregate buffer holds {} elements but the plan totals {}",
                data.len(),
                plan.total()
            )));
        }
        Ok(Self { data, plan })
    }

    pub fn plan(&self) -> &ShardPlan {
        &self.plan
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The slice contributed by `rank`
    pub fn shard(&self, rank: usize) -> &[T] {
        &self.data[self.plan.shard_range(rank)]
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// Variable-length gather to a root rank
pub struct Aggregator<'a, G: ProcessGroup> {
    group: &'a G,
    root: i32,
}

impl<'a, G: ProcessGroup> Aggregator<'a, G> {
    pub fn new(group: &'a G, root: i32) -> Self {
        Self { group, root }
    }

    pub fn is_root(&self) -> bool {
        self.group.get_rank() == self.root
    }

    /// Gather `local` from every rank using an existing plan.
    ///
    /// `plan` comes from the size exchange and is only read on the root.
    /// Every rank must pass a `local` of exactly the length it declared.
    pub fn execute<T: Element>(
        &self,
        local: &[T],
        plan: Option<&ShardPlan>,
    ) -> BridgeResult<Option<AggregateBuffer<T>>> {
        if !self.is_root() {
            self.group.gather_varcount(local, None, self.root)?;
            return Ok(None);
        }

        let plan = plan.ok_or_else(|| {
            BridgeError::Invalid("gather root needs a shard plan".to_string())
        })?;

        let data = self.group.gather_varcount(local, Some(plan), self.root)?;
        srmpi_debug!("gathered {} {} elements from {} ranks", data.len(), T::KIND, plan.world_size());
        AggregateBuffer::new(data, plan.clone()).map(Some)
    }

    /// Size exchange, planning and gather in one collective step
    pub fn gather<T: Element>(&self, local: &[T]) -> BridgeResult<Option<AggregateBuffer<T>>> {
        let plan = exchange_sizes(self.group, local.len(), self.root)?;
        self.execute(local, plan.as_ref())
    }
}
