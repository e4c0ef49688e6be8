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

//! Shard layout planning and the size exchange that feeds it

use std::ops::Range;

use crate::error::{BridgeError, BridgeResult};
use crate::net::ProcessGroup;
use crate::{srmpi_debug, srmpi_trace};

/// Per-rank counts and their exclusive prefix sum
///
/// Rank `i` owns `[displs[i], displs[i] + counts[i])` of the aggregate
/// buffer, ranks laid out in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPlan {
    counts: Vec<i32>,
    displs: Vec<i32>,
    total: usize,
}

impl ShardPlan {
    /// Element count per rank (MPI counts)
    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    /// Offset of each rank's shard (MPI displacements)
    pub fn displs(&self) -> &[i32] {
        &self.displs
    }

    /// Length of the aggregate buffer
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn world_size(&self) -> usize {
        self.counts.len()
    }

    pub fn count_of(&self, rank: usize) -> usize {
        self.counts[rank] as usize
    }

    /// Slots of the aggregate buffer owned by `rank`
    pub fn shard_range(&self, rank: usize) -> Range<usize> {
        let start = self.displs[rank] as usize;
        start..start + self.counts[rank] as usize
    }
}

/// Plan displacements for the given per-rank sizes.
///
/// `displs[0] = 0`, `displs[i] = displs[i-1] + sizes[i-1]`, and the total is
/// the sum of all sizes. Fails with `Invalid` on a negative size or when the
/// total does not fit an MPI displacement.
pub fn plan(sizes: &[i32]) -> BridgeResult<ShardPlan> {
    let mut displs = Vec::with_capacity(sizes.len());
    let mut cumulative = 0i32;
    for (rank, &size) in sizes.iter().enumerate() {
        if size < 0 {
            return Err(BridgeError::Invalid(format!(
                "rank {} declared a negative shard size {}",
                rank, size
            )));
        }
        displs.push(cumulative);
        cumulative = cumulative.checked_add(size).ok_or_else(|| {
            BridgeError::Invalid(format!(
                "shard sizes {:?} sum past the displacement limit {}",
                sizes,
                i32::MAX
            ))
        })?;
    }

    Ok(ShardPlan {
        counts: sizes.to_vec(),
        displs,
        total: cumulative as usize,
    })
}

/// Convert a local shard length into an MPI count
pub(crate) fn to_count(len: usize) -> BridgeResult<i32> {
    i32::try_from(len).map_err(|_| {
        BridgeError::Invalid(format!("shard of {} elements exceeds the collective count limit", len))
    })
}

/// Gather every rank's local length to `root` and plan the layout there.
///
/// Collective. Returns `Some(plan)` on the root and `None` elsewhere.
pub fn exchange_sizes<G: ProcessGroup>(
    group: &G,
    local_len: usize,
    root: i32,
) -> BridgeResult<Option<ShardPlan>> {
    let count = to_count(local_len)?;
    srmpi_trace!("rank {} declares {} elements", group.get_rank(), count);

    let sizes = group.gather_count(count, root)?;
    if group.get_rank() != root {
        return Ok(None);
    }

    if sizes.len() != group.get_world_size() as usize {
        return Err(BridgeError::Communication(format!(
            "size exchange returned {} counts for a group of {}",
            sizes.len(),
            group.get_world_size()
        )));
    }

    let shard_plan = plan(&sizes)?;
    srmpi_debug!(
        "planned shards: sizes={:?} displs={:?} total={}",
        shard_plan.counts(),
        shard_plan.displs(),
        shard_plan.total()
    );
    Ok(Some(shard_plan))
}
