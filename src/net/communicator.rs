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

//! Process group trait
//!
//! This is the seam between the aggregation protocol and whatever runs the
//! ranks (MPI, or threads inside one process). Group bootstrap happens
//! outside this crate; an implementation only has to expose rank, size and
//! the blocking collectives below.

use crate::data_types::Element;
use crate::error::BridgeResult;
use crate::net::ops::ShardPlan;

use super::CommType;

/// A fixed set of cooperating processes with blocking collectives.
///
/// Every collective must be entered by all ranks of the group in the same
/// order. Nothing here detects a rank that skips a call; the others block.
pub trait ProcessGroup {
    fn get_rank(&self) -> i32;
    fn get_world_size(&self) -> i32;
    fn get_comm_type(&self) -> CommType;

    fn barrier(&self) -> BridgeResult<()>;

    /// Gather one count per rank to `root`
    ///
    /// # Returns
    /// On the root, `world_size` counts indexed by rank. Elsewhere, an
    /// empty vector.
    fn gather_count(&self, count: i32, root: i32) -> BridgeResult<Vec<i32>>;

    /// Variable-length gather of `send` into one buffer on `root`
    ///
    /// # Arguments
    /// * `send` - This rank's shard; its length must equal the count this
    ///   rank declared in the preceding size exchange
    /// * `plan` - Counts and displacements; required on the root, ignored
    ///   elsewhere
    /// * `root` - The rank receiving the concatenated buffer
    ///
    /// # Returns
    /// On the root, a buffer of `plan.total()` elements with rank `i`'s
    /// shard at `plan.shard_range(i)`. Elsewhere, an empty vector.
    fn gather_varcount<T: Element>(
        &self,
        send: &[T],
        plan: Option<&ShardPlan>,
        root: i32,
    ) -> BridgeResult<Vec<T>>;

    /// Variable-length scatter from `root`, the inverse of `gather_varcount`
    ///
    /// # Arguments
    /// * `send` - The source buffer and its plan; required on the root,
    ///   ignored elsewhere
    /// * `recv_count` - Number of elements this rank receives
    /// * `root` - The rank holding the source buffer
    fn scatter_varcount<T: Element>(
        &self,
        send: Option<(&[T], &ShardPlan)>,
        recv_count: usize,
        root: i32,
    ) -> BridgeResult<Vec<T>>;
}
