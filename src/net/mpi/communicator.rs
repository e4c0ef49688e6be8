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

//! MPI process group
//!
//! Size exchange maps to `MPI_Gather`, aggregation to `MPI_Gatherv` and
//! distribution to `MPI_Scatterv`, all through rsmpi's safe API.

use mpi::datatype::{Partition, PartitionMut};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::data_types::Element;
use crate::error::{BridgeError, BridgeResult};
use crate::net::ops::ShardPlan;
use crate::net::{CommType, ProcessGroup};
use crate::{srmpi_info, srmpi_trace};

/// Process group over an MPI communicator
pub struct MpiProcessGroup {
    rank: i32,
    world_size: i32,
    // Declared before `universe` so the communicator is released first
    comm: Option<SimpleCommunicator>,
    /// Present when this group initialized MPI itself
    universe: Option<Universe>,
}

impl MpiProcessGroup {
    /// Initialize MPI and use the world communicator
    pub fn make() -> BridgeResult<Self> {
        let universe = mpi::initialize().ok_or_else(|| {
            BridgeError::Communication(
                "Failed to initialize MPI (already initialized or MPI library not found)".to_string(),
            )
        })?;
        let world = universe.world();
        let mut group = Self::from_communicator(world)?;
        group.universe = Some(universe);
        Ok(group)
    }

    /// Wrap a communicator created by the host application.
    ///
    /// MPI stays owned by the caller and is not finalized by this group.
    pub fn from_communicator(comm: SimpleCommunicator) -> BridgeResult<Self> {
        let rank = comm.rank();
        let world_size = comm.size();

        if rank < 0 || world_size < 1 || rank >= world_size {
            return Err(BridgeError::Communication(format!(
                "Malformed rank: {} or world size: {}",
                rank, world_size
            )));
        }

        Ok(Self {
            rank,
            world_size,
            comm: Some(comm),
            universe: None,
        })
    }

    pub fn is_finalized(&self) -> bool {
        self.comm.is_none()
    }

    /// Release the communicator, and MPI itself if this group initialized it
    pub fn finalize(&mut self) -> BridgeResult<()> {
        if self.comm.take().is_some() && self.universe.take().is_some() {
            srmpi_info!("rank {}: MPI finalized", self.rank);
        }
        Ok(())
    }

    fn comm(&self) -> BridgeResult<&SimpleCommunicator> {
        self.comm
            .as_ref()
            .ok_or_else(|| BridgeError::Communication("MPI process group is finalized".to_string()))
    }

    fn check_plan(&self, plan: &ShardPlan) -> BridgeResult<()> {
        if plan.world_size() != self.world_size as usize {
            return Err(BridgeError::Communication(format!(
                "plan covers {} ranks but the communicator has {}",
                plan.world_size(),
                self.world_size
            )));
        }
        Ok(())
    }
}

impl ProcessGroup for MpiProcessGroup {
    fn get_rank(&self) -> i32 {
        self.rank
    }

    fn get_world_size(&self) -> i32 {
        self.world_size
    }

    fn get_comm_type(&self) -> CommType {
        CommType::Mpi
    }

    fn barrier(&self) -> BridgeResult<()> {
        self.comm()?.barrier();
        Ok(())
    }

    fn gather_count(&self, count: i32, root: i32) -> BridgeResult<Vec<i32>> {
        let root_process = self.comm()?.process_at_rank(root);
        srmpi_trace!("rank {}: MPI_Gather of count {}", self.rank, count);

        if self.rank == root {
            let mut counts = vec![0i32; self.world_size as usize];
            root_process.gather_into_root(&count, &mut counts[..]);
            Ok(counts)
        } else {
            root_process.gather_into(&count);
            Ok(Vec::new())
        }
    }

    fn gather_varcount<T: Element>(
        &self,
        send: &[T],
        plan: Option<&ShardPlan>,
        root: i32,
    ) -> BridgeResult<Vec<T>> {
        let root_process = self.comm()?.process_at_rank(root);

        if self.rank != root {
            root_process.gather_varcount_into(send);
            return Ok(Vec::new());
        }

        let plan = plan.ok_or_else(|| {
            BridgeError::Invalid("gather root needs a shard plan".to_string())
        })?;
        self.check_plan(plan)?;
        if send.len() != plan.count_of(root as usize) {
            return Err(BridgeError::Communication(format!(
                "root shard has {} elements but declared {}",
                send.len(),
                plan.count_of(root as usize)
            )));
        }

        let mut recv = vec![T::ZERO; plan.total()];
        {
            let mut partition = PartitionMut::new(&mut recv[..], plan.counts(), plan.displs());
            root_process.gather_varcount_into_root(send, &mut partition);
        }
        Ok(recv)
    }

    fn scatter_varcount<T: Element>(
        &self,
        send: Option<(&[T], &ShardPlan)>,
        recv_count: usize,
        root: i32,
    ) -> BridgeResult<Vec<T>> {
        let root_process = self.comm()?.process_at_rank(root);
        let mut recv = vec![T::ZERO; recv_count];

        if self.rank != root {
            root_process.scatter_varcount_into(&mut recv[..]);
            return Ok(recv);
        }

        let (buffer, plan) = send.ok_or_else(|| {
            BridgeError::Invalid("scatter root needs a source buffer".to_string())
        })?;
        self.check_plan(plan)?;
        if buffer.len() != plan.total() || recv_count != plan.count_of(root as usize) {
            return Err(BridgeError::Communication(format!(
                "scatter source of {} elements (root shard {}) does not match plan total {} (root count {})",
                buffer.len(),
                recv_count,
                plan.total(),
                plan.count_of(root as usize)
            )));
        }

        let partition = Partition::new(buffer, plan.counts(), plan.displs());
        root_process.scatter_varcount_into_root(&partition, &mut recv[..]);
        Ok(recv)
    }
}
