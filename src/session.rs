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

//! Session: named collective operations against the tensor store
//!
//! Rank [`COORDINATOR_RANK`] is the coordinator. It alone opens the store
//! connection; every other rank is an idle worker that only takes part in
//! the collectives.
//!
//! Lifecycle: `Uninitialized -> Connected (coordinator) | Idle (worker) ->
//! Finalized`. Data operations outside `Connected`/`Idle` fail with
//! `Invalid` on every rank before any collective is entered.

use crate::data_types::{Element, Tensor};
use crate::error::{BridgeError, BridgeResult};
use crate::net::ops::{exchange_sizes, Aggregator, Distributor};
use crate::net::ProcessGroup;
use crate::store::{unpack_into, StoreConnector, TensorStore};
use crate::{srmpi_debug, srmpi_info, srmpi_warn};

/// The rank that owns the store connection
pub const COORDINATOR_RANK: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Coordinator with a live store connection
    Connected,
    /// Worker; never holds a connection
    Idle,
    Finalized,
}

/// Role of this rank, fixed when the session is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
}

/// Per-process handle for the collective store operations
///
/// The store connection is present iff the role is `Coordinator` and the
/// state is `Connected`.
pub struct Session<G: ProcessGroup, S: TensorStore> {
    group: G,
    role: Role,
    state: SessionState,
    store: Option<S>,
}

impl<G: ProcessGroup, S: TensorStore> Session<G, S> {
    /// Create an uninitialized session over `group`
    pub fn new(group: G) -> Self {
        let role = if group.get_rank() == COORDINATOR_RANK {
            Role::Coordinator
        } else {
            Role::Worker
        };
        Self {
            group,
            role,
            state: SessionState::Uninitialized,
            store: None,
        }
    }

    /// Create a session and initialize it in one step
    pub fn connect<C>(group: G, connector: &C) -> BridgeResult<Self>
    where
        C: StoreConnector<Store = S>,
    {
        let mut session = Self::new(group);
        session.init(connector)?;
        Ok(session)
    }

    /// Open the store connection on the coordinator; mark workers idle.
    ///
    /// A no-op when already initialized. After `finalize` this re-opens the
    /// connection. If the connection fails the session stays as it was.
    ///
    /// Workers do not learn about a failed coordinator connection: they are
    /// `Idle` while the coordinator is not, so their next operation blocks
    /// on a coordinator that never joins. A `Connection` error on the
    /// coordinator must abort the whole group (e.g. `MPI_Abort`).
    pub fn init<C>(&mut self, connector: &C) -> BridgeResult<()>
    where
        C: StoreConnector<Store = S>,
    {
        if matches!(self.state, SessionState::Connected | SessionState::Idle) {
            return Ok(());
        }

        match self.role {
            Role::Coordinator => {
                let store = connector.connect()?;
                self.store = Some(store);
                self.state = SessionState::Connected;
                srmpi_info!(
                    "rank {}/{}: coordinator connected to store",
                    self.group.get_rank(),
                    self.group.get_world_size()
                );
            }
            Role::Worker => {
                self.state = SessionState::Idle;
            }
        }
        Ok(())
    }

    /// Close the coordinator's connection. Repeated calls are no-ops.
    pub fn finalize(&mut self) -> BridgeResult<()> {
        if self.state == SessionState::Finalized {
            return Ok(());
        }
        if self.store.take().is_some() {
            srmpi_info!("rank {}: store connection closed", self.group.get_rank());
        }
        self.state = SessionState::Finalized;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_coordinator(&self) -> bool {
        self.role == Role::Coordinator
    }

    pub fn rank(&self) -> i32 {
        self.group.get_rank()
    }

    pub fn size(&self) -> i32 {
        self.group.get_world_size()
    }

    pub fn group(&self) -> &G {
        &self.group
    }

    /// Write a step type as a length-1 INT32 tensor. Coordinator only;
    /// workers return immediately.
    pub fn put_step_type(&mut self, key: &str, step_type: i32) -> BridgeResult<()> {
        self.put_scalar(key, step_type)
    }

    /// Gather every rank's state shard and store the concatenation as DOUBLE
    pub fn put_state(&mut self, key: &str, state: &[f64]) -> BridgeResult<()> {
        self.put_gathered(key, state)
    }

    /// Gather every rank's reward shard and store the concatenation as DOUBLE
    pub fn put_reward(&mut self, key: &str, reward: &[f64]) -> BridgeResult<()> {
        self.put_gathered(key, reward)
    }

    /// Fetch the action tensor under `key` and scatter it so that each rank
    /// fills its `action` slice, whose length is the capacity it requests.
    ///
    /// The key is deleted after a successful read: an action is consumed
    /// exactly once. A stored tensor shorter or longer than the summed
    /// capacities is truncated or zero-padded. If the store read fails, every
    /// rank receives zeros and the coordinator returns the store error.
    pub fn get_action(&mut self, key: &str, action: &mut [f64]) -> BridgeResult<()> {
        self.take_scattered(key, action)
    }

    /// Gather every rank's info shard and store the concatenation as INT32
    pub fn put_info(&mut self, key: &str, info: &[i32]) -> BridgeResult<()> {
        self.put_gathered(key, info)
    }

    /// Write a real scalar as a length-1 DOUBLE tensor. Coordinator only;
    /// workers return immediately.
    pub fn put_real_scalar(&mut self, key: &str, value: f64) -> BridgeResult<()> {
        self.put_scalar(key, value)
    }

    fn ensure_ready(&self) -> BridgeResult<()> {
        match self.state {
            SessionState::Connected | SessionState::Idle => Ok(()),
            SessionState::Uninitialized => {
                Err(BridgeError::Invalid("session is not initialized".to_string()))
            }
            SessionState::Finalized => {
                Err(BridgeError::Invalid("session is finalized".to_string()))
            }
        }
    }

    fn coordinator_store(&mut self) -> BridgeResult<&mut S> {
        self.store.as_mut().ok_or_else(|| {
            BridgeError::Invalid("coordinator has no store connection".to_string())
        })
    }

    fn put_scalar<T: Element>(&mut self, key: &str, value: T) -> BridgeResult<()> {
        self.ensure_ready()?;
        if !self.is_coordinator() {
            return Ok(());
        }
        self.coordinator_store()?.put_tensor(key, &Tensor::scalar(value))
    }

    fn put_gathered<T: Element>(&mut self, key: &str, local: &[T]) -> BridgeResult<()> {
        self.ensure_ready()?;

        let aggregate = Aggregator::new(&self.group, COORDINATOR_RANK).gather(local)?;
        let Some(aggregate) = aggregate else {
            return Ok(());
        };

        srmpi_debug!("put {} ({} {} elements)", key, aggregate.len(), T::KIND);
        let tensor = Tensor::vector(aggregate.into_vec());
        self.coordinator_store()?.put_tensor(key, &tensor)
    }

    fn take_scattered<T: Element>(&mut self, key: &str, dest: &mut [T]) -> BridgeResult<()> {
        self.ensure_ready()?;

        let Some(plan) = exchange_sizes(&self.group, dest.len(), COORDINATOR_RANK)? else {
            return Distributor::new(&self.group, COORDINATOR_RANK).scatter_into(None, dest);
        };

        let (buffer, outcome) = match self.read_for_scatter::<T>(key, plan.total()) {
            Ok(buffer) => {
                let consumed = self
                    .coordinator_store()
                    .and_then(|store| store.delete_tensor(key));
                if let Err(e) = &consumed {
                    srmpi_warn!("delete of consumed {} failed: {}", key, e);
                }
                (buffer, consumed)
            }
            Err(e) => {
                srmpi_warn!("get {} failed, scattering zeros: {}", key, e);
                (vec![T::ZERO; plan.total()], Err(e))
            }
        };

        Distributor::new(&self.group, COORDINATOR_RANK).scatter_into(Some((&buffer, &plan)), dest)?;
        outcome
    }

    fn read_for_scatter<T: Element>(&mut self, key: &str, capacity: usize) -> BridgeResult<Vec<T>> {
        let tensor = self.coordinator_store()?.get_tensor(key, T::KIND)?;
        let mut buffer = vec![T::ZERO; capacity];
        if unpack_into(&tensor, &mut buffer)? {
            srmpi_warn!(
                "tensor {} holds {} elements but {} were requested; truncating or zero-filling",
                key,
                tensor.len(),
                capacity
            );
        }
        Ok(buffer)
    }
}

impl<G: ProcessGroup, S: TensorStore> Drop for Session<G, S> {
    fn drop(&mut self) {
        if self.state == SessionState::Connected {
            if let Err(e) = self.finalize() {
                srmpi_warn!("finalize on drop failed: {}", e);
            }
        }
    }
}
