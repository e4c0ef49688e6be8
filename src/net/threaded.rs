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

//! In-process process group
//!
//! Each rank is a thread. Ranks are wired pairwise with FIFO channels, so a
//! message from rank `a` to rank `b` is received in the order it was sent,
//! which gives the same cross-operation ordering MPI collectives have.

use std::any::Any;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread;

use crate::data_types::Element;
use crate::error::{BridgeError, BridgeResult};
use crate::net::ops::ShardPlan;
use crate::net::{CommType, ProcessGroup};
use crate::{srmpi_error, srmpi_trace};

type Payload = Box<dyn Any + Send>;

/// One member of an in-process group
pub struct ThreadedGroup {
    rank: i32,
    world_size: i32,
    /// `outbox[dest]` delivers to rank `dest`
    outbox: Vec<Sender<Payload>>,
    /// `inbox[source]` receives from rank `source`
    inbox: Vec<Receiver<Payload>>,
    barrier: Arc<Barrier>,
}

impl ThreadedGroup {
    /// Create all members of a group of `world_size` ranks, indexed by rank
    pub fn create(world_size: usize) -> BridgeResult<Vec<ThreadedGroup>> {
        if world_size == 0 {
            return Err(BridgeError::Invalid("a process group needs at least one rank".to_string()));
        }
        let size = i32::try_from(world_size).map_err(|_| {
            BridgeError::Invalid(format!("group size {} is too large", world_size))
        })?;

        let mut outboxes: Vec<Vec<Sender<Payload>>> =
            (0..world_size).map(|_| Vec::with_capacity(world_size)).collect();
        let mut inboxes = Vec::with_capacity(world_size);
        for _dest in 0..world_size {
            let (senders, receivers): (Vec<_>, Vec<_>) =
                (0..world_size).map(|_| mpsc::channel::<Payload>()).unzip();
            for (source, sender) in senders.into_iter().enumerate() {
                outboxes[source].push(sender);
            }
            inboxes.push(receivers);
        }

        let barrier = Arc::new(Barrier::new(world_size));
        Ok(outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| ThreadedGroup {
                rank: rank as i32,
                world_size: size,
                outbox,
                inbox,
                barrier: barrier.clone(),
            })
            .collect())
    }

    /// A group of one rank; every collective is an identity copy
    pub fn single() -> ThreadedGroup {
        let (sender, receiver) = mpsc::channel::<Payload>();
        ThreadedGroup {
            rank: 0,
            world_size: 1,
            outbox: vec![sender],
            inbox: vec![receiver],
            barrier: Arc::new(Barrier::new(1)),
        }
    }

    /// Run `f` once per rank on its own thread and collect the results by rank
    pub fn run<R, F>(world_size: usize, f: F) -> BridgeResult<Vec<R>>
    where
        R: Send,
        F: Fn(ThreadedGroup) -> R + Sync,
    {
        let members = Self::create(world_size)?;
        let f = &f;
        thread::scope(|scope| {
            let handles: Vec<_> = members
                .into_iter()
                .map(|member| scope.spawn(move || f(member)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle.join().map_err(|_| {
                        srmpi_error!("rank {} of {} panicked", rank, world_size);
                        BridgeError::Communication(format!("rank {} panicked", rank))
                    })
                })
                .collect()
        })
    }

    fn send_to<T: Element>(&self, dest: usize, values: Vec<T>) -> BridgeResult<()> {
        srmpi_trace!("rank {} -> rank {}: {} elements", self.rank, dest, values.len());
        self.outbox[dest].send(Box::new(values)).map_err(|_| {
            BridgeError::Communication(format!("rank {} has left the group", dest))
        })
    }

    fn recv_from<T: Element>(&self, source: usize) -> BridgeResult<Vec<T>> {
        let payload = self.inbox[source].recv().map_err(|_| {
            BridgeError::Communication(format!("rank {} has left the group", source))
        })?;
        payload.downcast::<Vec<T>>().map(|values| *values).map_err(|_| {
            BridgeError::Communication(format!(
                "rank {} sent a payload of another element kind than {}",
                source,
                T::KIND
            ))
        })
    }

    fn check_root(&self, root: i32) -> BridgeResult<usize> {
        if root < 0 || root >= self.world_size {
            return Err(BridgeError::Invalid(format!(
                "root {} is outside a group of {}",
                root, self.world_size
            )));
        }
        Ok(root as usize)
    }

    fn check_plan(&self, plan: &ShardPlan) -> BridgeResult<()> {
        if plan.world_size() != self.world_size as usize {
            return Err(BridgeError::Communication(format!(
                "plan covers {} ranks but the group has {}",
                plan.world_size(),
                self.world_size
            )));
        }
        Ok(())
    }
}

impl ProcessGroup for ThreadedGroup {
    fn get_rank(&self) -> i32 {
        self.rank
    }

    fn get_world_size(&self) -> i32 {
        self.world_size
    }

    fn get_comm_type(&self) -> CommType {
        CommType::Local
    }

    fn barrier(&self) -> BridgeResult<()> {
        self.barrier.wait();
        Ok(())
    }

    fn gather_count(&self, count: i32, root: i32) -> BridgeResult<Vec<i32>> {
        let root = self.check_root(root)?;
        if self.rank as usize != root {
            self.send_to(root, vec![count])?;
            return Ok(Vec::new());
        }

        let mut counts = Vec::with_capacity(self.world_size as usize);
        for source in 0..self.world_size as usize {
            if source == root {
                counts.push(count);
                continue;
            }
            let received: Vec<i32> = self.recv_from(source)?;
            let value = received.first().copied().ok_or_else(|| {
                BridgeError::Communication(format!("rank {} sent no count", source))
            })?;
            counts.push(value);
        }
        Ok(counts)
    }

    fn gather_varcount<T: Element>(
        &self,
        send: &[T],
        plan: Option<&ShardPlan>,
        root: i32,
    ) -> BridgeResult<Vec<T>> {
        let root = self.check_root(root)?;
        if self.rank as usize != root {
            self.send_to(root, send.to_vec())?;
            return Ok(Vec::new());
        }

        let plan = plan.ok_or_else(|| {
            BridgeError::Invalid("gather root needs a shard plan".to_string())
        })?;
        self.check_plan(plan)?;

        let mut recv = vec![T::ZERO; plan.total()];
        for source in 0..self.world_size as usize {
            let range = plan.shard_range(source);
            if source == root {
                if send.len() != range.len() {
                    return Err(BridgeError::Communication(format!(
                        "root shard has {} elements but declared {}",
                        send.len(),
                        range.len()
                    )));
                }
                recv[range].copy_from_slice(send);
                continue;
            }
            let shard: Vec<T> = self.recv_from(source)?;
            if shard.len() != range.len() {
                return Err(BridgeError::Communication(format!(
                    "rank {} sent {} elements but declared {}",
                    source,
                    shard.len(),
                    range.len()
                )));
            }
            recv[range].copy_from_slice(&shard);
        }
        Ok(recv)
    }

    fn scatter_varcount<T: Element>(
        &self,
        send: Option<(&[T], &ShardPlan)>,
        recv_count: usize,
        root: i32,
    ) -> BridgeResult<Vec<T>> {
        let root = self.check_root(root)?;
        if self.rank as usize != root {
            let shard: Vec<T> = self.recv_from(root)?;
            if shard.len() != recv_count {
                return Err(BridgeError::Communication(format!(
                    "received {} elements but expected {}",
                    shard.len(),
                    recv_count
                )));
            }
            return Ok(shard);
        }

        let (buffer, plan) = send.ok_or_else(|| {
            BridgeError::Invalid("scatter root needs a source buffer".to_string())
        })?;
        self.check_plan(plan)?;
        if buffer.len() != plan.total() {
            return Err(BridgeError::Communication(format!(
                "scatter source holds {} elements but the plan totals {}",
                buffer.len(),
                plan.total()
            )));
        }

        let mut own = Vec::new();
        for dest in 0..self.world_size as usize {
            let shard = buffer[plan.shard_range(dest)].to_vec();
            if dest == root {
                own = shard;
            } else {
                self.send_to(dest, shard)?;
            }
        }
        if own.len() != recv_count {
            return Err(BridgeError::Communication(format!(
                "root shard has {} elements but expected {}",
                own.len(),
                recv_count
            )));
        }
        Ok(own)
    }
}
