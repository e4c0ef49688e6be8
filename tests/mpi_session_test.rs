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

//! Session over MPI
//!
//! MPI can be initialized once per process, so the whole sequence lives in
//! one test. Run with several ranks, e.g.
//! `mpirun -n 3 cargo test --features mpi --test mpi_session_test`.
//! Each rank uses its own `MemoryStore`; only rank 0's ever receives data.

#[cfg(feature = "mpi")]
#[test]
fn test_mpi_session_step() {
    use smartredis_mpi::{
        MemoryStore, MpiProcessGroup, ProcessGroup, Session, SessionState, TensorStore,
        COORDINATOR_RANK,
    };

    let _ = smartredis_mpi::util::logging::try_init_logging();

    let group = MpiProcessGroup::make().unwrap();
    let rank = group.get_rank();
    let size = group.get_world_size();

    let store = MemoryStore::new();
    let total: usize = (0..size).map(|r| r as usize + 1).sum();
    if rank == COORDINATOR_RANK {
        let action: Vec<f64> = (0..total).map(|i| i as f64).collect();
        store
            .clone()
            .put_tensor("action", &smartredis_mpi::Tensor::vector(action))
            .unwrap();
    }

    let mut session = Session::connect(group, &store).unwrap();
    if rank == COORDINATOR_RANK {
        assert_eq!(session.state(), SessionState::Connected);
    } else {
        assert_eq!(session.state(), SessionState::Idle);
    }

    // Rank r holds r + 1 state values
    let state = vec![rank as f64; rank as usize + 1];
    session.put_state("state", &state).unwrap();
    session.put_info("info", &[rank]).unwrap();
    session.put_step_type("step_type", 1).unwrap();

    let mut action = vec![-1.0f64; rank as usize + 1];
    session.get_action("action", &mut action).unwrap();
    let offset: usize = (0..rank).map(|r| r as usize + 1).sum();
    let expected: Vec<f64> = (offset..offset + action.len()).map(|i| i as f64).collect();
    assert_eq!(action, expected);

    if rank == COORDINATOR_RANK {
        let stored = store.peek("state").unwrap().expect("state was stored");
        assert_eq!(stored.len(), total);
        let info = store.peek("info").unwrap().expect("info was stored");
        let ranks: Vec<i32> = (0..size).collect();
        assert_eq!(info.values::<i32>().unwrap(), ranks.as_slice());
        assert!(store.peek("action").unwrap().is_none());
    } else {
        assert!(store.is_empty().unwrap());
    }

    session.group().barrier().unwrap();
    session.finalize().unwrap();
}
