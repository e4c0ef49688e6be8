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

//! Tests for the aggregation and distribution collectives
//!
//! Ranks run as threads of one process through `ThreadedGroup`.

use std::thread;
use std::time::Duration;

use smartredis_mpi::error::{BridgeError, BridgeResult};
use smartredis_mpi::net::ops::exchange_sizes;
use smartredis_mpi::{Aggregator, CommType, Distributor, ProcessGroup, ThreadedGroup};

/// Rank-dependent shard so misplaced data is visible
fn local_shard(rank: i32, len: usize) -> Vec<f64> {
    (0..len).map(|i| rank as f64 * 100.0 + i as f64).collect()
}

fn collect<R>(results: Vec<BridgeResult<R>>) -> BridgeResult<Vec<R>> {
    results.into_iter().collect()
}

// ============================================================================
// Threaded group basics
// ============================================================================

#[test]
fn test_create_group_ranks() -> BridgeResult<()> {
    let members = ThreadedGroup::create(4)?;

    assert_eq!(members.len(), 4);
    for (i, member) in members.iter().enumerate() {
        assert_eq!(member.get_rank(), i as i32);
        assert_eq!(member.get_world_size(), 4);
        assert_eq!(member.get_comm_type(), CommType::Local);
    }
    Ok(())
}

#[test]
fn test_create_empty_group_fails() {
    match ThreadedGroup::create(0) {
        Err(BridgeError::Invalid(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("empty group should be rejected"),
    }
}

#[test]
fn test_barrier() -> BridgeResult<()> {
    let results = ThreadedGroup::run(3, |group| group.barrier())?;
    collect(results)?;
    Ok(())
}

#[test]
fn test_gather_count_in_rank_order() -> BridgeResult<()> {
    let results = ThreadedGroup::run(4, |group| {
        group.gather_count(10 + group.get_rank(), 0)
    })?;
    let counts = collect(results)?;

    assert_eq!(counts[0], vec![10, 11, 12, 13]);
    for worker in &counts[1..] {
        assert!(worker.is_empty());
    }
    Ok(())
}

#[test]
fn test_run_reports_panicked_rank() {
    let result = ThreadedGroup::run(2, |group| {
        if group.get_rank() == 1 {
            panic!("simulated rank failure");
        }
        group.get_rank()
    });

    match result {
        Err(e) => assert!(matches!(e, BridgeError::Communication(_)), "{}", e),
        Ok(ranks) => panic!("a panicked rank should fail the run, got {:?}", ranks),
    }
}

// ============================================================================
// Aggregator
// ============================================================================

#[test]
fn test_gather_three_ranks_layout() -> BridgeResult<()> {
    let lengths = [2usize, 3, 1];

    let results = ThreadedGroup::run(3, |group| {
        let rank = group.get_rank();
        let local = local_shard(rank, lengths[rank as usize]);
        Aggregator::new(&group, 0).gather(&local)
    })?;
    let mut buffers = collect(results)?;

    let aggregate = buffers[0].take().expect("root holds the aggregate");
    assert_eq!(aggregate.len(), 6);
    assert_eq!(aggregate.plan().displs(), &[0, 2, 5]);
    assert_eq!(
        aggregate.as_slice(),
        &[0.0, 1.0, 100.0, 101.0, 102.0, 200.0]
    );
    assert_eq!(aggregate.shard(1), &[100.0, 101.0, 102.0]);

    assert!(buffers[1].is_none());
    assert!(buffers[2].is_none());
    Ok(())
}

#[test]
fn test_gather_layout_independent_of_arrival_order() -> BridgeResult<()> {
    // Higher ranks reach the gather first
    let results = ThreadedGroup::run(4, |group| {
        let rank = group.get_rank();
        thread::sleep(Duration::from_millis(10 * (4 - rank as u64)));
        let local = vec![rank; (rank + 1) as usize];
        Aggregator::new(&group, 0).gather(&local)
    })?;
    let mut buffers = collect(results)?;

    let aggregate = buffers[0].take().expect("root holds the aggregate");
    assert_eq!(aggregate.as_slice(), &[0, 1, 1, 2, 2, 2, 3, 3, 3, 3]);
    Ok(())
}

#[test]
fn test_gather_with_empty_shards() -> BridgeResult<()> {
    let lengths = [0usize, 2, 0];

    let results = ThreadedGroup::run(3, |group| {
        let rank = group.get_rank();
        let local = local_shard(rank, lengths[rank as usize]);
        Aggregator::new(&group, 0).gather(&local)
    })?;
    let mut buffers = collect(results)?;

    let aggregate = buffers[0].take().expect("root holds the aggregate");
    assert_eq!(aggregate.as_slice(), &[100.0, 101.0]);
    assert!(aggregate.shard(0).is_empty());
    Ok(())
}

#[test]
fn test_gather_to_non_zero_root() -> BridgeResult<()> {
    let results = ThreadedGroup::run(3, |group| {
        let rank = group.get_rank();
        let local = vec![rank * 10];
        Aggregator::new(&group, 2).gather(&local)
    })?;
    let buffers = collect(results)?;

    assert!(buffers[0].is_none());
    assert!(buffers[1].is_none());
    let aggregate = buffers[2].as_ref().expect("rank 2 is the root");
    assert_eq!(aggregate.as_slice(), &[0, 10, 20]);
    Ok(())
}

#[test]
fn test_execute_without_plan_on_root_fails() {
    let group = ThreadedGroup::single();
    let result = Aggregator::new(&group, 0).execute(&[1.0f64], None);
    assert!(matches!(result, Err(BridgeError::Invalid(_))));
}

// ============================================================================
// Distributor
// ============================================================================

#[test]
fn test_scatter_three_ranks() -> BridgeResult<()> {
    let capacities = [2usize, 3, 1];

    let results = ThreadedGroup::run(3, |group| -> BridgeResult<Vec<f64>> {
        let rank = group.get_rank();
        let mut dest = vec![-1.0f64; capacities[rank as usize]];
        let plan = exchange_sizes(&group, dest.len(), 0)?;
        let source: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        let distributor = Distributor::new(&group, 0);
        match plan {
            Some(plan) => distributor.scatter_into(Some((source.as_slice(), &plan)), &mut dest)?,
            None => distributor.scatter_into(None, &mut dest)?,
        }
        Ok(dest)
    })?;
    let shards = collect(results)?;

    assert_eq!(shards[0], vec![0.0, 0.5]);
    assert_eq!(shards[1], vec![1.0, 1.5, 2.0]);
    assert_eq!(shards[2], vec![2.5]);
    Ok(())
}

#[test]
fn test_scatter_rejects_short_source() -> BridgeResult<()> {
    let group = ThreadedGroup::single();
    let plan = exchange_sizes(&group, 3, 0)?.expect("single rank is the root");

    let result = Distributor::new(&group, 0).execute(Some((&[1.0f64, 2.0][..], &plan)), 3);
    assert!(matches!(result, Err(BridgeError::Communication(_))));
    Ok(())
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_gather_then_scatter_returns_each_shard() -> BridgeResult<()> {
    let lengths = [3usize, 0, 5, 1, 2];

    let results = ThreadedGroup::run(lengths.len(), |group| -> BridgeResult<_> {
        let rank = group.get_rank();
        let local = local_shard(rank, lengths[rank as usize]);

        let aggregate = Aggregator::new(&group, 0).gather(&local)?;
        let source = aggregate.as_ref().map(|a| (a.as_slice(), a.plan()));
        let returned = Distributor::new(&group, 0).execute(source, local.len())?;

        Ok((local, returned))
    })?;

    for (rank, pair) in collect(results)?.into_iter().enumerate() {
        let (local, returned) = pair;
        assert_eq!(local, returned, "rank {} got a different shard back", rank);
    }
    Ok(())
}

#[test]
fn test_single_rank_collectives_are_identity() -> BridgeResult<()> {
    let group = ThreadedGroup::single();
    let local = vec![3, 1, 4, 1, 5];

    let aggregate = Aggregator::new(&group, 0)
        .gather(&local)?
        .expect("single rank is the root");
    assert_eq!(aggregate.plan().displs(), &[0]);
    assert_eq!(aggregate.as_slice(), local.as_slice());

    let mut dest = vec![0; local.len()];
    Distributor::new(&group, 0).scatter_into(Some((aggregate.as_slice(), aggregate.plan())), &mut dest)?;
    assert_eq!(dest, local);
    Ok(())
}

#[test]
fn test_consecutive_operations_do_not_interleave() -> BridgeResult<()> {
    let results = ThreadedGroup::run(3, |group| -> BridgeResult<_> {
        let rank = group.get_rank();
        let first = Aggregator::new(&group, 0).gather(&[rank])?;
        let second = Aggregator::new(&group, 0).gather(&[rank + 10, rank + 20])?;
        Ok((first, second))
    })?;
    let mut pairs = collect(results)?;

    let (first, second) = pairs.remove(0);
    assert_eq!(first.expect("root").as_slice(), &[0, 1, 2]);
    assert_eq!(second.expect("root").as_slice(), &[10, 20, 11, 21, 12, 22]);
    Ok(())
}
