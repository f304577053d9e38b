use std::{collections::HashSet, thread::scope};

use crate::{
    AllocStatus, AtomicAllocator, BasicAllocator, BitLayout, Error, LockAllocator,
    SequenceAllocator, SequencePolicy, TimeUnit,
};

trait AllocStatusExt {
    fn unwrap_ready(self) -> (u64, u64);
    fn unwrap_pending(self) -> u64;
}

impl AllocStatusExt for AllocStatus {
    fn unwrap_ready(self) -> (u64, u64) {
        match self {
            Self::Ready { tick, sequence } => (tick, sequence),
            Self::Pending { yield_for } => panic!("unexpected pending (yield for: {yield_for})"),
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { tick, sequence } => panic!("unexpected ready ({tick}, {sequence})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn policy(max_rollback: u64) -> SequencePolicy {
    let layout = BitLayout::new(41, 5, 5, 12, 0, TimeUnit::Millis).unwrap();
    SequencePolicy::new(&layout, max_rollback)
}

fn run_sequence_increments_within_same_tick<A: SequenceAllocator>() {
    let allocator = A::new(policy(0));
    for expected in 0..3 {
        let (tick, sequence) = allocator.try_allocate(|| Ok(42)).unwrap().unwrap_ready();
        assert_eq!((tick, sequence), (42, expected));
    }
}

fn run_pending_when_sequence_exhausted<A: SequenceAllocator>() {
    let policy = policy(0);
    let allocator = A::new(policy);
    for expected in 0..=policy.max_sequence() {
        let (_, sequence) = allocator.try_allocate(|| Ok(42)).unwrap().unwrap_ready();
        assert_eq!(sequence, expected);
    }

    assert_eq!(allocator.try_allocate(|| Ok(42)).unwrap().unwrap_pending(), 1);

    let (tick, sequence) = allocator.try_allocate(|| Ok(43)).unwrap().unwrap_ready();
    assert_eq!((tick, sequence), (43, 0));
}

fn run_rollback_is_reported<A: SequenceAllocator>() {
    let allocator = A::new(policy(0));
    allocator.try_allocate(|| Ok(42)).unwrap().unwrap_ready();

    let err = allocator.try_allocate(|| Ok(41)).unwrap_err();
    assert_eq!(err, Error::ClockRollback {
        last_tick: 42,
        current_tick: 41,
        behind: 1,
    });

    let (tick, sequence) = allocator.try_allocate(|| Ok(42)).unwrap().unwrap_ready();
    assert_eq!((tick, sequence), (42, 1));
}

fn run_clock_errors_pass_through<A: SequenceAllocator>() {
    let allocator = A::new(policy(0));
    let err = allocator
        .try_allocate(|| Err(Error::ClockBeforeEpoch { tick: 1, epoch: 2 }))
        .unwrap_err();
    assert_eq!(err, Error::ClockBeforeEpoch { tick: 1, epoch: 2 });

    let (_, sequence) = allocator.try_allocate(|| Ok(5)).unwrap().unwrap_ready();
    assert_eq!(sequence, 0);
}

fn run_threaded_pairs_are_unique<A: SequenceAllocator + Sync>() {
    const THREADS: usize = 8;
    const PER_THREAD: u64 = 2048;

    // Every thread sees the same frozen tick until the sequence runs out,
    // then the tick is bumped by whichever thread observes exhaustion.
    let allocator = A::new(policy(0));
    let tick = portable_atomic::AtomicU64::new(0);

    let pairs: Vec<(u64, u64)> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    let mut out = Vec::new();
                    while out.len() < PER_THREAD as usize {
                        let now = tick.load(portable_atomic::Ordering::SeqCst);
                        match allocator.try_allocate(|| Ok(now)) {
                            Ok(AllocStatus::Ready { tick, sequence }) => {
                                out.push((tick, sequence));
                            }
                            Ok(AllocStatus::Pending { yield_for: 1 }) => {
                                let _ = tick.compare_exchange(
                                    now,
                                    now + 1,
                                    portable_atomic::Ordering::SeqCst,
                                    portable_atomic::Ordering::SeqCst,
                                );
                            }
                            Ok(AllocStatus::Pending { .. }) => {}
                            // A stale `now` read before another thread bumped the tick
                            Err(e) => assert!(e.is_clock_rollback()),
                        }
                    }
                    out
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = pairs.iter().copied().collect();
    assert_eq!(unique.len(), pairs.len());
}

#[test]
fn basic_sequence_increments_within_same_tick() {
    run_sequence_increments_within_same_tick::<BasicAllocator>();
}

#[test]
fn lock_sequence_increments_within_same_tick() {
    run_sequence_increments_within_same_tick::<LockAllocator>();
}

#[test]
fn atomic_sequence_increments_within_same_tick() {
    run_sequence_increments_within_same_tick::<AtomicAllocator>();
}

#[test]
fn basic_pending_when_sequence_exhausted() {
    run_pending_when_sequence_exhausted::<BasicAllocator>();
}

#[test]
fn lock_pending_when_sequence_exhausted() {
    run_pending_when_sequence_exhausted::<LockAllocator>();
}

#[test]
fn atomic_pending_when_sequence_exhausted() {
    run_pending_when_sequence_exhausted::<AtomicAllocator>();
}

#[test]
fn basic_rollback_is_reported() {
    run_rollback_is_reported::<BasicAllocator>();
}

#[test]
fn lock_rollback_is_reported() {
    run_rollback_is_reported::<LockAllocator>();
}

#[test]
fn atomic_rollback_is_reported() {
    run_rollback_is_reported::<AtomicAllocator>();
}

#[test]
fn clock_errors_pass_through() {
    run_clock_errors_pass_through::<BasicAllocator>();
    run_clock_errors_pass_through::<LockAllocator>();
    run_clock_errors_pass_through::<AtomicAllocator>();
}

#[test]
fn lock_threaded_pairs_are_unique() {
    run_threaded_pairs_are_unique::<LockAllocator>();
}

#[test]
fn atomic_threaded_pairs_are_unique() {
    run_threaded_pairs_are_unique::<AtomicAllocator>();
}
