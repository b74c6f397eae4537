//! Property tests: bucket membership and timed-queue ordering hold under
//! arbitrary interleavings of starts, stops, pauses and updates.

use proptest::prelude::*;
use routine_engine::{from_iter, BucketKind, RoutineHandle, Scheduler, Waitable};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Wait {
    Tick,
    Millis(u64),
    EndOfPass,
    FixedStep,
}

impl Wait {
    fn to_waitable(&self) -> Waitable {
        match self {
            Wait::Tick => Waitable::Tick,
            Wait::Millis(ms) => Waitable::millis(*ms),
            Wait::EndOfPass => Waitable::EndOfPass,
            Wait::FixedStep => Waitable::FixedStep,
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Start(Vec<Wait>),
    Stop(usize),
    Pause(usize),
    Unpause(usize),
    Update(u64),
    FixedUpdate(u64),
    StopAll,
}

fn arb_wait() -> impl Strategy<Value = Wait> {
    prop_oneof![
        3 => Just(Wait::Tick),
        4 => (0u64..200).prop_map(Wait::Millis),
        1 => Just(Wait::EndOfPass),
        1 => Just(Wait::FixedStep),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => prop::collection::vec(arb_wait(), 0..6).prop_map(Op::Start),
        1 => any::<usize>().prop_map(Op::Stop),
        1 => any::<usize>().prop_map(Op::Pause),
        1 => any::<usize>().prop_map(Op::Unpause),
        4 => (0u64..120).prop_map(Op::Update),
        2 => (0u64..50).prop_map(Op::FixedUpdate),
        1 => Just(Op::StopAll),
    ]
}

fn pick(handles: &[RoutineHandle], index: usize) -> Option<&RoutineHandle> {
    if handles.is_empty() {
        None
    } else {
        handles.get(index % handles.len())
    }
}

fn check_invariants(scheduler: &Scheduler, handles: &[RoutineHandle]) {
    let stats = scheduler.stats();
    assert_eq!(stats.alive(), scheduler.alive_count());

    let live = scheduler.routines();
    assert_eq!(live.len(), scheduler.alive_count());
    assert!(live.iter().all(|h| h.is_alive()));

    for handle in handles {
        assert_eq!(handle.is_alive(), handle.bucket().is_some());
        assert_eq!(handle.is_alive(), handle.depth() > 0);
    }

    let dues: Vec<u64> = live
        .iter()
        .filter(|h| h.bucket() == Some(BucketKind::Timed))
        .map(|h| h.due_ms().unwrap_or(0))
        .collect();
    assert!(dues.windows(2).all(|w| w[0] <= w[1]), "timed queue out of order: {:?}", dues);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every live routine sits in exactly one bucket and the timed queue stays
    /// sorted, whatever sequence of operations is applied.
    #[test]
    fn bucket_invariants_hold(ops in prop::collection::vec(arb_op(), 1..60)) {
        let scheduler = Scheduler::default();
        let stops = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&stops);
        scheduler.on_stopped(move |_| counter.set(counter.get() + 1));

        let mut handles = Vec::new();
        for op in ops {
            match op {
                Op::Start(script) => {
                    let waits: Vec<Waitable> = script.iter().map(Wait::to_waitable).collect();
                    handles.push(scheduler.start(from_iter(waits)).unwrap());
                }
                Op::Stop(i) => {
                    if let Some(handle) = pick(&handles, i) {
                        let was_alive = handle.is_alive();
                        prop_assert_eq!(scheduler.stop(handle), was_alive);
                        prop_assert!(!handle.is_alive());
                    }
                }
                Op::Pause(i) => {
                    if let Some(handle) = pick(&handles, i) {
                        handle.pause();
                    }
                }
                Op::Unpause(i) => {
                    if let Some(handle) = pick(&handles, i) {
                        handle.unpause();
                    }
                }
                Op::Update(ms) => scheduler.update(ms).unwrap(),
                Op::FixedUpdate(ms) => scheduler.fixed_update(ms).unwrap(),
                Op::StopAll => {
                    scheduler.stop_all();
                    prop_assert_eq!(scheduler.alive_count(), 0);
                }
            }
            check_invariants(&scheduler, &handles);
        }

        let finished = handles.iter().filter(|h| !h.is_alive()).count();
        prop_assert_eq!(stops.get(), finished);
    }

    /// Timed routines resume in due-time order, first come first served on
    /// ties, and never before their due time.
    #[test]
    fn timed_routines_resume_in_due_order(
        waits in prop::collection::vec(0u64..500, 1..24),
        deltas in prop::collection::vec(1u64..150, 1..40),
    ) {
        let scheduler = Scheduler::default();
        let resumed: Rc<RefCell<Vec<(u64, usize)>>> = Rc::new(RefCell::new(Vec::new()));

        for (index, ms) in waits.iter().enumerate() {
            let log = Rc::clone(&resumed);
            let mut waited = false;
            let ms = *ms;
            scheduler
                .start(routine_engine::from_fn(move || {
                    if waited {
                        let now = routine_engine::current_scheduler()?.elapsed_ms();
                        log.borrow_mut().push((now, index));
                        return Ok(None);
                    }
                    waited = true;
                    Ok(Some(Waitable::millis(ms)))
                }))
                .unwrap();
        }

        // first pass starts every wait at elapsed 0
        scheduler.update(0).unwrap();
        for delta in deltas {
            scheduler.update(delta).unwrap();
        }

        let resumed = resumed.borrow();
        for &(now, index) in resumed.iter() {
            prop_assert!(now >= waits[index]);
        }
        for pair in resumed.windows(2) {
            let (a, b) = (pair[0].1, pair[1].1);
            prop_assert!(
                (waits[a], a) <= (waits[b], b) || pair[0].0 < pair[1].0,
                "resumed {} (due {}) before {} (due {}) in the same pass",
                a, waits[a], b, waits[b]
            );
        }
        let elapsed = scheduler.elapsed_ms();
        let expected = waits.iter().filter(|ms| **ms <= elapsed).count();
        prop_assert_eq!(resumed.len(), expected);
    }
}
