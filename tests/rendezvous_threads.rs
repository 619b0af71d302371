//! End-to-end rendezvous scenarios with real threads.
//!
//! Each test runs one or more worker threads against a controller and checks
//! the controller-side outcome, including that worker-side writes are visible
//! after the wait returns.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use syncpoint::{Failure, Rendezvous, Verifier, WaitError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, PartialEq, Eq)]
struct BrokenPipe;

impl fmt::Display for BrokenPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pipe closed mid-transfer")
    }
}

impl Error for BrokenPipe {}

#[test]
fn single_worker_resume() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());

    let remote = Arc::clone(&rendezvous);
    let worker = thread::spawn(move || remote.signal());

    assert!(rendezvous.wait_timeout(Duration::from_secs(5), 1).is_ok());
    worker.join().expect("worker panicked");
}

#[test]
fn five_workers_counted_rendezvous() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());
    let done = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..5)
        .map(|_| {
            let remote = Arc::clone(&rendezvous);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                done.fetch_add(1, Ordering::SeqCst);
                remote.signal();
            })
        })
        .collect();

    assert!(rendezvous.wait_timeout(Duration::from_secs(5), 5).is_ok());
    // The wait only returns once every worker has run.
    assert_eq!(done.load(Ordering::SeqCst), 5);

    for worker in workers {
        worker.join().expect("worker panicked");
    }
}

#[test]
fn worker_failure_is_relayed_with_payload() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());

    let remote = Arc::clone(&rendezvous);
    let worker = thread::spawn(move || {
        remote.report_failure(Failure::with_source("transfer check failed", BrokenPipe));
    });

    let err = rendezvous
        .wait_timeout(Duration::from_secs(5), 1)
        .expect_err("worker reported a failure");
    let failure = err.into_failure().expect("relayed failure");
    assert_eq!(failure.message(), "transfer check failed");
    let source = failure.source().expect("original error attached");
    assert_eq!(source.downcast_ref::<BrokenPipe>(), Some(&BrokenPipe));

    worker.join().expect("worker panicked");
}

#[test]
fn silence_resolves_by_timeout() {
    init_tracing();
    let rendezvous = Rendezvous::new();
    let start = Instant::now();

    let err = rendezvous
        .wait_timeout(Duration::from_millis(1), 1)
        .expect_err("nothing ever signals");
    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(1));
}

#[test]
fn worker_writes_are_visible_after_wait() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());
    let results = Arc::new(Mutex::new(Vec::new()));

    let workers: Vec<_> = (0..4u32)
        .map(|id| {
            let remote = Arc::clone(&rendezvous);
            let results = Arc::clone(&results);
            thread::spawn(move || {
                results.lock().expect("results lock poisoned").push(id * id);
                remote.signal();
            })
        })
        .collect();

    assert!(rendezvous.wait_timeout(Duration::from_secs(5), 4).is_ok());

    let mut results = results.lock().expect("results lock poisoned").clone();
    results.sort_unstable();
    assert_eq!(results, vec![0, 1, 4, 9]);

    for worker in workers {
        worker.join().expect("worker panicked");
    }
}

#[test]
fn instance_is_reusable_across_many_episodes() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());

    for round in 0..10usize {
        let parties = 1 + round % 4;
        let workers: Vec<_> = (0..parties)
            .map(|_| {
                let remote = Arc::clone(&rendezvous);
                thread::spawn(move || remote.signal())
            })
            .collect();

        assert!(
            rendezvous
                .wait_timeout(Duration::from_secs(5), parties)
                .is_ok(),
            "round {round} did not complete"
        );
        for worker in workers {
            worker.join().expect("worker panicked");
        }
    }
}

#[test]
fn cancellation_releases_a_parked_controller() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());

    let remote = Arc::clone(&rendezvous);
    let canceller = thread::spawn(move || {
        while !remote.is_armed() {
            thread::yield_now();
        }
        remote.cancel();
    });

    let err = rendezvous.wait(1).expect_err("cancelled externally");
    assert!(matches!(err, WaitError::Cancelled));
    canceller.join().expect("canceller panicked");

    // The instance survives cancellation and runs a clean episode.
    rendezvous.signal();
    assert!(rendezvous.wait_timeout(Duration::from_secs(5), 1).is_ok());
}

#[test]
fn verifier_relays_worker_assertions() {
    init_tracing();
    let verifier = Arc::new(Verifier::new());

    let worker = Arc::clone(&verifier);
    thread::spawn(move || {
        let status = 500u16;
        if worker.expect_eq(status, 200u16) {
            worker.signal();
        }
    });

    let err = verifier.wait().expect_err("status check fails");
    let failure = err.into_failure().expect("relayed failure");
    assert_eq!(failure.message(), "expected `500` to equal `200`");
}

#[test]
fn verifier_collects_many_passing_workers() {
    init_tracing();
    let verifier = Arc::new(Verifier::new());

    let workers: Vec<_> = (0..8u64)
        .map(|seed| {
            let worker = Arc::clone(&verifier);
            thread::spawn(move || {
                worker.expect_true(seed.wrapping_mul(seed) >= seed);
                worker.signal();
            })
        })
        .collect();

    assert!(verifier.wait_for(8).is_ok());
    for worker in workers {
        worker.join().expect("worker panicked");
    }
}

#[test]
fn failure_beats_outstanding_signals_under_contention() {
    init_tracing();
    let rendezvous = Arc::new(Rendezvous::new());

    let signaller = {
        let remote = Arc::clone(&rendezvous);
        thread::spawn(move || remote.signal())
    };
    let failer = {
        let remote = Arc::clone(&rendezvous);
        thread::spawn(move || remote.report_failure("one of three gave up"))
    };

    // Expecting three signals but only one arrives; the failure must win
    // before the deadline does.
    let err = rendezvous
        .wait_timeout(Duration::from_secs(5), 3)
        .expect_err("failure short-circuits");
    assert!(matches!(err, WaitError::Failure(_)));

    signaller.join().expect("signaller panicked");
    failer.join().expect("failer panicked");
}
