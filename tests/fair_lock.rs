use fairlock::{const_fair_lock, FairLock};
use std::{
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

#[test]
fn mutual_exclusion() {
    const THREADS: usize = 8;
    const ITERS: usize = 1000;

    let lock = Arc::new(FairLock::new(0usize));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..ITERS {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*lock.lock(), THREADS * ITERS);
}

#[test]
fn mutual_exclusion_many_threads() {
    const THREADS: usize = 1000;

    let lock = Arc::new(FairLock::new(0usize));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || *lock.lock() += 1)
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*lock.lock(), THREADS);
}

#[test]
fn handoff_follows_arrival_order() {
    const WAITERS: usize = 50;

    let lock = Arc::new(FairLock::new(()));
    let (started_tx, started_rx) = mpsc::channel();
    let (acquired_tx, acquired_rx) = mpsc::channel();

    let guard = lock.lock();

    let mut handles = Vec::with_capacity(WAITERS);
    for i in 0..WAITERS {
        let lock = Arc::clone(&lock);
        let started_tx = started_tx.clone();
        let acquired_tx = acquired_tx.clone();
        handles.push(thread::spawn(move || {
            started_tx.send(i).unwrap();
            let _guard = lock.lock();
            acquired_tx.send(i).unwrap();
        }));

        // wait for the thread to start, then give it time to reach its
        // place in the wait queue before launching the next one
        started_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(5));
    }

    drop(guard);
    for handle in handles {
        handle.join().unwrap();
    }

    let observed: Vec<usize> = acquired_rx.try_iter().collect();
    assert_eq!(observed.len(), WAITERS);

    // exact arrival order, with a small allowance for a thread that was
    // slow to enter its acquire call before its successor
    let disorder: usize = observed
        .iter()
        .enumerate()
        .map(|(pos, &i)| if pos > i { pos - i } else { i - pos })
        .sum();
    assert!(
        disorder <= 2,
        "handoff order {:?} diverged from arrival order",
        observed,
    );
}

#[test]
fn releaser_cannot_overtake_queued_waiter() {
    let lock = Arc::new(FairLock::new(Vec::new()));
    let (waiting_tx, waiting_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();

    let guard = lock.lock();

    let waiter = thread::spawn({
        let lock = Arc::clone(&lock);
        move || {
            waiting_tx.send(()).unwrap();
            let mut order = lock.lock();
            order.push("waiter");
            resume_rx.recv().unwrap();
            drop(order);
        }
    });

    waiting_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));

    // the release hands the baton to the queued waiter; until the waiter
    // resumes and releases in turn, nobody else may claim the lock
    drop(guard);
    assert!(
        lock.try_lock().is_none(),
        "fresh acquirer barged ahead of a queued waiter",
    );

    resume_tx.send(()).unwrap();
    let mut order = lock.lock();
    order.push("releaser");
    drop(order);

    waiter.join().unwrap();
    assert_eq!(*lock.lock(), ["waiter", "releaser"]);
}

#[test]
#[should_panic(expected = "released while not locked")]
fn release_without_hold_panics() {
    use lock_api::RawMutex;

    let raw = fairlock::RawFairLock::INIT;
    unsafe { raw.unlock() };
}

#[test]
#[should_panic(expected = "released while not locked")]
fn double_release_panics() {
    use lock_api::RawMutex;

    let raw = fairlock::RawFairLock::INIT;
    raw.lock();
    unsafe {
        raw.unlock();
        raw.unlock();
    }
}

#[test]
fn panic_inside_critical_section_releases_lock() {
    let lock = Arc::new(FairLock::new(()));

    let result = thread::spawn({
        let lock = Arc::clone(&lock);
        move || {
            let _guard = lock.lock();
            panic!("poisoned on purpose");
        }
    })
    .join();

    assert!(result.is_err());
    assert!(lock.try_lock().is_some());
}

#[test]
fn timed_acquire_succeeds_once_released() {
    let lock = Arc::new(FairLock::new(()));
    let guard = lock.lock();

    let waiter = thread::spawn({
        let lock = Arc::clone(&lock);
        move || {
            let guard = lock.try_lock_for(Duration::from_secs(10));
            assert!(guard.is_some());
        }
    });

    thread::sleep(Duration::from_millis(50));
    drop(guard);
    waiter.join().unwrap();
}

#[test]
fn timed_acquire_gives_up_without_disturbing_queue() {
    let lock = Arc::new(FairLock::new(Vec::new()));
    let (waiting_tx, waiting_rx) = mpsc::channel();

    let guard = lock.lock();

    let patient = thread::spawn({
        let lock = Arc::clone(&lock);
        let waiting_tx = waiting_tx.clone();
        move || {
            waiting_tx.send(()).unwrap();
            lock.lock().push("patient");
        }
    });
    waiting_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));

    let impatient = thread::spawn({
        let lock = Arc::clone(&lock);
        move || {
            waiting_tx.send(()).unwrap();
            assert!(lock.try_lock_for(Duration::from_millis(100)).is_none());
        }
    });
    waiting_rx.recv().unwrap();

    // outlive the impatient waiter's deadline before releasing
    thread::sleep(Duration::from_millis(300));
    drop(guard);

    patient.join().unwrap();
    impatient.join().unwrap();
    assert_eq!(*lock.lock(), ["patient"]);
}

static COUNTER: FairLock<usize> = const_fair_lock(0);

#[test]
fn const_initialized_lock() {
    *COUNTER.lock() += 1;
    assert!(*COUNTER.lock() >= 1);
    assert!(!COUNTER.is_locked());
}

#[test]
fn try_lock_contended() {
    let lock = FairLock::new(5);
    let guard = lock.lock();
    assert!(lock.try_lock().is_none());
    assert!(lock.is_locked());
    drop(guard);

    let mut guard = lock.try_lock().expect("uncontended try_lock failed");
    *guard = 10;
    drop(guard);
    assert_eq!(lock.into_inner(), 10);
}
