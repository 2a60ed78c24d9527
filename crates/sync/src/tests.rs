// Unit tests for sync.
//
// 使用 test-support 的宿主机调度 Mock，可以直接 `cargo test` 验证。

extern crate std;

use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};
use std::vec::Vec;

use test_support::mock::sched::{MOCK_SCHED_OPS, MockSchedOps};

use crate::{Mutex, SchedOps, Semaphore, Timeout, register_sched_ops};

impl SchedOps for MockSchedOps {
    fn yield_now(&self) {
        MockSchedOps::yield_now(self)
    }

    fn now_ms(&self) -> u64 {
        MockSchedOps::now_ms(self)
    }
}

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| unsafe { register_sched_ops(&MOCK_SCHED_OPS) });
}

#[test]
fn test_mutex_basic() {
    setup();
    let lock = Mutex::new(0);
    {
        let mut guard = lock.lock();
        *guard += 1;
        assert!(lock.try_lock().is_none());
    }
    assert_eq!(*lock.lock(), 1);
}

#[test]
fn test_mutex_contended_increments() {
    setup();
    let lock = Arc::new(Mutex::new(0usize));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = lock.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), 4000);
}

#[test]
fn test_timeout_from_millis() {
    assert_eq!(Timeout::from_millis(0), Timeout::NoWait);
    assert_eq!(Timeout::from_millis(-1), Timeout::Forever);
    assert_eq!(Timeout::from_millis(50), Timeout::Millis(50));
}

#[test]
fn test_semaphore_post_saturates_at_max() {
    let sem = Semaphore::new(0, 2);
    assert!(sem.post());
    assert!(sem.post());
    assert!(!sem.post());
    assert_eq!(sem.count(), 2);
}

#[test]
fn test_semaphore_try_wait() {
    let sem = Semaphore::new(1, 1);
    assert!(sem.try_wait());
    assert!(!sem.try_wait());
}

#[test]
fn test_semaphore_no_wait_returns_immediately() {
    setup();
    let sem = Semaphore::new(0, 1);
    assert!(!sem.wait(Timeout::NoWait));
}

#[test]
fn test_semaphore_times_out() {
    setup();
    let sem = Semaphore::new(0, 1);
    let start = Instant::now();
    assert!(!sem.wait(Timeout::Millis(30)));
    assert!(start.elapsed() >= Duration::from_millis(25));
}

#[test]
fn test_semaphore_wakes_on_post_from_other_thread() {
    setup();
    let sem = Arc::new(Semaphore::new(0, 1));
    let poster = {
        let sem = sem.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sem.post();
        })
    };
    assert!(sem.wait(Timeout::Forever));
    poster.join().unwrap();
    assert_eq!(sem.count(), 0);
}
