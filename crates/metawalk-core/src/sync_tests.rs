use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::{Lock, UnsafeLock, UnsafeRecursiveLock};

#[test]
fn exclusive_lock_and_unlock() {
    let lock = Lock::new(false);
    assert!(!lock.is_recursive());

    lock.lock();
    assert!(lock.is_locked());
    assert!(!lock.try_lock());
    // SAFETY: held by this thread.
    unsafe { lock.unlock() };
    assert!(!lock.is_locked());
}

#[test]
fn recursive_lock_reenters() {
    let lock = Lock::new(true);
    assert!(lock.is_recursive());

    let depth = lock.with_lock(|| lock.with_lock(|| lock.with_lock(|| 3)));

    assert_eq!(depth, 3);
    assert!(!lock.is_locked());
}

#[test]
fn with_lock_releases_on_error() {
    let lock = Lock::default();

    let result: Result<(), &str> = lock.with_lock(|| Err("failed"));

    assert_eq!(result, Err("failed"));
    assert!(!lock.is_locked());
}

#[test]
fn with_lock_releases_on_panic() {
    let lock = Lock::new(false);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        lock.with_lock(|| panic!("body failed"));
    }));

    assert!(outcome.is_err());
    assert!(!lock.is_locked());
    assert!(lock.try_lock());
    // SAFETY: acquired by `try_lock` above.
    unsafe { lock.unlock() };
}

#[test]
fn with_lock_serializes_threads() {
    let lock = Arc::new(Lock::new(false));
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..1000 {
                    lock.with_lock(|| {
                        // Non-atomic read-modify-write made safe by the lock.
                        let seen = counter.load(Ordering::Relaxed);
                        counter.store(seen + 1, Ordering::Relaxed);
                    });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::Relaxed), 4000);
}

#[test]
fn unsafe_lock_lifecycle() {
    let mut lock = UnsafeLock::new();
    assert!(!lock.is_initialized());

    lock.init();
    assert!(lock.is_initialized());
    assert_eq!(lock.with_lock(|| 42), 42);
    lock.destroy();
    assert!(!lock.is_initialized());

    // Storage may be reused after destroy.
    lock.init();
    lock.lock();
    // SAFETY: held by this thread.
    unsafe { lock.unlock() };
    lock.destroy();
}

#[test]
fn unsafe_recursive_lock_reenters() {
    let mut lock = UnsafeRecursiveLock::new();
    lock.init();

    lock.lock();
    lock.lock();
    // SAFETY: acquired twice by this thread.
    unsafe {
        lock.unlock();
        lock.unlock();
    }
    assert!(!lock.is_locked());
    lock.destroy();
}

#[test]
#[should_panic(expected = "UnsafeLock::lock on a lock in state Uninitialized")]
fn unsafe_lock_requires_init() {
    let lock = UnsafeLock::new();
    lock.lock();
}

#[test]
#[should_panic(expected = "still held")]
fn unsafe_lock_destroy_while_held() {
    let mut lock = UnsafeLock::new();
    lock.init();
    lock.lock();
    lock.destroy();
}

#[test]
#[should_panic(expected = "state Destroyed")]
fn unsafe_lock_use_after_destroy() {
    let mut lock = UnsafeRecursiveLock::new();
    lock.init();
    lock.destroy();
    lock.with_lock(|| ());
}

#[test]
fn debug_output() {
    let lock = Lock::new(true);
    insta::assert_snapshot!(format!("{lock:?}"), @"Lock { recursive: true, locked: false }");

    let mut embedded = UnsafeLock::new();
    insta::assert_snapshot!(format!("{embedded:?}"), @"UnsafeLock { state: Uninitialized, locked: false }");

    embedded.init();
    embedded.lock();
    insta::assert_snapshot!(format!("{embedded:?}"), @"UnsafeLock { state: Ready, locked: true }");
    // SAFETY: locked on this thread above.
    unsafe { embedded.unlock() };
    embedded.destroy();
}
