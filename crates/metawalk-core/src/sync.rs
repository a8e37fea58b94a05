//! Mutual exclusion for bookkeeping that lives next to the walker.
//!
//! The walker itself reads immutable memory and never locks. These locks
//! guard the owning system's mutable state:
//!
//! - [`Lock`] owns its mutex; it is ready on construction and released with
//!   its owner.
//! - [`UnsafeLock`] and [`UnsafeRecursiveLock`] are embeddable storage with
//!   explicit [`init`](UnsafeLock::init) and [`destroy`](UnsafeLock::destroy)
//!   calls, for values that must hold the mutex inline.
//!
//! All flavors expose raw `lock`/`unlock` plus `with_lock`, which releases on
//! every exit path of its body, including unwinding.

use std::fmt;

use parking_lot::lock_api::{RawMutex as _, RawReentrantMutex};
use parking_lot::{RawMutex, RawThreadId};

type RawRecursiveMutex = RawReentrantMutex<RawMutex, RawThreadId>;

enum RawLock {
    Exclusive(RawMutex),
    Recursive(RawRecursiveMutex),
}

impl RawLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const EXCLUSIVE: Self = Self::Exclusive(RawMutex::INIT);
    #[allow(clippy::declare_interior_mutable_const)]
    const RECURSIVE: Self = Self::Recursive(RawRecursiveMutex::INIT);

    fn lock(&self) {
        match self {
            Self::Exclusive(raw) => raw.lock(),
            Self::Recursive(raw) => raw.lock(),
        }
    }

    fn try_lock(&self) -> bool {
        match self {
            Self::Exclusive(raw) => raw.try_lock(),
            Self::Recursive(raw) => raw.try_lock(),
        }
    }

    /// # Safety
    /// The current thread must hold the lock.
    unsafe fn unlock(&self) {
        // SAFETY: forwarded to the caller.
        unsafe {
            match self {
                Self::Exclusive(raw) => raw.unlock(),
                Self::Recursive(raw) => raw.unlock(),
            }
        }
    }

    fn is_locked(&self) -> bool {
        match self {
            Self::Exclusive(raw) => raw.is_locked(),
            Self::Recursive(raw) => raw.is_locked(),
        }
    }

    fn is_recursive(&self) -> bool {
        matches!(self, Self::Recursive(_))
    }

    fn with_lock<R>(&self, body: impl FnOnce() -> R) -> R {
        self.lock();
        let _release = Release(self);
        body()
    }
}

/// Unlocks on drop, so unwinding out of a `with_lock` body releases too.
struct Release<'a>(&'a RawLock);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        // SAFETY: constructed only after `lock` returned on this thread.
        unsafe { self.0.unlock() }
    }
}

/// A self-owning mutex, exclusive or recursive.
pub struct Lock {
    raw: RawLock,
}

impl Lock {
    /// Create a lock. A recursive lock may be re-acquired by the thread that
    /// holds it; each `lock` then needs a matching `unlock`.
    pub fn new(recursive: bool) -> Self {
        let raw = if recursive {
            RawLock::RECURSIVE
        } else {
            RawLock::EXCLUSIVE
        };
        Self { raw }
    }

    pub fn lock(&self) {
        self.raw.lock();
    }

    pub fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    /// Release one acquisition.
    ///
    /// # Safety
    /// The current thread must hold the lock.
    pub unsafe fn unlock(&self) {
        // SAFETY: forwarded to the caller.
        unsafe { self.raw.unlock() }
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    pub fn is_recursive(&self) -> bool {
        self.raw.is_recursive()
    }

    /// Run `body` while holding the lock.
    pub fn with_lock<R>(&self, body: impl FnOnce() -> R) -> R {
        self.raw.with_lock(body)
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if self.raw.is_locked() {
            tracing::warn!(recursive = self.is_recursive(), "lock dropped while held");
        }
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("recursive", &self.is_recursive())
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
    Destroyed,
}

struct Embedded {
    raw: RawLock,
    state: State,
    name: &'static str,
}

impl Embedded {
    fn ensure_ready(&self, op: &str) {
        if self.state != State::Ready {
            panic!("{}::{op} on a lock in state {:?}", self.name, self.state);
        }
    }

    fn init(&mut self) {
        if self.state == State::Ready {
            panic!("{}::init on a lock that is already initialized", self.name);
        }
        self.raw = if self.raw.is_recursive() {
            RawLock::RECURSIVE
        } else {
            RawLock::EXCLUSIVE
        };
        self.state = State::Ready;
    }

    fn destroy(&mut self) {
        self.ensure_ready("destroy");
        if self.raw.is_locked() {
            panic!("{}::destroy on a lock that is still held", self.name);
        }
        self.state = State::Destroyed;
    }
}

macro_rules! embedded_lock {
    ($(#[$attr:meta])* $name:ident, $raw:expr) => {
        $(#[$attr])*
        pub struct $name(Embedded);

        impl $name {
            /// Storage for a lock that is not usable until [`init`](Self::init).
            pub const fn new() -> Self {
                Self(Embedded {
                    raw: $raw,
                    state: State::Uninitialized,
                    name: stringify!($name),
                })
            }

            /// Make the lock usable. May be called again after `destroy`.
            ///
            /// # Panics
            /// Panics if the lock is already initialized.
            pub fn init(&mut self) {
                self.0.init();
            }

            /// Retire the lock. It must not be held.
            ///
            /// # Panics
            /// Panics if the lock is not initialized or is held.
            pub fn destroy(&mut self) {
                self.0.destroy();
            }

            pub fn is_initialized(&self) -> bool {
                self.0.state == State::Ready
            }

            /// # Panics
            /// Panics if the lock is not initialized.
            pub fn lock(&self) {
                self.0.ensure_ready("lock");
                self.0.raw.lock();
            }

            /// # Panics
            /// Panics if the lock is not initialized.
            pub fn try_lock(&self) -> bool {
                self.0.ensure_ready("try_lock");
                self.0.raw.try_lock()
            }

            /// Release one acquisition.
            ///
            /// # Safety
            /// The current thread must hold the lock.
            pub unsafe fn unlock(&self) {
                self.0.ensure_ready("unlock");
                // SAFETY: forwarded to the caller.
                unsafe { self.0.raw.unlock() }
            }

            pub fn is_locked(&self) -> bool {
                self.0.raw.is_locked()
            }

            /// Run `body` while holding the lock.
            ///
            /// # Panics
            /// Panics if the lock is not initialized.
            pub fn with_lock<R>(&self, body: impl FnOnce() -> R) -> R {
                self.0.ensure_ready("with_lock");
                self.0.raw.with_lock(body)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("state", &self.0.state)
                    .field("locked", &self.is_locked())
                    .finish()
            }
        }
    };
}

embedded_lock!(
    /// Embeddable exclusive mutex with explicit lifecycle.
    UnsafeLock,
    RawLock::EXCLUSIVE
);

embedded_lock!(
    /// Embeddable recursive mutex with explicit lifecycle.
    UnsafeRecursiveLock,
    RawLock::RECURSIVE
);
