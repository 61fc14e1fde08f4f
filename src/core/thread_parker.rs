use core::{ops::Add, time::Duration};

/// Per-waiter blocking primitive: each blocked acquire call owns its own
/// parker, which is the only wake target a releaser may signal.
pub trait ThreadParker: Sync {
    type Instant: Copy + PartialOrd + Add<Duration, Output = Self::Instant>;
    type UnparkHandle: UnparkHandle;

    fn new() -> Self;

    /// Called by the waiting thread before it is published to other threads.
    fn prepare_park(&self);

    fn park(&self);

    fn park_until(&self, deadline: Self::Instant);

    /// Extracts an owned handle that stays valid after the parker itself is
    /// gone. The releaser must use only the handle once it lets the waiter
    /// resume, since the waiter's stack frame may unwind at any point after.
    fn unpark_handle(&self) -> Self::UnparkHandle;

    fn now() -> Self::Instant;
}

pub trait UnparkHandle {
    fn unpark(self);
}

#[cfg(feature = "std")]
pub use if_std::*;

#[cfg(feature = "std")]
mod if_std {
    use std::{cell::Cell, thread, time::Instant};

    pub struct StdThreadParker(Cell<Option<thread::Thread>>);

    unsafe impl Sync for StdThreadParker {}

    impl super::ThreadParker for StdThreadParker {
        type Instant = Instant;
        type UnparkHandle = thread::Thread;

        fn new() -> Self {
            Self(Cell::new(None))
        }

        fn prepare_park(&self) {
            self.0.set(Some(thread::current()))
        }

        fn park(&self) {
            thread::park()
        }

        fn park_until(&self, deadline: Self::Instant) {
            thread::park_timeout(deadline.saturating_duration_since(Instant::now()))
        }

        fn unpark_handle(&self) -> Self::UnparkHandle {
            self.0.replace(None).expect("prepare_park() not called")
        }

        fn now() -> Self::Instant {
            Instant::now()
        }
    }

    impl super::UnparkHandle for thread::Thread {
        fn unpark(self) {
            thread::Thread::unpark(&self)
        }
    }
}
