//! A mutual exclusion lock with strict FIFO handoff.
//!
//! Ordinary mutexes let a freshly arriving thread barge ahead of threads
//! that have been waiting, which is fast but can starve long waiters. The
//! lock in this crate grants ownership in exact arrival order: each release
//! wakes only the oldest waiter, and nobody may claim the lock while that
//! handoff is in flight.
//!
//! The raw state machine lives in [`raw::RawFairLock`] and is generic over
//! a [`ThreadParker`](crate::core::ThreadParker), so it stays usable
//! without `std`. The `std`
//! feature (on by default) provides the [`FairLock`] and [`FairLockGuard`]
//! aliases built on `lock_api`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod core;
pub mod raw;

#[cfg(feature = "std")]
pub use if_std::*;

#[cfg(feature = "std")]
mod if_std {
    pub type ThreadParker = crate::core::StdThreadParker;

    pub type RawFairLock = crate::raw::RawFairLock<ThreadParker>;

    pub type FairLock<T> = lock_api::Mutex<RawFairLock, T>;
    pub type FairLockGuard<'a, T> = lock_api::MutexGuard<'a, RawFairLock, T>;
    pub type MappedFairLockGuard<'a, T> = lock_api::MappedMutexGuard<'a, RawFairLock, T>;

    pub const fn const_fair_lock<T>(value: T) -> FairLock<T> {
        FairLock::const_new(<RawFairLock as lock_api::RawMutex>::INIT, value)
    }
}
