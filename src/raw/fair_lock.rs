// Copyright (c) 2020 kprotty
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::core::{List, Lock, Node, Spin, ThreadParker, UnparkHandle};
use core::{
    ptr::NonNull,
    sync::atomic::{AtomicU8, Ordering},
    time::Duration,
};

const UNLOCKED: u8 = 0;
const LOCKED: u8 = 1 << 0;
const PARKED: u8 = 1 << 1;

const EVENT_WAITING: u8 = 0;
const EVENT_NOTIFIED: u8 = 1;

struct Waiter<P> {
    event: AtomicU8,
    parker: P,
}

/// Mutual exclusion with strict FIFO handoff.
///
/// Blocked acquirers join an arrival-ordered queue and each release wakes
/// exactly the oldest one. While that handoff is in flight the state keeps
/// `PARKED` set with `LOCKED` clear, which fails every fast-path CAS and so
/// keeps fresh acquirers from overtaking the designated next owner.
///
/// Usually accessed through the `lock_api` wrappers; see the `FairLock<T>`
/// alias in the crate root.
pub struct RawFairLock<P: ThreadParker> {
    state: AtomicU8,
    queue: Lock<List<Waiter<P>>>,
}

unsafe impl<P: ThreadParker> Send for RawFairLock<P> {}
unsafe impl<P: ThreadParker> Sync for RawFairLock<P> {}

impl<P: ThreadParker> RawFairLock<P> {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNLOCKED),
            queue: Lock::new(List::new()),
        }
    }

    fn with_queue<F>(&self, f: impl FnOnce(&mut List<Waiter<P>>) -> F) -> F {
        f(&mut *self.queue.lock())
    }

    #[inline]
    fn try_acquire_fast(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[cold]
    fn acquire_slow(&self, deadline: Option<P::Instant>) -> bool {
        let waiter = Node::new(Waiter {
            event: AtomicU8::new(EVENT_WAITING),
            parker: P::new(),
        });

        let mut spin = Spin::new();
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            // Free with nobody queued ahead of us: claim it.
            if state == UNLOCKED {
                match self.state.compare_exchange_weak(
                    UNLOCKED,
                    LOCKED,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return true,
                    Err(e) => {
                        state = e;
                        continue;
                    }
                }
            }

            // Held with an empty queue: spin a little before committing to
            // sleep, then flag that a waiter is about to park.
            if state == LOCKED {
                if spin.yield_now() {
                    state = self.state.load(Ordering::Relaxed);
                    continue;
                }
                if let Err(e) = self.state.compare_exchange_weak(
                    LOCKED,
                    LOCKED | PARKED,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    state = e;
                    continue;
                }
                state = LOCKED | PARKED;
            }

            // PARKED is set: join the tail of the queue, re-validating under
            // the queue lock that a release did not clear it in the meantime.
            let enqueued = self.with_queue(|queue| {
                if self.state.load(Ordering::Relaxed) & PARKED == 0 {
                    return false;
                }
                waiter.value().parker.prepare_park();
                waiter.value().event.store(EVENT_WAITING, Ordering::Relaxed);
                unsafe { queue.push_back(NonNull::from(&waiter)) };
                true
            });

            if !enqueued {
                spin.reset();
                state = self.state.load(Ordering::Relaxed);
                continue;
            }

            // Sleep on our own parker until a releaser pops us off the
            // queue. The event check absorbs spurious wakeups.
            loop {
                match waiter.value().event.load(Ordering::Acquire) {
                    EVENT_NOTIFIED => break,
                    _ => match deadline {
                        None => waiter.value().parker.park(),
                        Some(deadline) => {
                            waiter.value().parker.park_until(deadline);
                            if P::now() >= deadline && !self.cancel(&waiter) {
                                return false;
                            }
                        }
                    },
                }
            }

            // The baton is ours. Publish LOCKED, keeping PARKED while other
            // threads are still queued behind us.
            self.with_queue(|queue| {
                let new_state = match queue.is_empty() {
                    true => LOCKED,
                    false => LOCKED | PARKED,
                };
                self.state.store(new_state, Ordering::Relaxed);
            });
            return true;
        }
    }

    /// Backs a timed-out waiter out of the queue. Returns true if the baton
    /// was already handed to it, in which case the caller owns the lock.
    #[cold]
    fn cancel(&self, waiter: &Node<Waiter<P>>) -> bool {
        self.with_queue(|queue| {
            if waiter.value().event.load(Ordering::Relaxed) == EVENT_NOTIFIED {
                return true;
            }

            assert!(unsafe { queue.try_remove(NonNull::from(waiter)) });

            // Re-open the fast path if we were the last queued waiter and
            // no handoff is in flight.
            if queue.is_empty() && self.state.load(Ordering::Relaxed) == (LOCKED | PARKED) {
                self.state.store(LOCKED, Ordering::Relaxed);
            }
            false
        })
    }

    #[cold]
    fn release_slow(&self) {
        if let Some(handle) = self.with_queue(|queue| unsafe {
            match queue.pop_front() {
                None => {
                    // every queued waiter timed out and removed itself
                    self.state.store(UNLOCKED, Ordering::Release);
                    None
                }
                Some(head) => {
                    let waiter = head.as_ref().value();
                    let handle = waiter.parker.unpark_handle();

                    // Hand the baton to the oldest waiter. PARKED stays set
                    // so late arrivals queue up behind it until it claims
                    // ownership for itself.
                    self.state.store(PARKED, Ordering::Release);

                    // last access to the waiter node: once the event is
                    // published, the waking thread may pop its stack frame
                    waiter.event.store(EVENT_NOTIFIED, Ordering::Release);
                    Some(handle)
                }
            }
        }) {
            handle.unpark();
        }
    }
}

unsafe impl<P: ThreadParker> lock_api::RawMutex for RawFairLock<P> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = lock_api::GuardSend;

    #[inline]
    fn lock(&self) {
        if !self.try_acquire_fast() {
            let acquired = self.acquire_slow(None);
            debug_assert!(acquired);
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire_fast()
    }

    #[inline]
    unsafe fn unlock(&self) {
        if let Err(state) =
            self.state
                .compare_exchange(LOCKED, UNLOCKED, Ordering::Release, Ordering::Relaxed)
        {
            assert_ne!(state & LOCKED, 0, "FairLock released while not locked");
            self.release_slow();
        }
    }

    #[inline]
    fn is_locked(&self) -> bool {
        // PARKED without LOCKED means the lock is spoken-for by a waiter
        // that has not resumed yet
        self.state.load(Ordering::Relaxed) != UNLOCKED
    }
}

unsafe impl<P: ThreadParker> lock_api::RawMutexTimed for RawFairLock<P> {
    type Duration = Duration;
    type Instant = P::Instant;

    #[inline]
    fn try_lock_for(&self, timeout: Duration) -> bool {
        self.try_lock_until(P::now() + timeout)
    }

    #[inline]
    fn try_lock_until(&self, deadline: P::Instant) -> bool {
        self.try_acquire_fast() || self.acquire_slow(Some(deadline))
    }
}
