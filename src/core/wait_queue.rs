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

use core::{cell::Cell, ptr::NonNull};

/// Intrusive node, allocated on the stack of a blocked acquire call.
///
/// Link updates go through the queue's methods only, and only while the
/// queue's owner holds the lock guarding it.
#[derive(Debug)]
pub struct Node<T> {
    prev: Cell<Option<NonNull<Self>>>,
    next: Cell<Option<NonNull<Self>>>,
    value: T,
}

impl<T> Node<T> {
    pub const fn new(value: T) -> Self {
        Self {
            prev: Cell::new(None),
            next: Cell::new(None),
            value,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

/// FIFO list of waiter nodes, ordered by arrival.
#[derive(Debug)]
pub struct List<T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// # Safety
    ///
    /// `node` must outlive its membership in the list and must not already
    /// be linked into any list.
    pub unsafe fn push_back(&mut self, node: NonNull<Node<T>>) {
        node.as_ref().prev.set(self.tail);
        node.as_ref().next.set(None);

        match self.tail {
            Some(tail) => tail.as_ref().next.set(Some(node)),
            None => self.head = Some(node),
        }
        self.tail = Some(node);
    }

    /// # Safety
    ///
    /// All linked nodes must still be live.
    pub unsafe fn pop_front(&mut self) -> Option<NonNull<Node<T>>> {
        self.head.map(|head| {
            assert!(self.try_remove(head));
            head
        })
    }

    /// Unlinks `node` if it is still queued. Returns false if the node was
    /// already removed.
    ///
    /// # Safety
    ///
    /// `node` must be live, and linked into this list if linked at all.
    pub unsafe fn try_remove(&mut self, node: NonNull<Node<T>>) -> bool {
        let prev = node.as_ref().prev.get();
        let next = node.as_ref().next.get();

        if prev.is_none() && self.head != Some(node) {
            return false;
        }

        match prev {
            Some(prev) => prev.as_ref().next.set(next),
            None => self.head = next,
        }
        match next {
            Some(next) => next.as_ref().prev.set(prev),
            None => self.tail = prev,
        }

        node.as_ref().prev.set(None);
        node.as_ref().next.set(None);
        true
    }
}
