mod lock;
mod spin;
mod thread_parker;
mod wait_queue;

pub use lock::{Lock, LockGuard};
pub use spin::Spin;
pub use thread_parker::*;
pub use wait_queue::{List, Node};
