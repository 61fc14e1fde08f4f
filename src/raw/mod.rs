mod fair_lock;

pub use fair_lock::RawFairLock;
