//! Background job scheduler and job implementations.

mod pool_metrics;
mod push_dispatch;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use push_dispatch::PushDispatchJob;
pub use scheduler::{Job, JobScheduler};
