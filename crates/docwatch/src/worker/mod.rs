pub mod job;
pub mod pool;

pub use job::{Job, JobOutcome, JobResult, Trigger};
pub use pool::WorkerPool;
