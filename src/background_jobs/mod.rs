//! Background job scheduling and execution system.
//!
//! Runs the nightly stats aggregation and the artist strength batches on
//! fixed intervals, chaining the strength batch to completed aggregations.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::JobScheduler;
