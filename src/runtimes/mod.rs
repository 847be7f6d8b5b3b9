//! Run execution: scheduler, configuration, and run lifecycle types.

pub mod config;
pub mod run;
pub mod scheduler;

pub use config::{RouterMode, SchedulerConfig};
pub use run::{CancelToken, RunError, RunHandle, RunStatus};
pub use scheduler::Scheduler;
