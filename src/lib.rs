//! Build, submit, and track SLURM batch jobs from structured configuration.
//!
//! The pieces line up with the life of a job:
//!
//! 1. a [`JobConfig`] collects sbatch arguments (normalised into their
//!    canonical string form as they are set) and the shell commands the job
//!    runs;
//! 2. [`script::render`] turns that configuration into a submission script,
//!    deterministically;
//! 3. a [`Submitter`] writes the script, runs `sbatch`, and hands back one
//!    [`Job`] per scheduled task;
//! 4. each [`Job`] polls, waits on, and cancels its unit of work through the
//!    scheduler's CLI tools.
//!
//! All scheduler interaction goes through the [`exec::CommandRunner`]
//! capability, so nothing here assumes a real cluster until a job is
//! actually submitted.
//!
//! ```no_run
//! use sbatcher::{JobConfig, Submitter, DEFAULT_POLL_INTERVAL};
//!
//! # fn main() -> Result<(), sbatcher::SlurmError> {
//! let mut config = JobConfig::new();
//! config.set("job-name", "example")?;
//! config.set("time", chrono::Duration::minutes(15))?;
//! config.set("array", 3)?;
//! config.append_command("echo \"task ${SLURM_ARRAY_TASK_ID}\"");
//!
//! let jobs = Submitter::new().submit(&config, None, false)?;
//! for job in &jobs {
//!     let status = job.hold_for_completion(DEFAULT_POLL_INTERVAL)?;
//!     println!("{job}: {status}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod job;
pub mod script;
pub mod submit;

pub use config::model::JobConfig;
pub use config::normalize::{ArgValue, ArrayBounds, ArrayRange};
pub use error::SlurmError;
pub use job::{Job, JobStatus, DEFAULT_POLL_INTERVAL};
pub use submit::Submitter;
