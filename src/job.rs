//! Handles for submitted jobs: status polling, blocking waits, cancellation
//!
//! A [`Job`] is a handle, not an owned resource: dropping one changes
//! nothing on the cluster. Handles are built by the submission engine only
//! and share nothing with each other beyond the command runner, so a caller
//! can move each one to its own thread for concurrent waits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::error::SlurmError;
use crate::exec::CommandRunner;

const SQUEUE: &str = "squeue";
const SCANCEL: &str = "scancel";
const SCONTROL: &str = "scontrol";

/// Pause between live-queue polls in [`Job::hold_for_completion`]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Scheduler-reported job state.
///
/// `Unknown` doubles as "not found": the live queue forgets a job shortly
/// after it reaches a terminal state, so a finished job usually reports
/// `Unknown` rather than `Completed`. That is expected behaviour, not an
/// error. Consult accounting tooling if the distinction matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Suspended,
    Completed,
    Cancelled,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Fixed mapping from squeue state tokens. A token outside this table is
    /// a parse failure, never a guessed state.
    fn from_queue_token(token: &str) -> Option<JobStatus> {
        match token {
            "PENDING" | "CONFIGURING" => Some(JobStatus::Pending),
            "RUNNING" | "COMPLETING" => Some(JobStatus::Running),
            "SUSPENDED" => Some(JobStatus::Suspended),
            "COMPLETED" => Some(JobStatus::Completed),
            "CANCELLED" => Some(JobStatus::Cancelled),
            "FAILED" | "TIMEOUT" | "NODE_FAIL" | "OUT_OF_MEMORY" | "BOOT_FAIL" | "DEADLINE"
            | "PREEMPTED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// True while the scheduler still holds the job in its live queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running | JobStatus::Suspended)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Suspended => write!(f, "SUSPENDED"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Cancelled => write!(f, "CANCELLED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One submitted unit of work: a whole job, or one task of an array job.
pub struct Job {
    job_id: String,
    array_job_id: String,
    array_num: Option<u32>,
    details: Option<HashMap<String, String>>,
    runner: Arc<dyn CommandRunner>,
}

impl Job {
    pub(crate) fn new(job_id: &str, runner: Arc<dyn CommandRunner>) -> Job {
        Job {
            job_id: job_id.to_string(),
            array_job_id: job_id.to_string(),
            array_num: None,
            details: None,
            runner,
        }
    }

    /// sbatch reports one id for a whole array, so a task handle reuses the
    /// parent id and the index is the sole disambiguator.
    pub(crate) fn array_task(array_job_id: &str, array_num: u32, runner: Arc<dyn CommandRunner>) -> Job {
        Job {
            job_id: array_job_id.to_string(),
            array_job_id: array_job_id.to_string(),
            array_num: Some(array_num),
            details: None,
            runner,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn array_job_id(&self) -> &str {
        &self.array_job_id
    }

    pub fn array_num(&self) -> Option<u32> {
        self.array_num
    }

    /// Id used to scope squeue/scancel/scontrol invocations: `<id>_<index>`
    /// for an array task, the plain id otherwise.
    pub fn queue_id(&self) -> String {
        match self.array_num {
            Some(index) => format!("{}_{}", self.array_job_id, index),
            None => self.job_id.clone(),
        }
    }

    /// Query the live queue for this job's state.
    ///
    /// Returns [`JobStatus::Unknown`] when the id is absent from the queue;
    /// squeue also exits non-zero for ids it has already evicted, which is
    /// the same case. No accounting lookup is attempted.
    pub fn status(&self) -> Result<JobStatus, SlurmError> {
        let queue_id = self.queue_id();
        let output = self.runner.run(SQUEUE, &["-j", &queue_id, "-h", "-o", "%T"])?;

        let stdout = output.stdout.trim();
        if stdout.is_empty() {
            debug!("{queue_id} absent from live queue");
            return Ok(JobStatus::Unknown);
        }

        let mut tokens = stdout.split_whitespace();
        let first = match tokens.next() {
            Some(token) => token,
            None => return Ok(JobStatus::Unknown),
        };
        if tokens.any(|token| token != first) {
            return Err(SlurmError::StatusParseError { output: output.stdout.clone() });
        }
        JobStatus::from_queue_token(first)
            .ok_or_else(|| SlurmError::StatusParseError { output: output.stdout.clone() })
    }

    pub fn is_queued(&self) -> Result<bool, SlurmError> {
        Ok(self.status()?.is_queued())
    }

    /// Block the calling thread until the job leaves the live queue, polling
    /// every `interval` ([`DEFAULT_POLL_INTERVAL`] is the conventional
    /// choice). Returns the last observed status.
    ///
    /// There is no built-in timeout: a job that never finishes blocks
    /// forever. Callers needing a bound should run the wait on its own
    /// thread and impose one externally.
    pub fn hold_for_completion(&self, interval: Duration) -> Result<JobStatus, SlurmError> {
        info!("Waiting for {} (polling every {:?})", self.queue_id(), interval);
        loop {
            let status = self.status()?;
            if !status.is_queued() {
                info!("{} left the queue: {status}", self.queue_id());
                return Ok(status);
            }
            thread::sleep(interval);
        }
    }

    /// Ask the scheduler to cancel this job.
    ///
    /// Idempotent: scancel treats an already-finished id as nothing to do,
    /// so any exit status counts as success. Only failing to invoke the tool
    /// at all is an error.
    pub fn cancel(&self) -> Result<(), SlurmError> {
        let queue_id = self.queue_id();
        info!("Cancelling {queue_id}");
        let output = self.runner.run(SCANCEL, &[&queue_id])?;
        if !output.success() {
            debug!(
                "scancel exited {:?} for {queue_id}: {}",
                output.status,
                output.stderr.trim()
            );
        }
        Ok(())
    }

    /// Fetch `scontrol show job` attributes and cache them, replacing any
    /// previously cached map.
    pub fn fetch_submission_details(&mut self) -> Result<&HashMap<String, String>, SlurmError> {
        let queue_id = self.queue_id();
        let output = self.runner.run(SCONTROL, &["show", "job", &queue_id])?;
        if !output.success() {
            return Err(SlurmError::ExternalCommandFailure {
                program: SCONTROL.to_string(),
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let mut details = HashMap::new();
        for token in output.stdout.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| SlurmError::DetailParseError(token.to_string()))?;
            details.insert(key.to_string(), value.to_string());
        }
        debug!("Cached {} detail fields for {queue_id}", details.len());
        Ok(self.details.insert(details))
    }

    /// Detail map from the last fetch, if any. Never triggers a query.
    pub fn cached_details(&self) -> Option<&HashMap<String, String>> {
        self.details.as_ref()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.queue_id())
    }
}

// the runner has no useful Debug form
impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Job")
            .field("job_id", &self.job_id)
            .field("array_job_id", &self.array_job_id)
            .field("array_num", &self.array_num)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeRunner;

    fn job_with(runner: Arc<FakeRunner>) -> Job {
        Job::new("4242", runner)
    }

    #[test]
    fn status_maps_queue_tokens() {
        let cases = [
            ("PENDING", JobStatus::Pending),
            ("CONFIGURING", JobStatus::Pending),
            ("RUNNING", JobStatus::Running),
            ("COMPLETING", JobStatus::Running),
            ("SUSPENDED", JobStatus::Suspended),
            ("COMPLETED", JobStatus::Completed),
            ("CANCELLED", JobStatus::Cancelled),
            ("FAILED", JobStatus::Failed),
            ("TIMEOUT", JobStatus::Failed),
        ];
        for (token, expected) in cases {
            let runner = Arc::new(FakeRunner::new());
            runner.push_output(0, &format!("{token}\n"), "");
            assert_eq!(job_with(runner).status().unwrap(), expected, "{token}");
        }
    }

    #[test]
    fn empty_queue_output_is_unknown_not_error() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "", "");
        assert_eq!(job_with(runner).status().unwrap(), JobStatus::Unknown);
    }

    #[test]
    fn evicted_id_with_nonzero_exit_is_unknown() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(1, "", "slurm_load_jobs error: Invalid job id specified\n");
        assert_eq!(job_with(runner).status().unwrap(), JobStatus::Unknown);
    }

    #[test]
    fn unrecognised_token_fails_closed() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "REQUEUED\n", "");
        assert!(matches!(
            job_with(runner).status(),
            Err(SlurmError::StatusParseError { .. })
        ));
    }

    #[test]
    fn conflicting_tokens_fail_closed() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "RUNNING\nPENDING\n", "");
        assert!(matches!(
            job_with(runner).status(),
            Err(SlurmError::StatusParseError { .. })
        ));
    }

    #[test]
    fn repeated_identical_tokens_collapse() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "RUNNING\nRUNNING\n", "");
        assert_eq!(job_with(runner).status().unwrap(), JobStatus::Running);
    }

    #[test]
    fn status_query_scopes_to_queue_id() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "RUNNING\n", "");
        let job = Job::array_task("77", 3, Arc::clone(&runner) as Arc<dyn CommandRunner>);
        job.status().unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].0, "squeue");
        assert_eq!(calls[0].1, vec!["-j", "77_3", "-h", "-o", "%T"]);
    }

    #[test]
    fn hold_for_completion_returns_final_status() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "PENDING\n", "");
        runner.push_output(0, "RUNNING\n", "");
        runner.push_output(0, "", "");

        let job = job_with(Arc::clone(&runner));
        let status = job.hold_for_completion(Duration::from_millis(1)).unwrap();
        assert_eq!(status, JobStatus::Unknown);
        assert_eq!(runner.call_count(), 3);
    }

    #[test]
    fn cancel_twice_never_errors() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "", "");
        // second scancel: the id is already gone
        runner.push_output(1, "", "scancel: error: Invalid job id 4242\n");

        let job = job_with(Arc::clone(&runner));
        job.cancel().unwrap();
        job.cancel().unwrap();
        assert_eq!(runner.call_count(), 2);
    }

    #[test]
    fn details_parse_and_cache_replaces_on_refetch() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "JobId=4242 JobName=align\n   JobState=RUNNING Partition=gpu\n", "");
        runner.push_output(0, "JobId=4242 JobState=COMPLETED\n", "");

        let mut job = job_with(Arc::clone(&runner));
        assert!(job.cached_details().is_none());

        let details = job.fetch_submission_details().unwrap();
        assert_eq!(details.get("JobName").map(String::as_str), Some("align"));
        assert_eq!(details.get("JobState").map(String::as_str), Some("RUNNING"));

        let refreshed = job.fetch_submission_details().unwrap();
        assert_eq!(refreshed.get("JobState").map(String::as_str), Some("COMPLETED"));
        assert!(refreshed.get("Partition").is_none());
    }

    #[test]
    fn detail_token_without_equals_fails_closed() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(0, "JobId=4242 garbage\n", "");
        assert!(matches!(
            job_with(runner).fetch_submission_details(),
            Err(SlurmError::DetailParseError(_))
        ));
    }

    #[test]
    fn failed_detail_query_surfaces_command_failure() {
        let runner = Arc::new(FakeRunner::new());
        runner.push_output(1, "", "scontrol: error: Invalid job id specified\n");
        assert!(matches!(
            job_with(runner).fetch_submission_details(),
            Err(SlurmError::ExternalCommandFailure { .. })
        ));
    }
}
