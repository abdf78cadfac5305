//! Error taxonomy shared across configuration, submission, and tracking

use thiserror::Error;

/// Everything that can go wrong between building a configuration and a job
/// reaching a terminal state.
///
/// Nothing here is retried internally: resubmitting a job is not safe to do
/// implicitly, so retry policy belongs to the caller. An `Unknown` job status
/// is deliberately *not* an error (see [`crate::job::JobStatus`]).
#[derive(Debug, Error)]
pub enum SlurmError {
    /// A wall-time input that is negative, zero, sub-second, or a string
    /// outside the `[D-]HH:MM:SS` / `MM:SS` / plain-minutes grammar.
    #[error("invalid wall-time duration: {0}")]
    InvalidDuration(String),

    /// An array specification that resolves to an empty or malformed index set.
    #[error("invalid array specification: {0}")]
    InvalidArraySpec(String),

    /// Submission attempted with no commands configured.
    #[error("job has no commands to run")]
    EmptyJobBody,

    /// sbatch exited successfully but its output carried no job id token.
    #[error("no job id found in sbatch output: {output:?}")]
    SubmissionParseError { output: String },

    /// An invoked scheduler tool could not be run or exited non-zero.
    #[error("{program} failed (exit status {status:?}): {stderr}")]
    ExternalCommandFailure {
        program: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// squeue reported a state token outside the fixed mapping table, or
    /// conflicting tokens for one job.
    #[error("unrecognised squeue state output: {output:?}")]
    StatusParseError { output: String },

    /// scontrol output that does not parse as `key=value` tokens.
    #[error("unparsable scontrol token: {0:?}")]
    DetailParseError(String),

    /// A declarative configuration document that fails schema validation or
    /// cannot be parsed at all.
    #[error("invalid configuration document: {0}")]
    InvalidConfigDocument(String),

    /// Failure writing the submission script or configuration artifact.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
