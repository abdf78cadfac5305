//! Submission engine: persist the script, run sbatch, build job handles

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::config::model::JobConfig;
use crate::error::SlurmError;
use crate::exec::{CommandRunner, SystemRunner};
use crate::job::Job;
use crate::script;

const SBATCH: &str = "sbatch";

/// Submits configuration snapshots to the scheduler.
///
/// Holds the command-execution capability all resulting [`Job`] handles
/// share; [`Submitter::new`] uses the real system tools, tests inject a fake
/// through [`Submitter::with_runner`].
pub struct Submitter {
    runner: Arc<dyn CommandRunner>,
}

impl Default for Submitter {
    fn default() -> Self {
        Submitter::new()
    }
}

impl Submitter {
    pub fn new() -> Submitter {
        Submitter { runner: Arc::new(SystemRunner) }
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Submitter {
        Submitter { runner }
    }

    /// Submit a job: render the script, write it (and optionally a JSON
    /// snapshot of the configuration) under `output_dir`, run
    /// `sbatch --parsable`, and wrap the reported id into job handles.
    ///
    /// The configuration is read as a snapshot; later mutations of `config`
    /// have no effect on anything submitted here. An array configuration
    /// yields one handle per task index; anything else yields exactly one.
    /// A configuration without commands fails with
    /// [`SlurmError::EmptyJobBody`] before anything touches disk or the
    /// scheduler.
    pub fn submit(
        &self,
        config: &JobConfig,
        output_dir: Option<&Path>,
        save_config: bool,
    ) -> Result<Vec<Job>, SlurmError> {
        if config.commands().is_empty() {
            return Err(SlurmError::EmptyJobBody);
        }

        let dir: PathBuf = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let script_path = dir.join(format!("{}.sh", config.job_name()));
        info!("Writing job script to {}", script_path.display());
        fs::write(&script_path, script::render(config))?;

        if save_config {
            let snapshot_path = dir.join(format!("{}.json", config.job_name()));
            info!("Writing configuration snapshot to {}", snapshot_path.display());
            let snapshot = serde_json::to_string_pretty(config).expect("Serialised configuration");
            fs::write(&snapshot_path, snapshot)?;
        }

        let script_arg = script_path.to_string_lossy();
        let output = self.runner.run(SBATCH, &["--parsable", script_arg.as_ref()])?;
        if !output.success() {
            return Err(SlurmError::ExternalCommandFailure {
                program: SBATCH.to_string(),
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let job_id = parse_job_id(&output.stdout)?;
        info!("SLURM job id: {job_id}");

        let jobs = match config.array_bounds() {
            Some(bounds) => bounds
                .indices()
                .map(|index| Job::array_task(&job_id, index, Arc::clone(&self.runner)))
                .collect(),
            None => vec![Job::new(&job_id, Arc::clone(&self.runner))],
        };
        Ok(jobs)
    }
}

/// `sbatch --parsable` prints `jobid[;cluster]`; wrappers sometimes emit the
/// `Submitted batch job N` sentence instead. Either way the id is the first
/// all-digit token.
fn parse_job_id(stdout: &str) -> Result<String, SlurmError> {
    stdout
        .split(|c: char| c == ';' || c.is_whitespace())
        .find(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .ok_or_else(|| SlurmError::SubmissionParseError { output: stdout.to_string() })
}
