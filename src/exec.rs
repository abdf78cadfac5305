//! Command execution capability for the scheduler's CLI tools
//!
//! Submission and tracking never assume sbatch/squeue/scancel/scontrol are
//! reachable globals: they go through a [`CommandRunner`] handed to them at
//! construction time, so tests substitute an in-memory fake.

use std::process::Command;

use log::info;

use crate::error::SlurmError;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit status code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs one scheduler tool synchronously and captures its output.
///
/// Implementations only fail when the tool cannot be invoked at all; a
/// non-zero exit is reported through [`CommandOutput::status`] and left to
/// the caller to interpret.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SlurmError>;
}

/// Real runner: spawns the tool with [`std::process::Command`] and blocks
/// until it exits.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SlurmError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        info!("Running {:?}", &cmd);

        let output = cmd.output().map_err(|err| SlurmError::ExternalCommandFailure {
            program: program.to_string(),
            status: None,
            stdout: String::new(),
            stderr: err.to_string(),
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory runner for tests: scripted outputs, recorded invocations

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::{CommandOutput, CommandRunner};
    use crate::error::SlurmError;

    /// Replays a queue of canned outputs and records every call it receives.
    pub struct FakeRunner {
        outputs: Mutex<VecDeque<CommandOutput>>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            FakeRunner {
                outputs: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn push_output(&self, status: i32, stdout: &str, stderr: &str) {
            self.outputs.lock().unwrap().push_back(CommandOutput {
                status: Some(status),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            });
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SlurmError> {
            self.calls.lock().unwrap().push((
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            ));
            match self.outputs.lock().unwrap().pop_front() {
                Some(output) => Ok(output),
                // Running out of scripted outputs means the test under-provisioned
                None => Err(SlurmError::ExternalCommandFailure {
                    program: program.to_string(),
                    status: None,
                    stdout: String::new(),
                    stderr: "fake runner exhausted".to_string(),
                }),
            }
        }
    }
}
