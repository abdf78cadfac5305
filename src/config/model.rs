//! Ordered argument map and command list for one batch job

use log::debug;
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::Serialize;

use crate::config::normalize::{self, ArgValue, ArrayBounds};
use crate::error::SlurmError;

pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Name used for script and snapshot files when no `job-name` argument is set
const FALLBACK_JOB_NAME: &str = "job";

/// One batch job: interpreter, sbatch arguments, and the commands the job
/// runs.
///
/// Arguments keep their insertion order because that order is the script's
/// directive order. Every stored value is already canonical: `time` and
/// `array` inputs are normalised by [`set`](JobConfig::set) and nothing is
/// coerced again at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    shell: String,
    args: Vec<(String, String)>,
    commands: Vec<String>,
    array: Option<ArrayBounds>,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig::new()
    }
}

impl JobConfig {
    pub fn new() -> JobConfig {
        JobConfig {
            shell: DEFAULT_SHELL.to_string(),
            args: Vec::new(),
            commands: Vec::new(),
            array: None,
        }
    }

    /// Store one argument in canonical form.
    ///
    /// `time` goes through the wall-time normaliser and `array` through the
    /// array canonicaliser; everything else takes its simplest unambiguous
    /// string form. Underscores in names become hyphens so `job_name` and
    /// `job-name` address the same argument. Setting an existing name
    /// overwrites the value in place, keeping its original position.
    pub fn set<V: Into<ArgValue>>(&mut self, name: &str, value: V) -> Result<(), SlurmError> {
        let value = value.into();
        let name = name.replace('_', "-");
        let canonical = match name.as_str() {
            "time" => normalize::wall_time(&value)?,
            "array" => {
                let bounds = normalize::array_bounds(&value)?;
                self.array = Some(bounds);
                bounds.to_string()
            }
            _ => normalize::plain(&value)?,
        };

        debug!("Setting argument {name}={canonical}");
        match self.args.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = canonical,
            None => self.args.push((name, canonical)),
        }
        Ok(())
    }

    /// [`set`](JobConfig::set) for a batch of name/value pairs, applied in
    /// iteration order.
    pub fn set_many<'a, I>(&mut self, entries: I) -> Result<(), SlurmError>
    where
        I: IntoIterator<Item = (&'a str, ArgValue)>,
    {
        for (name, value) in entries {
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Append one shell line to the job body. The line is opaque to this
    /// crate: no quoting, no validation.
    pub fn append_command(&mut self, line: impl Into<String>) {
        self.commands.push(line.into());
    }

    pub fn append_commands<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.append_command(line);
        }
    }

    pub fn set_shell(&mut self, shell: impl Into<String>) {
        self.shell = shell.into();
    }

    /// True iff an `array` argument is set; its bounds are guaranteed
    /// non-empty by construction.
    pub fn is_array_job(&self) -> bool {
        self.array.is_some()
    }

    /// Resolved array bounds, kept alongside the canonical string so
    /// submission can fan out tasks without re-parsing the argument.
    pub fn array_bounds(&self) -> Option<ArrayBounds> {
        self.array
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn arguments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Base name for the script and snapshot files.
    pub fn job_name(&self) -> &str {
        self.get("job-name").unwrap_or(FALLBACK_JOB_NAME)
    }
}

/// Snapshot form written next to the submission script: the arguments
/// serialise as a map in insertion order. Nothing reads this back; it exists
/// so a submitted job can be reproduced by hand.
impl Serialize for JobConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Args<'a>(&'a [(String, String)]);

        impl Serialize for Args<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (key, value) in self.0 {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("JobConfig", 3)?;
        state.serialize_field("shell", &self.shell)?;
        state.serialize_field("arguments", &Args(&self.args))?;
        state.serialize_field("commands", &self.commands)?;
        state.end()
    }
}
