//! Canonical string forms for wall-time and array arguments
//!
//! sbatch accepts loosely shaped input for a handful of arguments; everything
//! stored in a configuration must already be the exact string the script
//! header will carry. The functions here do that conversion once, up front,
//! and fail closed on anything they do not recognise.

use std::fmt;

use crate::error::SlurmError;

/// Accepted input shapes for one sbatch argument.
///
/// Booleans and domain enums are deliberately absent: their scheduler
/// spelling is not derivable from the value alone, so callers map them to
/// strings themselves.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Duration(chrono::Duration),
    Range(ArrayRange),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(value as i64)
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::Int(value as i64)
    }
}

impl From<chrono::Duration> for ArgValue {
    fn from(value: chrono::Duration) -> Self {
        ArgValue::Duration(value)
    }
}

impl From<ArrayRange> for ArgValue {
    fn from(value: ArrayRange) -> Self {
        ArgValue::Range(value)
    }
}

/// Stepped index range with an exclusive upper bound: `start..stop` by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayRange {
    pub start: u32,
    pub stop: u32,
    pub step: u32,
}

/// Resolved array task set.
///
/// `end` is inclusive and always aligned to the last index reachable from
/// `start` with `step`, so equal index sets share one canonical rendering and
/// the task count is available without re-parsing the argument string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayBounds {
    start: u32,
    end: u32,
    step: u32,
}

impl ArrayBounds {
    fn resolve(start: u32, end: u32, step: u32) -> Result<ArrayBounds, SlurmError> {
        if step == 0 {
            return Err(SlurmError::InvalidArraySpec("step must be at least 1".to_string()));
        }
        if end < start {
            return Err(SlurmError::InvalidArraySpec(format!(
                "bounds {start}-{end} are reversed"
            )));
        }
        let end = start + ((end - start) / step) * step;
        Ok(ArrayBounds { start, end, step })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Number of tasks the scheduler will expand this range into.
    pub fn task_count(&self) -> usize {
        ((self.end - self.start) / self.step) as usize + 1
    }

    /// Task indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = u32> {
        let step = self.step as usize;
        (self.start..=self.end).step_by(step)
    }
}

impl fmt::Display for ArrayBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.step {
            1 => write!(f, "{}-{}", self.start, self.end),
            _ => write!(f, "{}-{}:{}", self.start, self.end, self.step),
        }
    }
}

/// Canonicalise a wall-time value into sbatch's time syntax.
///
/// Structured durations become `D-HH:MM:SS` (the days segment is dropped when
/// zero), integers are taken as plain minutes, and strings already in
/// `[D-]HH:MM:SS`, `MM:SS`, or plain-minutes form pass through unchanged.
/// Nothing else is interpreted.
pub fn wall_time(value: &ArgValue) -> Result<String, SlurmError> {
    match value {
        ArgValue::Duration(duration) => wall_time_from_duration(duration),
        ArgValue::Int(minutes) => {
            if *minutes <= 0 {
                return Err(SlurmError::InvalidDuration(format!(
                    "{minutes} is not a positive number of minutes"
                )));
            }
            Ok(minutes.to_string())
        }
        ArgValue::Str(text) => {
            if matches_wall_time_grammar(text) {
                Ok(text.clone())
            } else {
                Err(SlurmError::InvalidDuration(format!(
                    "{text:?} does not match [D-]HH:MM:SS, MM:SS, or minutes"
                )))
            }
        }
        ArgValue::Range(_) => Err(SlurmError::InvalidDuration(
            "an index range is not a duration".to_string(),
        )),
    }
}

fn wall_time_from_duration(duration: &chrono::Duration) -> Result<String, SlurmError> {
    let total = duration.num_seconds();
    if total <= 0 {
        return Err(SlurmError::InvalidDuration(format!(
            "total duration must be positive, got {total}s"
        )));
    }
    if has_subsecond(duration) {
        return Err(SlurmError::InvalidDuration(
            "sub-second durations are not schedulable".to_string(),
        ));
    }

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    match days {
        0 => Ok(format!("{hours:02}:{minutes:02}:{seconds:02}")),
        _ => Ok(format!("{days}-{hours:02}:{minutes:02}:{seconds:02}")),
    }
}

fn has_subsecond(duration: &chrono::Duration) -> bool {
    match duration.num_nanoseconds() {
        Some(nanos) => nanos != duration.num_seconds() * 1_000_000_000,
        // nanosecond count overflows for huge durations, milliseconds still fit
        None => duration.num_milliseconds() != duration.num_seconds() * 1_000,
    }
}

fn matches_wall_time_grammar(text: &str) -> bool {
    let (days, clock) = match text.split_once('-') {
        Some((days, clock)) => (Some(days), clock),
        None => (None, text),
    };
    if let Some(days) = days {
        if !is_digits(days) {
            return false;
        }
    }

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.iter().any(|part| !is_digits(part)) {
        return false;
    }
    match (days.is_some(), parts.len()) {
        // plain minutes
        (false, 1) => true,
        // MM:SS
        (false, 2) => is_sexagesimal(parts[1]),
        // [D-]HH:MM:SS
        (_, 3) => is_sexagesimal(parts[1]) && is_sexagesimal(parts[2]),
        _ => false,
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Two digits, 00-59
fn is_sexagesimal(part: &str) -> bool {
    part.len() == 2 && part.parse::<u32>().map(|v| v < 60).unwrap_or(false)
}

/// Canonicalise an array specification into resolved bounds.
///
/// A bare integer `n` means indices `0..=n` (both ends inclusive, matching
/// sbatch's own range syntax). Strings must already be in `A-B[:step]`
/// syntax. An [`ArrayRange`] carries an exclusive stop, so `{0, 10, 3}`
/// resolves to indices 0, 3, 6, 9 and renders as `0-9:3`.
pub fn array_bounds(value: &ArgValue) -> Result<ArrayBounds, SlurmError> {
    match value {
        ArgValue::Int(count) => {
            let end = u32::try_from(*count).map_err(|_| {
                SlurmError::InvalidArraySpec(format!("task count {count} is out of range"))
            })?;
            ArrayBounds::resolve(0, end, 1)
        }
        ArgValue::Str(text) => parse_range_syntax(text),
        ArgValue::Range(range) => {
            if range.step == 0 {
                return Err(SlurmError::InvalidArraySpec("step must be at least 1".to_string()));
            }
            if range.stop <= range.start {
                return Err(SlurmError::InvalidArraySpec(format!(
                    "range {}..{} is empty",
                    range.start, range.stop
                )));
            }
            ArrayBounds::resolve(range.start, range.stop - 1, range.step)
        }
        ArgValue::Duration(_) => Err(SlurmError::InvalidArraySpec(
            "a duration is not an index range".to_string(),
        )),
    }
}

fn parse_range_syntax(text: &str) -> Result<ArrayBounds, SlurmError> {
    let malformed =
        || SlurmError::InvalidArraySpec(format!("{text:?} is not in A-B[:step] syntax"));

    let (bounds, step) = match text.split_once(':') {
        Some((bounds, step)) => (bounds, step.parse::<u32>().map_err(|_| malformed())?),
        None => (text, 1),
    };
    let (start, end) = bounds.split_once('-').ok_or_else(malformed)?;
    let start = start.parse::<u32>().map_err(|_| malformed())?;
    let end = end.parse::<u32>().map_err(|_| malformed())?;
    ArrayBounds::resolve(start, end, step)
}

/// String form for arguments with no special normalisation: strings verbatim,
/// integers via `to_string`, typed values through their own canonicaliser.
pub fn plain(value: &ArgValue) -> Result<String, SlurmError> {
    match value {
        ArgValue::Str(text) => Ok(text.clone()),
        ArgValue::Int(number) => Ok(number.to_string()),
        ArgValue::Duration(_) => wall_time(value),
        ArgValue::Range(_) => array_bounds(value).map(|bounds| bounds.to_string()),
    }
}
