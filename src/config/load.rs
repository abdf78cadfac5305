//! Declarative configuration documents
//!
//! A document is a flat mapping of sbatch argument names to values, with two
//! reserved keys: `shell` (interpreter line) and `commands` (the job body).
//! Unknown argument names are accepted as-is, since the set of valid sbatch
//! arguments depends on the scheduler version and is deliberately not
//! hard-coded here. Value *shapes* are validated against an embedded JSON
//! schema before ingestion, so booleans, floats, and nested structures fail
//! closed instead of being stringified into something surprising.

use jsonschema::JSONSchema;
use log::info;
use serde_json::Value;

use crate::config::model::JobConfig;
use crate::config::normalize::ArgValue;
use crate::error::SlurmError;

/// included document schema
static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/config.json"));

const SHELL_KEY: &str = "shell";
const COMMANDS_KEY: &str = "commands";

/// Load a configuration from YAML text.
pub fn from_yaml_str(text: &str) -> Result<JobConfig, SlurmError> {
    let doc: Value = serde_yaml_ng::from_str(text)
        .map_err(|err| SlurmError::InvalidConfigDocument(err.to_string()))?;
    from_value(doc)
}

/// Load a configuration from JSON text.
pub fn from_json_str(text: &str) -> Result<JobConfig, SlurmError> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|err| SlurmError::InvalidConfigDocument(err.to_string()))?;
    from_value(doc)
}

/// Validate a parsed document and ingest it through repeated
/// [`JobConfig::set`] calls in document order, so `time` and `array` entries
/// get exactly the same normalisation as programmatic input.
pub fn from_value(doc: Value) -> Result<JobConfig, SlurmError> {
    validate(&doc)?;
    let map = doc.as_object().ok_or_else(|| {
        SlurmError::InvalidConfigDocument("document is not a mapping".to_string())
    })?;

    let mut config = JobConfig::new();
    for (key, value) in map {
        match key.as_str() {
            SHELL_KEY => {
                if let Some(shell) = value.as_str() {
                    config.set_shell(shell);
                }
            }
            COMMANDS_KEY => {
                if let Some(lines) = value.as_array() {
                    for line in lines.iter().filter_map(Value::as_str) {
                        config.append_command(line);
                    }
                }
            }
            _ => {
                let arg = scalar_to_arg(value).ok_or_else(|| {
                    SlurmError::InvalidConfigDocument(format!(
                        "{key}: unsupported value {value}"
                    ))
                })?;
                config.set(key, arg)?;
            }
        }
    }

    info!(
        "Loaded declarative configuration: {} arguments, {} commands",
        config.arguments().count(),
        config.commands().len()
    );
    Ok(config)
}

/// A null value means "flag only": the argument renders without `=value`.
fn scalar_to_arg(value: &Value) -> Option<ArgValue> {
    match value {
        Value::String(text) => Some(ArgValue::Str(text.clone())),
        Value::Number(number) => number.as_i64().map(ArgValue::Int),
        Value::Null => Some(ArgValue::Str(String::new())),
        _ => None,
    }
}

fn validate(doc: &Value) -> Result<(), SlurmError> {
    let schema: Value = serde_json::from_str(SCHEMA).expect("Valid JSON");
    let compiled = JSONSchema::compile(&schema).expect("Valid schema");

    if let Err(errors) = compiled.validate(doc) {
        let reasons: Vec<String> = errors.map(|err| err.to_string()).collect();
        return Err(SlurmError::InvalidConfigDocument(reasons.join("; ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_document_round_trips_into_config() {
        let config = from_yaml_str(
            "job-name: align\n\
             partition: gpu\n\
             time: 01:30:00\n\
             array: 3\n\
             mem: 4G\n\
             commands:\n\
             - module load samtools\n\
             - samtools index in.bam\n",
        )
        .unwrap();

        assert_eq!(config.get("job-name"), Some("align"));
        assert_eq!(config.get("time"), Some("01:30:00"));
        assert_eq!(config.get("array"), Some("0-3"));
        assert!(config.is_array_job());
        assert_eq!(config.commands().len(), 2);
    }

    #[test]
    fn json_document_is_accepted() {
        let config = from_json_str(
            r#"{"job-name": "align", "ntasks": 4, "commands": ["echo hi"]}"#,
        )
        .unwrap();
        assert_eq!(config.get("ntasks"), Some("4"));
        assert_eq!(config.commands(), &["echo hi"]);
    }

    #[test]
    fn unknown_argument_names_are_accepted() {
        let config = from_yaml_str("some-future-sbatch-flag: 7\ncommands: [true]\n");
        assert!(config.is_err()); // commands entries must be strings

        let config = from_yaml_str("some-future-sbatch-flag: 7\n").unwrap();
        assert_eq!(config.get("some-future-sbatch-flag"), Some("7"));
    }

    #[test]
    fn null_value_becomes_flag_only_argument() {
        let config = from_yaml_str("exclusive:\n").unwrap();
        assert_eq!(config.get("exclusive"), Some(""));
    }

    #[test]
    fn shell_key_overrides_interpreter() {
        let config = from_yaml_str("shell: /bin/sh\n").unwrap();
        assert_eq!(config.shell(), "/bin/sh");
    }

    #[test]
    fn booleans_and_nested_values_fail_closed() {
        assert!(matches!(
            from_yaml_str("exclusive: true\n"),
            Err(SlurmError::InvalidConfigDocument(_))
        ));
        assert!(matches!(
            from_yaml_str("mem:\n  amount: 4\n"),
            Err(SlurmError::InvalidConfigDocument(_))
        ));
        assert!(matches!(
            from_yaml_str("cpus: 1.5\n"),
            Err(SlurmError::InvalidConfigDocument(_))
        ));
    }

    #[test]
    fn time_and_array_values_are_still_validated() {
        assert!(matches!(
            from_yaml_str("time: eventually\n"),
            Err(SlurmError::InvalidDuration(_))
        ));
        assert!(matches!(
            from_yaml_str("array: 9-2\n"),
            Err(SlurmError::InvalidArraySpec(_))
        ));
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        assert!(matches!(
            from_yaml_str("- just\n- a\n- list\n"),
            Err(SlurmError::InvalidConfigDocument(_))
        ));
    }
}
