//! Render a configuration into a complete sbatch submission script
//!
//! The script shape is fixed: interpreter line, one `#SBATCH` directive per
//! configured argument in insertion order, a blank line, then the command
//! lines verbatim. Rendering an equal configuration twice yields
//! byte-identical text, which is what makes the persisted script a faithful
//! record of the submission.

use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::config::model::JobConfig;

/// included job script template
static JOB_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/job.txt"));

/// Rendering context for the job script
#[derive(Serialize)]
struct ScriptContext {
    shell: String,
    directives: String,
    commands: String,
}

/// Render the submission script using TinyTemplate
pub fn render(config: &JobConfig) -> String {
    let mut tt = TinyTemplate::new();
    // shell text, not HTML: keep values exactly as configured
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("job", JOB_TEMPLATE).expect("Template");

    let directives: Vec<String> = config
        .arguments()
        .map(|(name, value)| directive(name, value))
        .collect();
    let context = ScriptContext {
        shell: config.shell().to_string(),
        directives: directives.join("\n"),
        commands: config.commands().join("\n"),
    };

    tt.render("job", &context).expect("Rendered job script")
}

/// An argument with an empty value renders as a bare flag.
fn directive(name: &str, value: &str) -> String {
    match value.is_empty() {
        true => format!("#SBATCH --{name}"),
        false => format!("#SBATCH --{name}={value}"),
    }
}
