use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use sbatcher::config::load;
use sbatcher::{script, Submitter};

/// Build a SLURM submission script from a declarative job configuration,
/// submit it with sbatch, and optionally wait for the jobs to finish.
#[derive(Parser)]
#[command(name = "sbatcher", version, about)]
struct Args {
    /// Job configuration document (YAML; JSON with a .json extension)
    #[arg(long)]
    config: PathBuf,

    /// Directory for the rendered script and configuration snapshot
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Write a JSON snapshot of the configuration next to the script
    #[arg(long)]
    save_config: bool,

    /// Print the rendered script instead of submitting it
    #[arg(long)]
    dry_run: bool,

    /// Poll each submitted job until it leaves the queue
    #[arg(long)]
    watch: bool,

    /// Seconds between status polls when watching
    #[arg(long, default_value_t = 3)]
    poll_interval: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Reading job configuration: {}", args.config.display());
    let text = fs::read_to_string(&args.config)
        .with_context(|| format!("can't read configuration at {}", args.config.display()))?;
    let config = match args.config.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load::from_json_str(&text)?,
        _ => load::from_yaml_str(&text)?,
    };

    if args.dry_run {
        print!("{}", script::render(&config));
        return Ok(());
    }

    let submitter = Submitter::new();
    let jobs = submitter.submit(&config, Some(&args.output_dir), args.save_config)?;
    for job in &jobs {
        println!("{job}");
    }

    if args.watch {
        let interval = Duration::from_secs(args.poll_interval);
        for job in &jobs {
            let status = job.hold_for_completion(interval)?;
            println!("{job} {status}");
        }
    }

    Ok(())
}
