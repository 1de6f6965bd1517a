//! Composer - build a service from a one-line requirement
//!
//! Loads configuration, wires the default collaborators, runs one build and
//! prints the structured result as JSON on stdout. Progress is logged to
//! stderr; set `RUST_LOG` to change verbosity.
//!
//! Exit codes: 0 success, 1 build error, 2 needs clarification, 3 bad usage
//! or configuration.

use anyhow::{bail, Context, Result};
use composer_core::{
    config::{load_config, load_from_file, sample_config},
    BuildEvent, BuildResult, CancelFlag, ComposerService,
};
use crossbeam_channel::{bounded, Receiver};
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str = "Usage: composer [OPTIONS] <REQUIREMENT>...

Options:
  -c, --config <FILE>      Configuration file (default: ./.composer.toml)
  -o, --output <DIR>       Directory that receives the project
  -p, --provider <ID>      LLM provider (deepseek, openai, ollama)
      --no-clarify         Skip the ambiguity check
      --sample-config      Print a sample configuration and exit
  -h, --help               Print this help";

static TRACING_INIT: Once = Once::new();

/// Command-line arguments
#[derive(Debug, Default)]
struct Args {
    requirement: Vec<String>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    provider: Option<String>,
    no_clarify: bool,
    sample_config: bool,
    help: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    parsed.config = Some(PathBuf::from(value_for(&arg, args.next())?));
                }
                "--output" | "-o" => {
                    parsed.output = Some(PathBuf::from(value_for(&arg, args.next())?));
                }
                "--provider" | "-p" => {
                    parsed.provider = Some(value_for(&arg, args.next())?);
                }
                "--no-clarify" => parsed.no_clarify = true,
                "--sample-config" => parsed.sample_config = true,
                "--help" | "-h" => parsed.help = true,
                _ if arg.starts_with('-') => bail!("unknown option '{}'", arg),
                _ => parsed.requirement.push(arg),
            }
        }

        Ok(parsed)
    }

    fn requirement(&self) -> Option<String> {
        let requirement = self.requirement.join(" ");
        let requirement = requirement.trim();
        (!requirement.is_empty()).then(|| requirement.to_string())
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.starts_with('-') => Ok(value),
        _ => bail!("option '{}' needs a value", flag),
    }
}

/// Initialize tracing to stderr, keeping stdout for the JSON result
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG")
                    .unwrap_or_else(|_| "composer=info,composer_core=info".into()),
            ))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}

fn main() {
    init_tracing();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(3);
        }
    }
}

fn run() -> Result<i32> {
    let args = Args::parse()?;

    if args.help {
        println!("{}", USAGE);
        return Ok(0);
    }
    if args.sample_config {
        print!("{}", sample_config());
        return Ok(0);
    }
    let Some(requirement) = args.requirement() else {
        eprintln!("{}", USAGE);
        return Ok(3);
    };

    let mut config = match &args.config {
        Some(path) => load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("failed to read working directory")?;
            load_config(&cwd).context("failed to load configuration")?
        }
    };
    if let Some(output) = args.output {
        config.build.output_dir = output;
    }
    if let Some(provider) = args.provider {
        config.llm.default_provider = provider;
    }
    if args.no_clarify {
        config.build.check_ambiguity = false;
    }

    let (tx, rx) = bounded(64);
    let service = ComposerService::from_config(config)
        .context("failed to set up collaborators")?
        .with_events(tx);

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("Interrupt received, stopping after the current component");
        handler_flag.cancel();
    })
    .context("failed to install interrupt handler")?;

    let progress = std::thread::spawn(move || log_progress(rx));
    let result = service.build_with_cancel(&requirement, &cancel);
    // Dropping the service closes the event channel and ends the progress thread
    drop(service);
    let _ = progress.join();

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("failed to serialize result")?
    );

    Ok(match result {
        BuildResult::Success { .. } => 0,
        BuildResult::Error { .. } => 1,
        BuildResult::NeedsClarification { .. } => 2,
    })
}

fn log_progress(rx: Receiver<BuildEvent>) {
    for event in rx {
        match event {
            BuildEvent::PlanAccepted {
                project_name,
                components,
            } => tracing::info!("Plan for {}: {}", project_name, components.join(" → ")),
            BuildEvent::ComponentStarted { component } => {
                tracing::info!("Building {}", component)
            }
            BuildEvent::AttemptStarted {
                component,
                iteration,
            } => tracing::debug!("{}: iteration {}", component, iteration),
            BuildEvent::SecurityRejected { component, issues } => {
                tracing::info!("{}: {} security issues, repairing", component, issues.len())
            }
            BuildEvent::ArtifactPersisted { path, .. } => {
                tracing::debug!("Saved {}", path.display())
            }
            BuildEvent::TestsFailed {
                component, error, ..
            } => tracing::info!("{}: {}", component, error),
            BuildEvent::ComponentCompleted { component } => {
                tracing::info!("{} done", component)
            }
            BuildEvent::BuildFinished { status } => tracing::info!("Build finished: {}", status),
        }
    }
}
