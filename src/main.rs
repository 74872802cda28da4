//! Scenario runner: loads a shell configuration, replays a list of
//! navigation steps against it and prints what the shell did.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use portico_config::ShellConfig;
use portico_nav::{Confirmation, Navigated, Shell, ShellEffect};

/// Replay navigation steps against a portico shell
#[derive(Parser)]
#[command(name = "portico")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Shell configuration (.toml or .json)
    config: PathBuf,

    /// Steps: a path (absolute or relative), `click:<testId>`, `back` or `forward`.
    /// The first path is loaded as a direct entry.
    #[arg(required = true)]
    steps: Vec<String>,

    /// Feature toggles to activate before the first step
    #[arg(long = "toggle", value_delimiter = ',')]
    toggles: Vec<String>,

    /// Answer given to activation confirmations
    #[arg(long, value_enum, default_value_t = Answer::Confirm)]
    answer: Answer,

    /// Viewport width in pixels
    #[arg(long)]
    width: Option<f32>,

    /// Apply PORTICO_* environment overrides to the configuration
    #[arg(long, env = "PORTICO_ENV_OVERRIDES")]
    env_overrides: bool,

    /// Print effects as they are produced
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Answer {
    Confirm,
    Dismiss,
}

impl From<Answer> for Confirmation {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Confirm => Confirmation::Confirm,
            Answer::Dismiss => Confirmation::Dismiss,
        }
    }
}

fn main() -> Result<()> {
    let _ = env_logger::try_init();
    let cli = Cli::parse();

    let mut config = ShellConfig::load_from_file(&cli.config)?;
    if cli.env_overrides {
        config.merge_with_env();
    }
    let mut shell = Shell::new(config).context("failed to build navigation tree")?;
    for toggle in &cli.toggles {
        shell.activate_feature_toggle(toggle);
    }
    if let Some(width) = cli.width {
        shell.resize(width, 0);
        shell.tick(u64::MAX);
    }

    let mut loaded = false;
    for step in &cli.steps {
        let outcome = match run_step(&mut shell, step, &mut loaded, cli.answer) {
            Ok(outcome) => format!("{outcome:?}"),
            Err(err) => {
                warn!("step {step:?} failed: {err}");
                format!("error: {err}")
            }
        };
        println!(
            "{step} -> {} [{outcome}]",
            shell.current_url().as_deref().unwrap_or("-")
        );
        print_effects(&mut shell, cli.verbose)?;
    }

    println!("{}", serde_json::to_string_pretty(shell.chrome())?);
    Ok(())
}

fn run_step(shell: &mut Shell, step: &str, loaded: &mut bool, answer: Answer) -> Result<Navigated> {
    let outcome = match step {
        "back" => shell.back()?,
        "forward" => shell.forward()?,
        _ => match step.strip_prefix("click:") {
            Some(test_id) => shell.click(test_id)?,
            None if !*loaded => {
                *loaded = true;
                shell.load(step)?
            }
            None => shell.navigate(step)?,
        },
    };

    if let Navigated::Pending(ticket) = outcome {
        info!("answering {ticket}");
        return Ok(shell.resolve_activation(ticket, answer.into())?);
    }
    Ok(outcome)
}

fn print_effects(shell: &mut Shell, verbose: bool) -> Result<()> {
    for effect in shell.drain_effects() {
        let always = matches!(
            effect,
            ShellEffect::Alert(_) | ShellEffect::ConsoleWarning { .. }
        );
        if verbose || always {
            println!("  {}", serde_json::to_string(&effect)?);
        }
    }
    Ok(())
}
