use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::api::{AgentType, GameApi, GameMode, HttpGameApi};
use crate::config::AppConfig;
use crate::core::command::Command;
use crate::core::controller::Controller;
use crate::core::driver::Driver;
use crate::core::engine::Engine;
use crate::core::training::{self, LogLevel};
use crate::error::DriverError;
use crate::logging;

const DEFAULT_LOG_FILE: &str = "colorlink.log";

#[derive(Parser)]
#[command(name = "colorlink")]
#[command(about = "Terminal client for the Color Link code-breaking game")]
#[command(version)]
pub struct Cli {
    /// Base URL of the game service (overrides the config file)
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "colorlink.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play interactively in the terminal (default)
    Play,
    /// Benchmark agents against each other and print the ranking
    Eval {
        /// Games played by every agent
        #[arg(short, long)]
        games: Option<u32>,

        /// Target sequence length
        #[arg(short, long)]
        length: Option<usize>,

        /// Agents to evaluate, comma separated (rule,rl,hybrid)
        #[arg(short, long, value_delimiter = ',')]
        agents: Option<Vec<AgentType>>,
    },
    /// Run a training session on the server and follow its progress
    Train {
        /// Number of training games
        #[arg(short, long)]
        episodes: Option<u32>,

        /// Target sequence length
        #[arg(short, long)]
        length: Option<usize>,

        /// Learning agent to train (rl or hybrid)
        #[arg(short, long)]
        agent: Option<AgentType>,
    },
    /// Ask the server to persist the learned model
    SaveModel,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Play);

    // the log file location lives in the config, so load before any subscriber exists
    let (config, found) = resolve_config(&cli.config, cli.server, &command)?;
    match &command {
        Commands::Play => logging::init_file(&log_file(&config))?,
        _ => logging::init_stderr()?,
    }
    AppConfig::log_source(&cli.config, found);

    let api = Arc::new(HttpGameApi::new(&config.server.url, config.timeout())?);

    match command {
        Commands::Play => play(api, &config).await,
        Commands::Eval { .. } => evaluate(api, &config).await,
        Commands::Train { .. } => train(api, &config).await,
        Commands::SaveModel => {
            let ack = api.save_model().await?;
            if !ack.success {
                bail!("server refused to save the model: {}", ack.message);
            }
            println!("{}", non_empty(&ack.message, "Model saved."));
            Ok(())
        }
    }
}

/// Loads the file (or defaults), applies overrides and validates. Logs nothing.
fn resolve_config(path: &Path, server: Option<String>, command: &Commands) -> Result<(AppConfig, bool)> {
    let loaded = AppConfig::load_optional(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    apply_overrides(&mut config, server, command);
    config.validate()?;
    Ok((config, found))
}

fn log_file(config: &AppConfig) -> PathBuf {
    config
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Command-line values win over the config file.
fn apply_overrides(config: &mut AppConfig, server: Option<String>, command: &Commands) {
    if let Some(url) = server {
        config.server.url = url;
    }
    match command {
        Commands::Eval { games, length, agents } => {
            if let Some(games) = games {
                config.evaluation.games_per_agent = *games;
            }
            if let Some(length) = length {
                config.evaluation.sequence_length = *length;
            }
            if let Some(agents) = agents {
                config.evaluation.agents = agents.clone();
            }
        }
        Commands::Train { episodes, length, agent } => {
            if let Some(episodes) = episodes {
                config.training.run.episodes = *episodes;
            }
            if let Some(length) = length {
                config.training.run.sequence_length = *length;
            }
            if let Some(agent) = agent {
                config.training.run.agent = *agent;
            }
        }
        Commands::Play | Commands::SaveModel => {}
    }
}

async fn play<A: GameApi>(api: Arc<A>, config: &AppConfig) -> Result<()> {
    info!(server = %config.server.url, "starting interactive session");

    let driver = Driver::new(api, Controller::new(config.settings()));
    let terminal = ratatui::init();
    let result = Engine::new(driver).run(terminal).await;
    ratatui::restore();
    result
}

async fn evaluate<A: GameApi>(api: Arc<A>, config: &AppConfig) -> Result<()> {
    let mut driver = Driver::new(api, Controller::new(config.settings()));
    driver.dispatch(Command::SetMode(GameMode::Eval));
    driver.dispatch(Command::StartEvaluation);
    if !driver.controller().evaluation_running() {
        bail!("{}", driver.controller().message());
    }

    let total = driver
        .controller()
        .evaluation()
        .map_or(0, |run| run.total_games());
    println!(
        "Evaluating {} agent(s), {} game(s) each, sequence length {}",
        config.evaluation.agents.len(),
        config.evaluation.games_per_agent,
        config.evaluation.sequence_length
    );

    let mut reported = 0;
    let outcome = tokio::select! {
        res = driver.run_until(|c| {
            if let Some(run) = c.evaluation() {
                if run.completed_games() > reported {
                    reported = run.completed_games();
                    eprintln!("  {reported}/{total} games played");
                }
            }
            !c.evaluation_running()
        }) => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping evaluation");
            Ok(())
        }
    };
    outcome?;
    if driver.controller().evaluation_running() {
        driver.dispatch(Command::StopEvaluation);
    }

    let Some(run) = driver.controller().evaluation() else {
        bail!("evaluation did not start");
    };
    println!();
    println!("{:<4} {:<24} {:>7} {:>9} {:>10} {:>10}", "#", "Agent", "Games", "Win rate", "Avg turns", "Best");
    for (rank, record) in run.ranking().into_iter().enumerate() {
        let avg = record
            .avg_turns()
            .map_or_else(|| "-".to_string(), |a| format!("{a:.1}"));
        let best = record
            .min_turns
            .map_or_else(|| "-".to_string(), |m| m.to_string());
        println!(
            "{:<4} {:<24} {:>7} {:>8.1}% {:>10} {:>10}",
            rank + 1,
            record.agent.label(),
            record.completed_games,
            record.win_rate() * 100.0,
            avg,
            best
        );
    }
    println!();
    println!("{}", driver.controller().message());
    Ok(())
}

async fn train<A: GameApi>(api: Arc<A>, config: &AppConfig) -> Result<()> {
    let mut driver = Driver::new(api, Controller::new(config.settings()));
    driver.dispatch(Command::SetMode(GameMode::Train));
    driver.dispatch(Command::StartTraining);
    if !driver.controller().training().is_running() {
        bail!("{}", driver.controller().message());
    }

    let mut printed = 0;
    let interrupted = tokio::select! {
        res = driver.run_until(|c| {
            printed = print_new_entries(c, printed);
            !c.training().is_running()
        }) => {
            res?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        warn!("interrupted, stopping training");
        driver.dispatch(Command::StopTraining);
        // the stop reply and the follow-up game drain, then the driver goes idle
        match driver.run_until(|_| false).await {
            Ok(()) | Err(DriverError::Stalled) => {}
            Err(e) => return Err(e.into()),
        }
    }
    print_new_entries(driver.controller(), printed);

    let run = driver.controller().training();
    println!(
        "Played {} games, won {} ({:.1}%), avg turns {:.1}, elapsed {}",
        run.stats.games_played,
        run.stats.games_won,
        run.stats.win_rate,
        run.stats.avg_turns,
        training::format_elapsed(run.stats.elapsed_time)
    );
    Ok(())
}

/// Prints log entries numbered after `printed`; returns the newest number seen.
fn print_new_entries(controller: &Controller, printed: u64) -> u64 {
    let log = &controller.training().log;
    for entry in log.entries_after(printed) {
        let tag = match entry.level {
            LogLevel::Info => "info",
            LogLevel::Success => " ok ",
            LogLevel::Warning => "warn",
            LogLevel::Error => "fail",
        };
        println!("[{}] {tag} {}", entry.at.format("%H:%M:%S"), entry.message);
    }
    log.last_seq().max(printed)
}

fn non_empty<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.is_empty() {
        fallback
    } else {
        message
    }
}
