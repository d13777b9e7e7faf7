//! `verdict`: ask a question of a model ensemble and keep the adjudicated
//! answer in a numbered block ledger.

mod config;
mod render;

use std::path::PathBuf;

use adjudication::config::{CriticMode, Language};
use adjudication::ledger::{BlockLedger, ContextSelector};
use adjudication::{Orchestrator, PipelineConfig, RunOptions};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./verdict.toml, then ~/.verdict.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger directory (overrides the config file)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Prompt language: en or de
    #[arg(long, global = true)]
    lang: Option<Language>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline for one question
    Ask {
        /// The question (may be given unquoted)
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Simulate every provider call; no keys or network needed
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Prior blocks as context: last, all, or a list like 3,5
        #[arg(long)]
        context: Option<String>,

        /// Three-round cross-examination instead of a single critique
        #[arg(long, default_value_t = false)]
        multi_turn: bool,

        /// Run a second synthesizer and compare the results
        #[arg(long, default_value_t = false)]
        dual_run: bool,

        /// Check extracted factual claims with the search provider
        #[arg(long, default_value_t = false)]
        verify: bool,

        /// Mark the run as suspected false consensus for the DPR score
        #[arg(long, default_value_t = false)]
        sas_warning: bool,

        /// Print the block as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Several rotated runs plus a meta-synthesis
    Deep {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Number of runs (2 to 5)
        #[arg(long, default_value_t = 3)]
        runs: usize,

        #[arg(long, default_value_t = false)]
        dry_run: bool,

        #[arg(long)]
        context: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List stored blocks
    List,

    /// Print one block
    Show {
        /// Block number or id (7 or BLK-0007)
        id: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the resolved configuration with keys masked
    Config,
}

fn parse_context(raw: Option<&str>) -> Result<Option<ContextSelector>> {
    raw.map(|s| {
        s.parse::<ContextSelector>()
            .with_context(|| format!("invalid --context value `{}`", s))
    })
    .transpose()
}

fn orchestrator(config: PipelineConfig, dry_run: bool) -> Result<Orchestrator> {
    if dry_run {
        info!("dry run: no provider will be contacted");
        Orchestrator::dry_run(config).context("failed to set up dry-run pipeline")
    } else {
        Orchestrator::from_config(config).context("failed to set up pipeline")
    }
}

fn print_block(block: &adjudication::Block, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(block).context("failed to encode block")?
        );
    } else {
        print!("{}", render::block(block));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let requested = match &cli.command {
        Command::Ask {
            dual_run, verify, ..
        } => config::Requested {
            dual_run: *dual_run,
            verify: *verify,
        },
        _ => config::Requested::default(),
    };
    let mut config = config::load(cli.config.as_deref(), requested)?;
    if let Some(dir) = cli.ledger {
        config.ledger_path = dir;
    }
    if let Some(lang) = cli.lang {
        config.language = lang;
    }

    match cli.command {
        Command::Ask {
            question,
            dry_run,
            context,
            multi_turn,
            sas_warning,
            json,
            ..
        } => {
            if multi_turn {
                config.critic_mode = CriticMode::MultiTurn;
            }
            let options = RunOptions {
                context: parse_context(context.as_deref())?,
                sas_warning,
            };
            let orchestrator = orchestrator(config, dry_run)?;
            let block = orchestrator
                .run(&question.join(" "), &options)
                .await
                .context("pipeline run failed")?;
            print_block(&block, json)?;
        }
        Command::Deep {
            question,
            runs,
            dry_run,
            context,
            json,
        } => {
            let options = RunOptions {
                context: parse_context(context.as_deref())?,
                sas_warning: false,
            };
            let orchestrator = orchestrator(config, dry_run)?;
            let block = orchestrator
                .run_deep(&question.join(" "), runs, &options)
                .await
                .context("deep analysis failed")?;
            print_block(&block, json)?;
        }
        Command::List => {
            let ledger = BlockLedger::open(&config.ledger_path)
                .with_context(|| format!("failed to open ledger {}", config.ledger_path.display()))?;
            print!("{}", render::list(&ledger.list()?));
        }
        Command::Show { id, json } => {
            let ledger = BlockLedger::open(&config.ledger_path)
                .with_context(|| format!("failed to open ledger {}", config.ledger_path.display()))?;
            match ledger.load_by_id(&id.to_uppercase())? {
                Some(block) => print_block(&block, json)?,
                None => bail!("no block {} in {}", id, config.ledger_path.display()),
            }
        }
        Command::Config => {
            let shown = config::masked(&config);
            print!(
                "{}",
                toml::to_string_pretty(&shown).context("failed to encode config")?
            );
        }
    }
    Ok(())
}
