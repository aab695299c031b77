// src/main.rs
// CLI entry point for Aiden

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use aiden::agent::ModificationReport;
use aiden::config::AidenConfig;
use aiden::state::{AppState, create_app_state};

#[derive(Parser)]
#[command(name = "aiden")]
#[command(about = "Self-modifying code agent with a safety-gated file mutator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (overrides AIDEN_LOG_LEVEL)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the safety policy over a Python file
    Check {
        file: PathBuf,
    },

    /// Write a file's contents over a target through the guarded mutator
    Apply {
        /// File to replace
        target: PathBuf,

        /// File holding the replacement text
        #[arg(long)]
        from: PathBuf,

        /// Skip the .bak backup
        #[arg(long)]
        no_backup: bool,
    },

    /// Send one message to a chat model
    Chat {
        /// Logical model name (default: AIDEN_CHAT_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Ask a model for a structured code analysis of one or more files
    Analyze {
        /// Logical model name (default: AIDEN_ANALYSIS_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Model-reviewed modification: analyze, then apply if no critical issues
    Modify {
        target: PathBuf,

        #[arg(long)]
        from: PathBuf,
    },

    /// List registered model names
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AidenConfig::from_env();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        config.log_level.parse::<Level>().unwrap_or(Level::INFO)
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let state = create_app_state(config).await;
    debug!("Registered models: {:?}", state.router.model_names().await);

    let ok = match cli.command {
        Commands::Check { file } => check_file(&state, &file).await?,
        Commands::Apply {
            target,
            from,
            no_backup,
        } => apply_file(&state, &target, &from, !no_backup).await?,
        Commands::Chat { model, message } => {
            let model = model.unwrap_or_else(|| state.config.chat_model.clone());
            let reply = state
                .agent
                .process_request(&message.join(" "), &model)
                .await?;
            println!("{}", reply);
            true
        }
        Commands::Analyze { model, files } => {
            let model = model.unwrap_or_else(|| state.config.analysis_model.clone());
            analyze_files(&state, &files, &model).await?
        }
        Commands::Modify { target, from } => modify_file(&state, &target, &from).await?,
        Commands::Models => {
            for name in state.router.model_names().await {
                println!("{}", name);
            }
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn check_file(state: &AppState, file: &Path) -> Result<bool> {
    let source = read_source(file).await?;
    let verdict = state.agent.modifier().mutator().policy().check(&source);
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(verdict.is_safe)
}

async fn apply_file(state: &AppState, target: &Path, from: &Path, make_backup: bool) -> Result<bool> {
    let new_text = read_source(from).await?;
    let outcome = state
        .agent
        .modifier()
        .apply_unreviewed(target, &new_text, make_backup)
        .await
        .with_context(|| format!("applying change to {}", target.display()))?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome.success)
}

async fn analyze_files(state: &AppState, files: &[PathBuf], model: &str) -> Result<bool> {
    let mut report = serde_json::Map::new();
    let mut all_ok = true;
    for analysis in state.agent.analyze_paths(files, model).await {
        let entry = match analysis.result {
            Ok(result) => serde_json::to_value(&result)?,
            Err(e) => {
                all_ok = false;
                serde_json::json!({ "error": e.to_string() })
            }
        };
        report.insert(analysis.path.display().to_string(), entry);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(all_ok)
}

async fn modify_file(state: &AppState, target: &Path, from: &Path) -> Result<bool> {
    let proposed = read_source(from).await?;
    let report = state
        .agent
        .execute_code_modification(target, &proposed)
        .await
        .with_context(|| format!("modifying {}", target.display()))?;

    if let ModificationReport::Applied { diff, .. } = &report {
        eprintln!("{}", diff);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_applied())
}
