//! Analyst CLI
//!
//! Runs the analyst against the NDJSON store under the configured data dir.
//!
//! Usage:
//!   analyst-cli ask "who is Ana Cruz"          # one question
//!   analyst-cli ask                            # interactive, `exit` to quit
//!   analyst-cli ask --offline --session s-1 "list all bscs students"
//!   analyst-cli batch queries.json             # JSON list of query strings
//!   analyst-cli admin "what share of queries fail in the planner"
//!   analyst-cli summary
//!   analyst-cli sample

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use document_store::{DocumentStore, NdjsonDocumentStore};
use log_analyzer::AdminAnalyst;
use orchestrator::{Analyst, Generators};
use shared_types_rs::{AnalystConfig, ExecutionMode};

#[derive(Parser, Debug)]
#[command(name = "analyst-cli")]
#[command(about = "Ask the directory analyst questions and inspect its outcome log")]
struct Args {
    /// Configuration file (default: $ANALYST_CONFIG_PATH or ./config/analyst.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question, or start an interactive session when none is given
    Ask {
        query: Option<String>,

        /// Session id (default: a fresh one)
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Use the offline models for this session
        #[arg(long)]
        offline: bool,
    },
    /// Run every query of a JSON list in one session
    Batch { file: PathBuf },
    /// Ask a question about the outcome log
    Admin { query: String },
    /// Print the training summary
    Summary,
    /// Print the most recent log record
    Sample,
}

#[derive(Debug, Serialize)]
struct BatchItem {
    query: String,
    response: String,
    outcome: String,
}

fn load_config(path: Option<&Path>) -> Result<AnalystConfig> {
    let config = match path {
        Some(path) => {
            let config = AnalystConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            config.validate()?;
            config
        }
        None => AnalystConfig::load().context("failed to load configuration")?,
    };
    Ok(config)
}

fn load_queries(path: &Path) -> Result<Vec<String>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("input query file not found at {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents).context("query file is not valid JSON")?;
    let Some(items) = value.as_array() else {
        bail!("input JSON must be a list of query strings");
    };
    Ok(items
        .iter()
        .filter_map(|item| item.as_str())
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_string)
        .collect())
}

async fn ask(analyst: &Analyst, query: Option<String>, session: Option<String>, offline: bool) -> Result<()> {
    let session_id = session.unwrap_or_else(|| format!("cli_{}", Uuid::new_v4()));
    if offline {
        analyst.set_mode(&session_id, ExecutionMode::Offline).await;
    }

    if let Some(query) = query {
        let response = analyst.ask(&query, &session_id).await;
        println!("{}", response.report);
        if !response.chart_data.is_empty() {
            println!("\nChart data: {}", serde_json::to_string_pretty(&response.chart_data)?);
        }
        return Ok(());
    }

    println!("Session {} (type 'exit' to quit)", session_id);
    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        let response = analyst.ask(query, &session_id).await;
        println!("\nAnalyst: {}\n", response.report);
    }
    analyst.end_session(&session_id);
    Ok(())
}

/// Runs every query in one session and writes `batch_results_<session>.json`
/// into `out_dir`. Returns the path written.
async fn batch(analyst: &Analyst, file: &Path, out_dir: &Path) -> Result<PathBuf> {
    let queries = load_queries(file)?;
    let session_id = format!("batch_run_{}", Uuid::new_v4());
    println!("Running {} queries in session: {}", queries.len(), session_id);

    let mut results = Vec::with_capacity(queries.len());
    for (i, query) in queries.iter().enumerate() {
        println!("\n[{}/{}] You: {}", i + 1, queries.len(), query);
        let response = analyst.ask(query, &session_id).await;
        println!("Analyst: {}", response.report);
        results.push(BatchItem {
            query: query.clone(),
            response: response.report,
            outcome: response.outcome.to_string(),
        });
    }

    let output = out_dir.join(format!("batch_results_{}.json", session_id));
    std::fs::write(&output, serde_json::to_string_pretty(&results)?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("\nBatch run complete. Results saved to: {}", output.display());
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    config_rs::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let store: Arc<dyn DocumentStore> = Arc::new(
        NdjsonDocumentStore::open(&config.store.data_dir)
            .with_context(|| format!("failed to open data dir {}", config.store.data_dir))?,
    );
    let generators = Generators::from_config(&config.models);

    match args.command {
        Command::Ask { query, session, offline } => {
            let analyst = Analyst::configure(config, store, generators)?;
            ask(&analyst, query, session, offline).await?;
        }
        Command::Batch { file } => {
            let analyst = Analyst::configure(config, store, generators)?;
            batch(&analyst, &file, Path::new(".")).await?;
        }
        Command::Admin { query } => {
            let admin = AdminAnalyst::new(
                generators.for_mode(config.pipeline.default_mode).clone(),
                store,
                &config.store.log_collection,
                Duration::from_secs(config.pipeline.generation_timeout_secs),
            )?;
            let response = admin.execute_plan(&query).await;
            println!("{}", response.report);
            if !response.chart_data.is_empty() {
                println!("\nChart data: {}", serde_json::to_string_pretty(&response.chart_data)?);
            }
        }
        Command::Summary => {
            let analyst = Analyst::configure(config, store, generators)?;
            println!("{}", analyst.logger().summarize().await?);
        }
        Command::Sample => {
            let analyst = Analyst::configure(config, store, generators)?;
            match analyst.logger().latest().await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("No records logged yet."),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::MemoryDocumentStore;
    use shared_types_rs::ModelsConfig;

    #[test]
    fn test_load_queries_skips_blank_and_non_string_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.json");
        std::fs::write(&path, r#"["who is Ana Cruz", "  ", 42, " hello "]"#).unwrap();
        assert_eq!(load_queries(&path).unwrap(), vec!["who is Ana Cruz", "hello"]);

        std::fs::write(&path, r#"{"query": "hello"}"#).unwrap();
        assert!(load_queries(&path).is_err());
        assert!(load_queries(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_batch_writes_one_result_per_query() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("queries.json");
        std::fs::write(&input, r#"["hello", "thanks"]"#).unwrap();

        let store = Arc::new(MemoryDocumentStore::new());
        let analyst = Analyst::configure(
            AnalystConfig::default(),
            store,
            Generators::from_config(&ModelsConfig::default()),
        )
        .unwrap();

        let output = tokio_test::block_on(batch(&analyst, &input, dir.path())).unwrap();
        let name = output.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("batch_results_batch_run_"));

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        let items = written.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["query"], "hello");
        assert_eq!(items[1]["outcome"], "SUCCESS_CONVERSATIONAL");
    }
}
