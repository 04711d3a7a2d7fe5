//! VIA CLI Entry Point
//!
//! - `via init` - Write a configuration template
//! - `via ingest <paths>` - Index policy documents
//! - `via ask <question>` - Answer one question
//! - `via chat` - Interactive session
//! - `via index` / `via providers` / `via config` - Inspect the deployment

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use via::cli::ingest::{collect_documents, read_document};
use via::cli::init::{self, InitConfig, InitResult};
use via::cli::output::Output;
use via::cli::{Cli, Commands};
use via::llm::{ProviderRegistry, ProviderStatus};
use via::memory::DEFAULT_HISTORY_WINDOW;
use via::index::{load_index, Error as IndexError};
use via::utils::toml_config::{LogFormat, ViaConfig, DEFAULT_CONFIG_FILE};
use via::{IngestError, QueryError, RagOrchestrator};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Commands::Init { path, force } = &cli.command {
        return match init::run(
            InitConfig {
                path: path.clone(),
                force: *force,
            },
            &output,
        ) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => Err(anyhow::anyhow!(e)),
        };
    }

    let config_path = cli.config.clone();
    let base_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    // .env next to the config file, then the working directory
    dotenvy::from_path(base_dir.join(".env")).ok();
    dotenvy::dotenv().ok();

    let config = load_config(config_path.as_deref())?;
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config { validate } => {
            run_config(&config, config_path.as_deref(), validate, &output)
        }
        Commands::Providers => run_providers(&config, &output),
        Commands::Index => run_index(&config, &output).await,
        Commands::Ingest { paths } => run_ingest(&config, &paths, &output).await,
        Commands::Ask { question } => run_ask(&config, &question.join(" "), &output).await,
        Commands::Chat => run_chat(&config, &output).await,
    }
}

/// An explicit `--config` must exist; otherwise `via.toml` is used when
/// present and defaults apply when it is not.
fn load_config(path: Option<&Path>) -> Result<ViaConfig> {
    match path {
        Some(path) => ViaConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => ViaConfig::load(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_FILE)),
        None => {
            let config = ViaConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn init_tracing(config: &ViaConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn run_config(
    config: &ViaConfig,
    path: Option<&Path>,
    validate: bool,
    output: &Output,
) -> Result<()> {
    if validate {
        output.success("Configuration is valid");
        return Ok(());
    }

    output.header("Configuration");
    output.kv(
        "file",
        &path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("{} (or defaults)", DEFAULT_CONFIG_FILE)),
    );
    output.kv("index", &config.index.path.display().to_string());
    output.kv("metric", config.index.metric.name());
    output.kv(
        "chunking",
        &format!("{} chars, {} overlap", config.rag.chunk_size, config.rag.chunk_overlap),
    );
    output.kv(
        "retrieval",
        &format!("top {}, {} in prompt", config.rag.top_k, config.rag.max_context_chunks),
    );
    output.kv(
        "embedding",
        &format!(
            "{} ({})",
            config.embedding.provider_type,
            config.embedding.model.as_deref().unwrap_or("default model")
        ),
    );
    output.kv(
        "failover",
        &format!(
            "cooldown {}s, attempt timeout {}s",
            config.failover.cooldown_secs, config.failover.attempt_timeout_secs
        ),
    );
    let chain: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
    output.kv("providers", &chain.join(" → "));
    Ok(())
}

fn run_providers(config: &ViaConfig, output: &Output) -> Result<()> {
    let plan = ProviderRegistry::builtin().plan(config)?;

    output.header("Answer providers (failover order)");
    output.table_header(&["Name", "Type", "Model", "Status"]);
    for entry in &plan {
        let status = if entry.enabled {
            "enabled".to_string()
        } else {
            format!("no key (${})", entry.api_key_env.as_deref().unwrap_or("?"))
        };
        output.table_row(&[&entry.name, &entry.provider_type, &entry.model, &status]);
    }
    if !plan.iter().any(|entry| entry.enabled) {
        output.hint("Set an API key in .env or add an ollama provider to via.toml");
    }
    Ok(())
}

async fn run_index(config: &ViaConfig, output: &Output) -> Result<()> {
    output.header("Vector index");
    output.kv("path", &config.index.path.display().to_string());

    let index = match load_index(&config.index.path).await {
        Ok(index) => index,
        Err(IndexError::IndexNotFound(_)) => {
            output.warning("No index yet");
            output.command("via ingest <files or directories>");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let stats = index.stats();
    output.kv("chunks", &stats.chunk_count.to_string());
    output.kv("documents", &stats.document_count.to_string());
    output.kv(
        "dimension",
        &stats.dimension.map_or("-".to_string(), |d| d.to_string()),
    );
    output.kv(
        "embedding",
        stats.embedding_provider_id.as_deref().unwrap_or("-"),
    );
    output.kv("metric", stats.metric.name());
    Ok(())
}

async fn run_ingest(config: &ViaConfig, paths: &[PathBuf], output: &Output) -> Result<()> {
    let files = collect_documents(paths)?;
    if files.is_empty() {
        output.warning("No .txt documents found");
        return Ok(());
    }

    let rag = RagOrchestrator::from_config(config).await?;
    output.header(&format!("Ingesting {} document(s)", files.len()));

    let mut failures = 0usize;
    for file in &files {
        let display = file.path.display().to_string();
        let document = match read_document(file) {
            Ok(document) => document,
            Err(e) => {
                output.error(&format!("{}: {}", display, e));
                failures += 1;
                continue;
            }
        };

        match rag.ingest_document(&document).await {
            Ok(count) => output.success(&format!("{} ({} chunks)", display, count)),
            Err(IngestError::AlreadyIndexed(_)) => output.skipped(&display, "already indexed"),
            Err(e) => {
                output.error(&format!("{}: {}", display, e));
                failures += 1;
            }
        }
    }

    if let Some(stats) = rag.index_stats() {
        output.kv(
            "index",
            &format!("{} chunks from {} documents", stats.chunk_count, stats.document_count),
        );
    }
    if failures > 0 {
        anyhow::bail!("{} document(s) failed to ingest", failures);
    }
    Ok(())
}

async fn run_ask(config: &ViaConfig, question: &str, output: &Output) -> Result<()> {
    let rag = RagOrchestrator::from_config(config).await?;
    let answer = rag.answer_query(question).await?;
    output.answer(&answer.response_text, &answer.provider_id, &answer.model_id);
    Ok(())
}

async fn run_chat(config: &ViaConfig, output: &Output) -> Result<()> {
    let rag = RagOrchestrator::from_config(config).await?;

    output.banner();
    if rag.index_stats().is_none() {
        output.warning("No documents indexed yet; run `via ingest` first");
    }
    if !rag.has_providers() {
        output.warning("No answer provider has a valid key; answers will be unavailable");
    }
    output.info("Ask about your policy. Commands: /history, /clear, /providers, /quit");
    output.newline();

    while let Some(line) = output.prompt() {
        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                rag.clear_history();
                output.success("Conversation cleared");
            }
            "/history" => {
                let turns = rag.recent_conversation(DEFAULT_HISTORY_WINDOW);
                if turns.is_empty() {
                    output.info("No questions asked yet");
                }
                for turn in turns {
                    output.list_item(&format!(
                        "{} {} [{}]",
                        turn.timestamp.format("%H:%M:%S"),
                        turn.query,
                        turn.provider_id
                    ));
                }
            }
            "/providers" => {
                output.table_header(&["Name", "Model", "Status"]);
                for state in rag.provider_states() {
                    let status = match (state.status, state.cooldown_remaining) {
                        (ProviderStatus::Cooling, Some(left)) => {
                            format!("cooling {}s", left.as_secs())
                        }
                        (ProviderStatus::Cooling, None) => "cooling".to_string(),
                        (ProviderStatus::Available, _) => "available".to_string(),
                    };
                    output.table_row(&[&state.provider_id, &state.model_id, &status]);
                }
            }
            question => match rag.answer_query(question).await {
                Ok(answer) => {
                    output.answer(&answer.response_text, &answer.provider_id, &answer.model_id)
                }
                Err(e @ QueryError::NoIndex) => output.warning(&e.to_string()),
                Err(e) if e.is_temporarily_unavailable() => output.warning(&e.to_string()),
                Err(e) => output.error(&e.to_string()),
            },
        }
        output.newline();
    }
    Ok(())
}
