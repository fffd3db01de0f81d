//! doc-rag command line
//!
//! Run with: cargo run -p doc-rag -- data/manual.pdf

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_rag::checker::check_llm;
use doc_rag::selector::DocumentSelector;
use doc_rag::{RagConfig, Workflow, WorkflowLogger};

/// Question answering over a local text or PDF document with Ollama
#[derive(Parser, Debug)]
#[command(name = "doc-rag", version, about)]
struct Cli {
    /// Document to query (.txt or .pdf); chosen from --data-dir when omitted
    document: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generation model
    #[arg(long)]
    llm_model: Option<String>,

    /// Embedding model
    #[arg(long)]
    embed_model: Option<String>,

    /// Ollama base URL
    #[arg(long)]
    ollama_url: Option<String>,

    /// Rebuild the index even if one exists
    #[arg(long)]
    rebuild_index: bool,

    /// Run the sample questions instead of prompting
    #[arg(long)]
    no_interactive: bool,

    /// Directory listed when no document is given
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory holding persisted indexes
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that Ollama answers with the given model
    CheckLlm {
        /// Model to test (defaults to the configured generation model)
        #[arg(long)]
        model: Option<String>,
    },
}

impl Cli {
    /// Defaults, then the config file, then environment, then flags
    fn load_config(&self) -> anyhow::Result<RagConfig> {
        let mut config = match &self.config {
            Some(path) => RagConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RagConfig::default(),
        };
        config.apply_env();

        if let Some(model) = &self.llm_model {
            config.llm.generate_model = model.clone();
        }
        if let Some(model) = &self.embed_model {
            config.llm.embed_model = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.llm.base_url = url.clone();
        }
        if let Some(dir) = &self.models_dir {
            config.index.models_dir = dir.clone();
        }
        if self.rebuild_index {
            config.index.rebuild_index = true;
        }
        if self.no_interactive {
            config.interactive = false;
        }
        if let Some(document) = &self.document {
            config.document_path = document.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Progress goes to stdout through WorkflowLogger; tracing only adds warnings
    // unless asked for more.
    let default_filter = if cli.verbose { "doc_rag=debug" } else { "doc_rag=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = cli.load_config()?;
    let logger = WorkflowLogger::stdout();

    if let Some(Command::CheckLlm { model }) = &cli.command {
        let model = model.as_deref().unwrap_or(&config.llm.generate_model).to_string();
        let ok = check_llm(&config.llm, &model, &logger).await;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    println!(
        "{}",
        style("doc-rag · ローカルドキュメント質問応答 (Ollama)").bold().cyan()
    );

    if config.document_path.as_os_str().is_empty() {
        let selector = DocumentSelector::new(logger.clone());
        match selector.choose(&cli.data_dir, std::io::stdin().lock()) {
            Some(path) => config.document_path = path,
            None => {
                println!("ドキュメントが選択されませんでした。処理を終了します。");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    tracing::debug!(?config, "Configuration loaded");

    let workflow = Workflow::ollama(config)?.with_progress(true);
    let outcome = workflow.run(std::io::stdin().lock()).await;

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "doc-rag",
            "data/manual.pdf",
            "--llm-model",
            "llama3.2:3b",
            "--rebuild-index",
            "--no-interactive",
            "--models-dir",
            "/tmp/idx",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.document_path, PathBuf::from("data/manual.pdf"));
        assert_eq!(config.llm.generate_model, "llama3.2:3b");
        assert!(config.index.rebuild_index);
        assert!(!config.interactive);
        assert_eq!(config.index.models_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(cli.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_check_llm_subcommand() {
        let cli = Cli::parse_from(["doc-rag", "check-llm", "--model", "mistral"]);
        assert!(matches!(cli.command, Some(Command::CheckLlm { model: Some(ref m) }) if m == "mistral"));
    }
}
