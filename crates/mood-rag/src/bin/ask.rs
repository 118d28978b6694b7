//! One-shot question against the corpus, streamed to stdout

use anyhow::Context;
use clap::Parser;
use futures_util::StreamExt;
use mood_rag::{config::RagConfig, types::ChatRequest, RagService};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mood-rag-ask", about = "Ask one question and stream the answer")]
struct AskCli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Document to load (overrides config and MOOD_RAG_DOCUMENT)
    #[arg(long)]
    document: Option<PathBuf>,

    /// Passages to retrieve
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Print the retrieved pages before answering
    #[arg(long, default_value_t = false)]
    show_context: bool,

    /// The question
    question: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the answer, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = AskCli::parse();

    let mut config = RagConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(document) = cli.document {
        config.corpus.source_path = document;
    }
    if let Some(k) = cli.top_k {
        config.retrieval.top_k = k;
    }

    let service = RagService::initialize(config)
        .await
        .context("initializing RAG service")?;

    if cli.show_context {
        for hit in service.retrieve(&cli.question, None).await? {
            eprintln!("[page {} | distance {:.4}]", hit.page, hit.distance);
        }
    }

    let mut responses = service.respond(ChatRequest::new(cli.question));
    let mut stdout = io::stdout().lock();
    let mut printed = 0;

    while let Some(item) = responses.next().await {
        match item {
            Ok(text) => {
                // each emission extends the previous one
                stdout.write_all(text[printed..].as_bytes())?;
                stdout.flush()?;
                printed = text.len();
            }
            Err(e) => {
                writeln!(stdout)?;
                return Err(e).context("generation failed");
            }
        }
    }

    writeln!(stdout)?;
    Ok(())
}
