use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use notes_rag::{
    Assistant, EmbeddingProvider, HashEmbeddingProvider, OpenAIEmbeddingProvider, RagConfig,
    RagError,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

fn embedding_provider() -> notes_rag::Result<Arc<dyn EmbeddingProvider>> {
    match std::env::var("NOTES_RAG_EMBEDDING").as_deref() {
        Ok("openai") => {
            let mut provider = OpenAIEmbeddingProvider::from_env()?;
            if let Ok(base) = std::env::var("OPENAI_API_BASE") {
                provider = provider.with_base_url(base);
            }
            Ok(Arc::new(provider))
        }
        _ => Ok(Arc::new(HashEmbeddingProvider::default())),
    }
}

async fn initialize(config: RagConfig) -> notes_rag::Result<Assistant> {
    Assistant::builder().config(config).embedding_provider(embedding_provider()?).initialize().await
}

/// Setup checklist printed after a configuration error.
fn setup_hint(err: &RagError, credential_var: &str) -> Option<String> {
    if !err.is_configuration() {
        return None;
    }
    let variable = match err {
        RagError::MissingCredential { variable } => variable.as_str(),
        _ => credential_var,
    };
    Some(format!(
        "Make sure you have:\n1. Set {variable} in the environment\n\
         2. Provided the notes file (argument or NOTES_RAG_NOTES_PATH)"
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = RagConfig::from_env().context("invalid NOTES_RAG_* configuration")?;
    if let Some(path) = std::env::args().nth(1) {
        config.notes_path = PathBuf::from(path);
    }
    let credential_var = config.credential_var.clone();

    let assistant = match initialize(config).await {
        Ok(assistant) => assistant,
        Err(e) => {
            eprintln!("Error initializing assistant: {e}");
            if let Some(hint) = setup_hint(&e, &credential_var) {
                eprintln!("\n{hint}");
            }
            return Err(e.into());
        }
    };

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Study notes assistant ready ({} sections indexed).\nType 'exit' or 'quit' to end the session.\n\n",
                assistant.chunk_count()
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"Your question: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }
        if question.is_empty() {
            stdout.write_all(b"Please enter a question.\n\n").await?;
            continue;
        }

        let output = match assistant.ask(question).await {
            Ok(reply) => format!(
                "\n{}\n\nRetrieved {} relevant sections from notes\n\n",
                reply.answer,
                reply.sources.len()
            ),
            Err(e) => format!("\nError: {e}\n\n"),
        };
        stdout.write_all(output.as_bytes()).await?;
    }

    stdout.write_all(b"Goodbye!\n").await?;
    stdout.flush().await?;
    Ok(())
}
