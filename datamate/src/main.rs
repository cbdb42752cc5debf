mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datamate::api::{create_router, AppState};
use datamate::config::Config;
use datamate::llm::LlmProvider;
use datamate::models::DocumentKind;
use datamate::ocr::OcrProvider;

#[derive(Parser)]
#[command(name = "datamate")]
#[command(about = "Ask questions about spreadsheets, Word documents and PDFs")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Chat with a single document in the terminal
    Chat {
        /// Path to an .xlsx, .docx or .pdf file
        #[arg(long, short)]
        file: PathBuf,
        /// Document kind; inferred from the file when omitted
        #[arg(long, short)]
        kind: Option<DocumentKind>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let default_filter = match args.command {
        Some(Command::Chat { .. }) => "datamate=warn",
        _ => "datamate=info,tower_http=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    tracing::info!("Initializing OCR provider: {}...", config.ocr.model);
    let ocr = OcrProvider::new(&config.ocr);
    if let Some(reason) = ocr.unavailable_reason() {
        tracing::warn!("OCR unavailable - scanned PDF pages will fail: {}", reason);
    }

    tracing::info!("Initializing LLM provider: {}...", config.llm.model);
    let llm = LlmProvider::new(Some(&config.llm));
    if let Some(reason) = llm.unavailable_reason() {
        tracing::warn!("LLM unavailable - questions will be rejected: {}", reason);
    }

    let cancel_token = CancellationToken::new();

    match args.command {
        Some(Command::Chat { file, kind }) => {
            tokio::spawn(shutdown_signal(cancel_token.clone()));
            cli::run(config, ocr, llm, &file, kind, cancel_token).await
        }
        Some(Command::Serve) | None => serve(config, ocr, llm, cancel_token).await,
    }
}

async fn serve(
    config: Config,
    ocr: OcrProvider,
    llm: LlmProvider,
    cancel_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, ocr, llm);

    let app = create_router(state);

    tracing::info!("DataMate starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    cancel_token.cancel();
}
