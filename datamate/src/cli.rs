//! Terminal chat against one document, using the same services as the HTTP
//! API.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use datamate::api::AppState;
use datamate::config::Config;
use datamate::llm::LlmProvider;
use datamate::models::{DocumentKind, ExtractionProgress, Role};
use datamate::ocr::OcrProvider;
use datamate::processing::detect_kind_from_bytes;
use datamate::services::{ExportFormat, UploadSummary};

const HELP: &str = "Commands: /history, /clear, /export [txt|csv] [path], /help, /quit";

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Ask(String),
    History,
    Clear,
    Export {
        format: Option<ExportFormat>,
        path: Option<PathBuf>,
    },
    Help,
    Quit,
    Empty,
}

fn parse_command(line: &str) -> Result<ChatCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ChatCommand::Empty);
    }
    if !line.starts_with('/') {
        return Ok(ChatCommand::Ask(line.to_string()));
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    match command {
        "/quit" | "/exit" => Ok(ChatCommand::Quit),
        "/history" => Ok(ChatCommand::History),
        "/clear" => Ok(ChatCommand::Clear),
        "/help" => Ok(ChatCommand::Help),
        "/export" => {
            let mut format = None;
            let mut path = None;
            for arg in parts {
                match arg.parse::<ExportFormat>() {
                    Ok(f) if format.is_none() && path.is_none() => format = Some(f),
                    _ if path.is_none() => path = Some(PathBuf::from(arg)),
                    _ => return Err(format!("Unexpected argument '{arg}'")),
                }
            }
            Ok(ChatCommand::Export { format, path })
        }
        other => Err(format!("Unknown command '{other}'. {HELP}")),
    }
}

fn infer_kind(path: &Path, bytes: &[u8]) -> Option<DocumentKind> {
    detect_kind_from_bytes(bytes).or_else(|| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    })
}

fn print_progress(update: &ExtractionProgress) {
    eprint!("\r[{:>3}%] {:<48}", update.percent(), update.message);
    if update.completed >= update.total {
        eprintln!();
    }
    let _ = std::io::stderr().flush();
}

fn describe(summary: &UploadSummary) -> String {
    match (summary.kind, &summary.columns, summary.rows) {
        (DocumentKind::Spreadsheet, Some(columns), Some(rows)) => format!(
            "Loaded {rows} rows across {} sheet(s). Columns: {}",
            summary.source_units(),
            columns.join(", ")
        ),
        (DocumentKind::Pdf, _, _) => format!(
            "Extracted {} page(s), {} via OCR ({} characters)",
            summary.segments, summary.ocr_pages, summary.characters
        ),
        _ => format!(
            "Extracted {} paragraph(s) ({} characters)",
            summary.segments, summary.characters
        ),
    }
}

pub async fn run(
    config: Config,
    ocr: OcrProvider,
    llm: LlmProvider,
    file: &Path,
    kind: Option<DocumentKind>,
    cancel_token: CancellationToken,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let kind = kind
        .or_else(|| infer_kind(file, &bytes))
        .with_context(|| {
            format!(
                "Cannot tell what kind of document {} is; pass --kind",
                file.display()
            )
        })?;

    let state = AppState::new(config, ocr, llm);
    let session_id = state.sessions.create()?;

    let summary = state
        .documents
        .upload(&session_id, kind, &bytes, &mut |update| print_progress(&update))
        .await?;
    println!("{}", describe(&summary));

    let history = state.chat.history(&session_id, kind)?;
    for message in &history.messages {
        println!("🤖 {}", message.content);
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = cancel_token.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        match command {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Ask(question) => {
                let outcome = tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    outcome = state.chat.ask(&session_id, kind, &question) => outcome,
                };
                match outcome {
                    Ok(outcome) => println!("🤖 {}", outcome.answer),
                    Err(e) => println!("❌ {e}"),
                }
            }
            ChatCommand::History => {
                for message in state.chat.history(&session_id, kind)?.messages {
                    let speaker = match message.role {
                        Role::User => "🧑",
                        Role::Assistant => "🤖",
                    };
                    println!("{speaker} {}", message.content);
                }
            }
            ChatCommand::Clear => {
                state.chat.clear(&session_id, kind)?;
                println!("Chat history cleared.");
            }
            ChatCommand::Export { format, path } => {
                match state.chat.export(&session_id, kind, format) {
                    Ok(artifact) => {
                        let path = path.unwrap_or_else(|| PathBuf::from(&artifact.file_name));
                        tokio::fs::write(&path, artifact.content)
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Saved chat history to {}", path.display());
                    }
                    Err(e) => println!("❌ {e}"),
                }
            }
        }
    }

    state.sessions.remove(&session_id)?;
    Ok(())
}
