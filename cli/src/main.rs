mod render;

use std::io::Write;

use chrono::{Local, Utc};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast;
use todo_core::{Failure, ReqwestTransport, SubmitOutcome, TodoClient, TodoView, Transport};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(about = "Todo list backed by the todo REST API")]
#[command(version)]
struct Cli {
    /// Base URL of the API; requests go to <base-url>/api/todos
    #[arg(long, env = "TODO_API_URL", default_value = "http://localhost:8080")]
    base_url: String,

    /// Print failed requests under the list
    #[arg(long)]
    show_errors: bool,

    /// Render creation times in UTC instead of local time
    #[arg(long)]
    utc: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(base_url = %cli.base_url, "starting");

    let view = TodoView::new(TodoClient::new(&cli.base_url), ReqwestTransport::new());
    let mut failures = cli.show_errors.then(|| view.subscribe_failures());

    view.mount().await;
    draw(&view, cli.utc, failures.as_mut())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = next_input(&mut lines).await? {
        enter(&view, line).await;
        draw(&view, cli.utc, failures.as_mut())?;
    }

    view.teardown();
    println!();
    Ok(())
}

/// Next line typed at the prompt. Lines that are not valid UTF-8 are
/// logged and skipped.
async fn next_input<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> std::io::Result<Option<String>> {
    loop {
        match lines.next_line().await {
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(error = %e, "skipping input line that is not valid UTF-8");
            }
            other => return other,
        }
    }
}

/// Handle one line typed at the prompt.
///
/// A non-empty line replaces the pending title; an empty line resubmits
/// whatever is still pending from a failed attempt.
async fn enter<T: Transport>(view: &TodoView<T>, line: String) -> SubmitOutcome {
    if !line.is_empty() {
        view.set_pending_title(line);
    }
    view.submit().await
}

fn draw<T: Transport>(
    view: &TodoView<T>,
    utc: bool,
    failures: Option<&mut broadcast::Receiver<Failure>>,
) -> anyhow::Result<()> {
    let rows = if utc { view.rows(&Utc) } else { view.rows(&Local) };
    let shown = failures.map(drain).unwrap_or_default();

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", render::screen(&rows, &view.pending_title(), &shown))?;
    stdout.flush()?;
    Ok(())
}

fn drain(failures: &mut broadcast::Receiver<Failure>) -> Vec<Failure> {
    let mut drained = Vec::new();
    loop {
        match failures.try_recv() {
            Ok(failure) => drained.push(failure),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "dropped failure notifications");
            }
            Err(_) => break,
        }
    }
    drained
}
