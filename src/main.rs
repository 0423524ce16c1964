use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::*;
use tracing_subscriber::EnvFilter;

use textbook_assistant::cli::Args;
use textbook_assistant::repl;
use textbook_assistant::session::DispatchOutcome;
use textbook_assistant::{
    AssistantConfig, ChatContext, ChatSession, ConnectionStatus, DocumentEvent, DocumentEvents,
    HttpBackend, PendingSelection, SelectionCapture,
};

fn init_tracing() {
    // Logs go to stderr so they never interleave with chat output on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "textbook-assistant", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();

    let mut config = AssistantConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url.clone())?;
    }

    if args.serve {
        textbook_assistant::web::serve(&config, args.port).await?;
        return Ok(());
    }

    let backend = Arc::new(HttpBackend::new(&config));
    let events = DocumentEvents::new();
    let capture = SelectionCapture::attach(&events, PendingSelection::new());
    let session = ChatSession::new(ChatContext::new(backend, capture.pending().clone()));

    if let Some(sel) = &args.selection {
        events.emit(DocumentEvent::PointerUp { selection: sel.clone() });
    }

    if args.health {
        let status = session.mount().await;
        println!("{} {}", config.api_url, status);
        if status != ConnectionStatus::Connected {
            std::process::exit(1);
        }
        return Ok(());
    }

    if let Some(question) = &args.ask {
        session.set_input(question.clone());
        let outcome = repl::dispatch_and_print(&session).await;
        capture.detach();
        if let DispatchOutcome::Replied { message } = outcome {
            if message.is_error() {
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    eprintln!("{}", format!("  Backend: {}", config.api_url).bright_blue());
    repl::run(&session, &events, args.name.as_deref()).await?;
    capture.detach();
    Ok(())
}
