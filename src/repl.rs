//! Interactive terminal front end for a [`ChatSession`].

use chrono::{Local, TimeZone};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::backend::ChatBackend;
use crate::message::{Message, Role};
use crate::prober::ConnectionStatus;
use crate::render::render_message;
use crate::selection::{DocumentEvent, DocumentEvents};
use crate::session::{greeting, ChatSession, DispatchOutcome, SkipReason, SUGGESTIONS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send as the query.
    Send(String),
    Select(String),
    Unselect,
    Clear,
    Suggest(usize),
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Command::Send(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((n, a)) => (n, a.trim()),
            None => (rest, ""),
        };
        match name {
            "select" => Command::Select(arg.to_string()),
            "unselect" => Command::Unselect,
            "clear" => Command::Clear,
            // Suggestions are numbered from 1 on screen.
            "suggest" => match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Command::Suggest(n - 1),
                _ => Command::Unknown(line.to_string()),
            },
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Local wall-clock `HH:MM` for a unix-millisecond timestamp.
pub fn format_clock(ms: u64) -> String {
    Local
        .timestamp_millis_opt(ms as i64)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Full terminal rendering of one transcript entry.
pub fn format_message(msg: &Message) -> String {
    let clock = format_clock(msg.created_at_ms()).dimmed();
    match msg.role() {
        Role::User => format!("{} {}\n{}", "you".bright_blue().bold(), clock, msg.text()),
        Role::Assistant if msg.is_error() => format!(
            "{} {}\n{}",
            "assistant".bright_red().bold(),
            clock,
            msg.text().bright_red()
        ),
        Role::Assistant => {
            let mut out = format!(
                "{} {}\n{}",
                "assistant".bright_green().bold(),
                clock,
                render_message(msg.text()).to_ansi()
            );
            if !msg.sources().is_empty() {
                out.push_str(&format!("\n{}", "Sources:".bold()));
                for src in msg.sources() {
                    out.push_str(&format!("\n  - {} ({})", src.title, src.url.underline()));
                }
            }
            out
        }
    }
}

fn status_line(status: ConnectionStatus) -> ColoredString {
    let label = format!("● {}", status.label());
    match status {
        ConnectionStatus::Connected => label.bright_green(),
        ConnectionStatus::Disconnected => label.bright_red(),
        ConnectionStatus::Unknown => label.dimmed(),
    }
}

fn print_help() {
    eprintln!("{}", "  /select <text>  attach selected text to the next question".dimmed());
    eprintln!("{}", "  /unselect       drop the attached selection".dimmed());
    eprintln!("{}", "  /suggest <n>    ask a starter question".dimmed());
    eprintln!("{}", "  /clear          clear the chat".dimmed());
    eprintln!("{}", "  /status         show backend connection status".dimmed());
    eprintln!("{}", "  /quit           leave".dimmed());
}

fn print_welcome(name: Option<&str>) {
    println!("{}", greeting(name).bold());
    println!("I'm your AI learning assistant. Ask me anything about deep learning, neural networks, or AI concepts from the textbook.");
    for (i, s) in SUGGESTIONS.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).bright_cyan(), s);
    }
}

/// Send the session's current input and print the outcome.
pub async fn dispatch_and_print<B: ChatBackend>(session: &ChatSession<B>) -> DispatchOutcome {
    let outcome = session.send().await;
    match &outcome {
        DispatchOutcome::Replied { message } => println!("{}\n", format_message(message)),
        DispatchOutcome::Skipped(SkipReason::Busy) => {
            eprintln!("{}", "  still waiting for the previous answer".yellow())
        }
        DispatchOutcome::Skipped(SkipReason::Empty) | DispatchOutcome::Discarded => {}
    }
    outcome
}

/// Read commands from stdin until `/quit` or EOF.
pub async fn run<B: ChatBackend + 'static>(
    session: &ChatSession<B>,
    events: &DocumentEvents,
    name: Option<&str>,
) -> std::io::Result<()> {
    println!("{}\n", status_line(session.connection_status()));
    let probe = session.spawn_mount();
    tokio::spawn(async move {
        if let Ok(status) = probe.await {
            eprintln!("\n{}", status_line(status));
        }
    });
    print_welcome(name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Some(sel) = session.selection().get() {
            eprintln!("{} \"{}\"", "  Selected:".bright_magenta(), sel);
        }
        eprint!("{} ", ">".bright_blue());
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Command::Send(text) => {
                session.set_input(text);
                dispatch_and_print(session).await;
            }
            Command::Select(text) => events.emit(DocumentEvent::PointerUp { selection: text }),
            Command::Unselect => session.selection().clear(),
            Command::Clear => {
                session.clear();
                print_welcome(name);
            }
            Command::Suggest(i) => {
                if session.apply_suggestion(i) {
                    println!("{} {}", "you".bright_blue().bold(), session.input());
                    dispatch_and_print(session).await;
                } else {
                    eprintln!("{}", "  no such suggestion".yellow());
                }
            }
            Command::Status => println!("{}", status_line(session.connection_status())),
            Command::Help => print_help(),
            Command::Quit => break,
            Command::Unknown(raw) => {
                eprintln!("{} {}", "  unknown command:".yellow(), raw);
                print_help();
            }
        }
    }
    Ok(())
}
