use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "textbook-assistant")]
#[command(version)]
#[command(about = "Chat with the AI textbook assistant from your terminal")]
pub struct Args {
    /// Backend base URL (overrides TEXTBOOK_API_URL and the config file)
    #[arg(long)]
    pub api_url: Option<String>,

    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Ask a single question, print the reply, and exit
    #[arg(long)]
    pub ask: Option<String>,

    /// Text to send as selected-text context with the first question
    #[arg(long)]
    pub selection: Option<String>,

    /// Probe the backend health endpoint and exit
    #[arg(long)]
    pub health: bool,

    /// Run the route-guarded dashboard server instead of the chat client
    #[arg(long)]
    pub serve: bool,

    /// Port for the dashboard server
    #[arg(long, default_value = "3000")]
    pub port: u16,

    /// Display name used in the greeting
    #[arg(long)]
    pub name: Option<String>,

    /// Print shell completions and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}
