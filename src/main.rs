mod cli;
mod config;
mod gate_client;
mod gemini_client;
mod server;

use std::io;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::ChatContext;
use crate::cli::chat::scheduling::SystemBrowser;
use crate::cli::chat::view::TerminalView;
use crate::config::GateConfig;
use crate::server::ServerConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ChatArgs {
    /// Send a single message and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Chat endpoint URL (overrides VETTING_GATE_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Milliseconds per character when writing replies (overrides VETTING_GATE_TYPING_MS)
    #[arg(long)]
    typing_ms: Option<u64>,

    /// Link opened by the unlocked agenda (overrides VETTING_GATE_SCHEDULING_URL)
    #[arg(long)]
    scheduling_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a vetting conversation
    Chat(ChatArgs),

    /// Run the companion chat backend
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8002)]
        port: u16,

        /// Completion model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the Gemini models available to GEMINI_API_KEY
    Models,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    // Logs go to stderr so they never interleave with the chat log.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Chat(args)) => run_chat(args).await,
        Some(Commands::Serve { port, model }) => {
            server::serve(ServerConfig::from_env(port, model)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Models) => cli::models::check_models(&mut io::stdout()).await,
        // Default to chat if no subcommand is provided
        None => run_chat(cli.chat).await,
    }
}

async fn run_chat(args: ChatArgs) -> Result<ExitCode> {
    let config = GateConfig::from_env()?.with_overrides(
        args.endpoint.as_deref(),
        args.typing_ms,
        args.scheduling_url.as_deref(),
    )?;

    info!("Starting vetting gate");

    let mounted = ChatContext::mount(
        Box::new(TerminalView::new(Box::new(io::stdout()))),
        Box::new(SystemBrowser::new()),
        &config,
        args.input,
        true,
    )?;

    match mounted {
        Some(mut chat_context) => chat_context.run().await,
        None => Ok(ExitCode::SUCCESS),
    }
}
