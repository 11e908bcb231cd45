use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

mod console;
mod context;
mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "relaybot")]
#[command(author, version, about = "RelayBot - chat command dispatcher with a console stream-chat listener")]
pub struct Args {
    /// JSON file with dispatcher settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default command prefix.
    #[arg(long, default_value = "!")]
    prefix: String,

    /// The bot's own user id; its messages are never treated as commands.
    #[arg(long, default_value = "relaybot")]
    bot_user_id: String,

    /// Channel name the console pretends to be.
    #[arg(long, default_value = "console")]
    channel: String,

    /// User id for console lines that do not start with `@user`.
    #[arg(long, default_value = "operator")]
    user: String,

    /// Users granted the bot-developer role (repeatable).
    #[arg(long = "developer")]
    developers: Vec<String>,

    /// Users granted channel moderation in the console channel (repeatable).
    #[arg(long = "moderator")]
    moderators: Vec<String>,

    #[arg(long)]
    default_language: Option<String>,

    /// Seconds a handler may run; 0 disables the limit.
    #[arg(long)]
    handler_timeout_secs: Option<u64>,

    #[arg(long)]
    lock_idle_secs: Option<u64>,

    #[arg(long)]
    lock_sweep_interval_secs: Option<u64>,

    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Skip command audit events.
    #[arg(long, default_value = "false")]
    test_mode: bool,

    /// Fallback log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    tracing_log::LogTracer::init()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level)?;
    info!(
        "RelayBot starting. channel=#{}, prefix='{}', bot_user_id={}",
        args.channel, args.prefix, args.bot_user_id
    );

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
