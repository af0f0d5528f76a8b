use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::signal;

use cpbot::bot::{commands, Bot};
use cpbot::config::Config;
use cpbot::gateway::GatewayConnection;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// A connection that lived this long resets the back-off.
const STABLE_CONNECTION: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(version, about = "Competitive programming contest bot")]
struct Args {
    /// Overrides CPBOT_API_URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Overrides CPBOT_ACTIVITY.
    #[arg(long)]
    activity: Option<String>,
    /// Exit after the first connection ends instead of reconnecting.
    #[arg(long)]
    no_reconnect: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cpbot=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  \x1b[31m{e}\x1b[0m");
            std::process::exit(2);
        }
    };
    if let Some(api_url) = args.api_url {
        config.gateway.api_url = api_url;
    }
    if let Some(activity) = args.activity {
        config.gateway.activity_name = Some(activity);
    }
    print_banner(&config);

    let bot = Arc::new(Bot::new(config.bot, commands::builtin()));
    let conn = match GatewayConnection::new(config.gateway) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("  \x1b[31m{e}\x1b[0m");
            std::process::exit(2);
        }
    };

    tokio::select! {
        _ = run_forever(&conn, bot, !args.no_reconnect) => {}
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
        }
    }
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let git_sha = env!("GIT_SHA");

    eprintln!();
    eprintln!("  \x1b[1;36m{}\x1b[0m \x1b[2mv{version} ({git_sha})\x1b[0m", config.bot.name);
    eprintln!();
    eprintln!("  \x1b[2mapi\x1b[0m          {}", config.gateway.api_url);
    if let Some(ref activity) = config.gateway.activity_name {
        eprintln!("  \x1b[2mactivity\x1b[0m     {activity}");
    }
    if !config.bot.triggers.is_empty() {
        eprintln!("  \x1b[2mtriggers\x1b[0m     {}", config.bot.triggers.join(", "));
    }
    if let Some(ref channels) = config.bot.allowed_channels {
        eprintln!("  \x1b[2mchannels\x1b[0m     {}", channels.join(", "));
    }
    eprintln!();
}

async fn run_forever(conn: &GatewayConnection, bot: Arc<Bot>, reconnect: bool) {
    let mut delay = INITIAL_BACKOFF;
    loop {
        let started = Instant::now();
        let handler_bot = Arc::clone(&bot);
        let err = conn
            .run(move |conn, message| {
                let bot = Arc::clone(&handler_bot);
                async move { bot.on_message(&conn, &message).await }
            })
            .await;

        if !reconnect {
            tracing::error!("connection ended: {err}, not reconnecting");
            return;
        }
        if started.elapsed() >= STABLE_CONNECTION {
            delay = INITIAL_BACKOFF;
        }
        tracing::warn!("connection ended: {err}, reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_BACKOFF);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
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
}
