mod config_commands;
mod session_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    talkshop_config::TalkShopConfig,
    talkshop_metrics::MetricsRecorderConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "talkshop", about = "TalkShop: webhook relay and showcase session tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file to load instead of searching the default locations.
    #[arg(long, global = true, env = "TALKSHOP_CONFIG")]
    config: Option<PathBuf>,
    /// Use the built-in sample catalog instead of the remote API.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook relay (default when no subcommand is provided).
    Serve,
    /// Follow a relay's event stream and drive a local showcase session.
    Listen {
        /// Base URL of the relay.
        #[arg(long, default_value = "http://127.0.0.1:3001")]
        relay: String,
        /// Conversation to subscribe to.
        #[arg(long)]
        conversation: String,
    },
    /// Feed recorded data-channel messages (one JSON object per line) through
    /// a local session and print the resulting view.
    Replay { file: PathBuf },
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Config file (explicit or discovered), then env overrides, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<TalkShopConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            let mut config = talkshop_config::load_config(path)?;
            talkshop_config::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
            config
        },
        None => talkshop_config::discover_and_load(),
    };
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.offline {
        config.catalog.offline = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "talkshop starting");
    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            let metrics_handle = talkshop_metrics::init_metrics(MetricsRecorderConfig {
                enabled: config.metrics.enabled,
                global_labels: vec![("service".into(), "talkshop-relay".into())],
            })?;
            talkshop_gateway::start_relay(&config, metrics_handle).await
        },
        Some(Commands::Listen {
            relay,
            conversation,
        }) => session_commands::listen(&config, &relay, &conversation).await,
        Some(Commands::Replay { file }) => session_commands::replay(&config, &file).await,
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}
