mod channel_commands;
mod config_commands;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    anyhow::Context as _,
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    chatcast_config::{ChatcastConfig, LoadedConfig, Severity},
    chatcast_discord::{RelayHandler, WatchList, run_bot},
    chatcast_gateway::{HubOptions, RelayHub, bind_relay, inbound_channel, run_drain, serve_relay},
};

/// Written when the watch list changes and no config file exists yet.
const DEFAULT_CONFIG_FILE: &str = "chatcast.toml";

#[derive(Parser)]
#[command(
    name = "chatcast",
    version,
    about = "Relay Discord channel chat to browser stream overlays"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery).
    #[arg(long, short, global = true, env = "CHATCAST_CONFIG")]
    config: Option<PathBuf>,
    /// Relay host (overrides config value).
    #[arg(long, global = true)]
    host: Option<String>,
    /// Relay port (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// History size (overrides config value).
    #[arg(long, global = true)]
    max_messages: Option<usize>,
    /// Font directory (overrides config value).
    #[arg(long, global = true)]
    fonts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay and the Discord bot (default when no subcommand is provided).
    Serve,
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Edit the persisted watch list without starting the bot.
    Channels {
        #[command(subcommand)]
        action: channel_commands::ChannelAction,
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

fn apply_cli_overrides(cli: &Cli, config: &mut ChatcastConfig) {
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(max) = cli.max_messages {
        config.history.max_messages = max;
    }
    if let Some(dir) = &cli.fonts_dir {
        config.fonts.dir = dir.clone();
    }
}

/// Load the config file, then layer env and CLI overrides on top.
fn load_settings(cli: &Cli) -> anyhow::Result<LoadedConfig> {
    let mut loaded = chatcast_config::load(cli.config.as_deref())?;
    chatcast_config::apply_env_overrides(&mut loaded.config);
    apply_cli_overrides(cli, &mut loaded.config);
    Ok(loaded)
}

/// File that watch-list changes are written to.
fn settings_path(loaded: &LoadedConfig) -> PathBuf {
    loaded
        .path
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE).to_path_buf())
}

async fn serve(loaded: LoadedConfig) -> anyhow::Result<()> {
    let report = chatcast_config::validate(&loaded);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `chatcast check` for details",
            report.count(Severity::Error)
        );
    }

    let watch_path = settings_path(&loaded);
    let config = loaded.config;

    let fonts = chatcast_fonts::load_fonts(&config.fonts.dir)?;
    let options = HubOptions {
        replay_interval: Duration::from_millis(config.history.replay_interval_ms),
        ..HubOptions::with_max_messages(config.history.max_messages)?
    };
    let hub = RelayHub::new(options, fonts);

    let shutdown = CancellationToken::new();
    let (inbound, inbound_rx) = inbound_channel();
    let drain = tokio::spawn(run_drain(Arc::clone(&hub), inbound_rx, shutdown.clone()));

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            ctrl_c.cancel();
        }
    });

    let listener = bind_relay(&config.server.host, config.server.port).await?;

    let handler = RelayHandler {
        watch: WatchList::new(
            config.discord.watch_channels.iter().copied(),
            Some(watch_path),
        ),
        inbound,
        max_messages: config.history.max_messages,
        history_on_ready: config.discord.history_on_ready,
    };

    let server = async {
        serve_relay(listener, Arc::clone(&hub), shutdown.clone())
            .await
            .context("relay server failed")
    };
    let bot = async {
        run_bot(&config.discord.token, handler, shutdown.clone())
            .await
            .context("discord bot failed")
    };
    let outcome = tokio::try_join!(server, bot);

    shutdown.cancel();
    if let Err(e) = drain.await {
        warn!(error = %e, "inbound drain task failed");
    }
    outcome.map(|_| ())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chatcast starting");

    let loaded = load_settings(&cli)?;
    if let Some(path) = &loaded.path {
        info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        None | Some(Commands::Serve) => serve(loaded).await,
        Some(Commands::Check { verbose }) => config_commands::check(&loaded, verbose),
        Some(Commands::Channels { action }) => {
            channel_commands::handle_channels(action, &loaded, &settings_path(&loaded))
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "chatcast",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--max-messages",
            "50",
            "--fonts-dir",
            "/srv/fonts",
        ]);
        let mut config = ChatcastConfig::default();
        apply_cli_overrides(&cli, &mut config);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.history.max_messages, 50);
        assert_eq!(config.fonts.dir, PathBuf::from("/srv/fonts"));
    }

    #[test]
    fn absent_flags_keep_config() {
        let cli = Cli::parse_from(["chatcast", "serve"]);
        let mut config = ChatcastConfig::default();
        config.server.port = 1234;
        apply_cli_overrides(&cli, &mut config);
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.server.host, "localhost");
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn channels_subcommand_parses() {
        let cli = Cli::parse_from(["chatcast", "channels", "add", "123456789"]);
        match cli.command {
            Some(Commands::Channels {
                action: channel_commands::ChannelAction::Add { id },
            }) => assert_eq!(id, 123_456_789),
            _ => panic!("expected channels add"),
        }
    }

    #[test]
    fn settings_path_defaults_when_no_file() {
        let loaded = LoadedConfig::default();
        assert_eq!(settings_path(&loaded), PathBuf::from(DEFAULT_CONFIG_FILE));
    }
}
