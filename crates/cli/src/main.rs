use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "imgrelay")]
#[command(about = "Relay media from a Telegram channel to an image host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Watch the configured channel and relay media to the upload endpoint.
    Run {
        /// Config file path (default: IMGRELAY_CONFIG_PATH or ~/.imgrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("imgrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run { config }) => {
            if let Err(e) = run_relay(config).await {
                log::error!("relay failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_relay(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let settings = lib::config::Settings::resolve(&config)?;

    let target = lib::channels::ChannelTarget::parse(&settings.channel)
        .map_err(|e| anyhow::anyhow!("invalid channel identifier: {}", e))?;
    let channel = Arc::new(lib::channels::TelegramChannel::new(
        settings.bot_token.clone(),
        settings.api_base.clone(),
        target,
    ));
    let uploader = Arc::new(lib::uploader::Uploader::new(&settings.upload)?);
    let relay = lib::relay::Relay::new(uploader, Arc::new(lib::relay::LogSink));
    let listener = lib::listener::Listener::new(relay);

    log::info!(
        "watching channel {} and relaying media to {}",
        settings.channel,
        settings.upload.url
    );

    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(64);
    let poll_handle = channel.clone().start_inbound(inbound_tx);

    tokio::select! {
        _ = listener.run(inbound_rx) => {
            // The inbound channel only closes when the connector gave up.
            anyhow::bail!("telegram subscription lost");
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutting down");
            channel.stop();
        }
    }
    // In-flight relay tasks are abandoned on shutdown.
    poll_handle.abort();
    Ok(())
}
