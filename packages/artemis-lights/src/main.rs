mod cli;

use anyhow::{Context, Result};
use artemis_core::feed::{FeedClient, FeedCommand, FeedCommandSender, TcpConnector};
use artemis_core::lights::{lifx, LifxSink, LightController, LightSink, LogSink};
use artemis_core::Config;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,artemis_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let sink = build_sink(&cli, &config).await?;
    let mut lights = LightController::new(sink, config.transitions.clone(), config.lights.kelvin);
    let table = LightController::<Box<dyn LightSink>>::dispatch_table();
    tracing::info!(messages = ?table.messages(), "handlers registered");

    // show the idle glow until the first event arrives
    lights.update(true);

    let connector = TcpConnector::new(
        config.feed.host.clone(),
        config.feed.port,
        config.feed.connect_timeout,
    )
    .with_keepalive(config.feed.keepalive);
    let (mut client, commands) = FeedClient::new(config.feed.clone(), connector);
    tokio::spawn(shutdown_signal(commands));

    client.run(&table, &mut lights).await;

    if lights.sink_failures() > 0 {
        tracing::warn!(failures = lights.sink_failures(), "some light updates failed");
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

async fn build_sink(cli: &Cli, config: &Config) -> Result<Box<dyn LightSink>> {
    if cli.dry_run {
        tracing::info!("dry run, lights will not be touched");
        return Ok(Box::new(LogSink::new()));
    }

    let sink = if config.lights.addresses.is_empty() {
        let mut broadcast = lifx::broadcast_addr();
        broadcast.set_port(config.lights.port);
        LifxSink::discover(broadcast, config.lights.discovery_timeout)
            .await
            .context("Failed to discover LIFX lights")?
    } else {
        LifxSink::with_addresses(&config.lights.addresses)
            .context("Failed to open LIFX socket")?
    };

    tracing::info!(count = sink.lights().len(), "driving lights");
    Ok(Box::new(sink))
}

/// Stop the feed client on Ctrl+C or SIGTERM
async fn shutdown_signal(commands: FeedCommandSender) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    tracing::info!("Shutting down...");
    let _ = commands.send(FeedCommand::Shutdown).await;
}
