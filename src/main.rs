use crate::{
    dns::beget::BegetProvider,
    ip::http::HttpIpSource,
    settings::Settings,
    updater::Updater,
};
use std::{future::Future, io::{self, IsTerminal}, time::Duration};
use tokio::sync::watch;
use tracing::{error, info, level_filters::LevelFilter, Level};
use tracing_subscriber::fmt::{format::{DefaultFields, Format}, MakeWriter, SubscriberBuilder};

mod dns;
mod ip;
mod settings;
mod updater;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    let cfg = Settings::new()?;

    run(cfg).await
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    // Colour codes only when a human is watching; log drivers get plain lines.
    let builder = log_builder(io::stdout, io::stdout().is_terminal());

    if std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json")) {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}

fn log_builder<W>(writer: W, ansi: bool) -> SubscriberBuilder<DefaultFields, Format, LevelFilter, W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_ansi(ansi)
        .with_writer(writer)
}

async fn run(cfg: Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        domains = ?cfg.domains,
        interval = %humantime::format_duration(cfg.update_interval),
        "beget-ddns started"
    );

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let ip_source = HttpIpSource::new(cfg.get_ip_url.as_str(), client.clone())?;
    let provider = BegetProvider::new(
        cfg.beget_api_url.as_str(),
        client,
        cfg.beget_login,
        cfg.beget_passw,
    )?;
    info!(endpoint = %provider.endpoint(), "using Beget API");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signals = shutdown_signal()?;
    tokio::spawn(forward_shutdown(signals, shutdown_tx));

    let mut updater = Updater::new(provider, ip_source, cfg.domains, cfg.update_interval);
    updater.run(shutdown_rx).await;

    info!(records = ?updater.states(), "beget-ddns done");
    Ok(())
}

/// Flips `shutdown` to `true` once a termination signal arrives. If listening
/// fails the sender is dropped without sending, and the updater keeps running.
async fn forward_shutdown<F>(signals: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = io::Result<&'static str>>,
{
    match signals.await {
        Ok(name) => {
            info!("received {}", name);
            let _ = shutdown.send(true);
        }
        Err(e) => error!("failed to listen for shutdown signal, continuing without it: {}", e),
    }
}

/// Registers the SIGINT and SIGTERM handlers and returns a future that resolves
/// with the name of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = io::Result<&'static str>>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            _ = sigint.recv() => Ok("SIGINT"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = io::Result<&'static str>>> {
    Ok(async {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl-C")
    })
}
