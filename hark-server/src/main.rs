//! Hark service entry point.
//!
//! Binds two request/response interfaces over one shared capture +
//! transcription service: a line-oriented TCP protocol and an HTTP API.
//! The process runs until a socket `close` command or ctrl-c.

mod http;
mod service;
mod settings;
mod socket;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use hark_core::transcribe::stub::StubTranscriber;
use hark_core::{RemoteTranscriber, TranscriberHandle};
use service::SttService;
use settings::{default_settings_path, load_settings, save_settings};

#[derive(Parser, Debug)]
#[command(name = "hark", about = "Local speech-to-text capture service")]
struct Args {
    /// Listen address for both interfaces (overrides the settings file)
    #[arg(long)]
    addr: Option<String>,

    /// HTTP port (overrides the settings file)
    #[arg(long)]
    http_port: Option<u16>,

    /// Socket port (overrides the settings file)
    #[arg(long)]
    socket_port: Option<u16>,

    /// Settings file path
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Use the stub transcriber instead of the remote service
    #[arg(long)]
    stub: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hark=info".parse().unwrap()),
        )
        .init();

    info!("Hark starting");

    let args = Args::parse();
    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    if !settings_path.exists() {
        if let Err(e) = save_settings(&settings_path, &settings) {
            warn!(path = ?settings_path, "could not write default settings: {e}");
        }
    }
    if let Some(addr) = args.addr {
        settings.listen_addr = addr;
    }
    if let Some(port) = args.http_port {
        settings.http_port = port;
    }
    if let Some(port) = args.socket_port {
        settings.socket_port = port;
    }
    info!(
        settings_path = ?settings_path,
        addr = %settings.listen_addr,
        http_port = settings.http_port,
        socket_port = settings.socket_port,
        amplitude_threshold = settings.amplitude_threshold,
        silence_timeout_secs = settings.silence_timeout_secs,
        "runtime settings loaded"
    );

    // ── Service setup ─────────────────────────────────────────────────────
    let transcriber = if args.stub {
        info!("using stub transcriber");
        TranscriberHandle::new(StubTranscriber::new())
    } else {
        info!(endpoint = %settings.transcriber_url, "using remote transcriber");
        TranscriberHandle::new(RemoteTranscriber::new(settings.remote_config())?)
    };

    let service = Arc::new(SttService::new(
        settings.detector_config(),
        transcriber,
        settings.beam_size,
        settings.preferred_input_device.clone(),
    ));
    service.warm_up()?;

    // ── Listeners ─────────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let socket_addr = format!("{}:{}", settings.listen_addr, settings.socket_port);
    let socket_listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!(addr = %socket_addr, "socket interface listening");

    let http_addr = format!("{}:{}", settings.listen_addr, settings.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;
    info!(addr = %http_addr, "http interface listening");

    let socket_task = tokio::spawn(socket::serve(
        socket_listener,
        Arc::clone(&service),
        shutdown_tx.clone(),
    ));

    let app = http::router(Arc::clone(&service));
    let mut http_shutdown = shutdown_tx.subscribe();
    let http_task = tokio::spawn(async move {
        axum::serve(http_listener, app)
            .with_graceful_shutdown(async move {
                let _ = http_shutdown.changed().await;
            })
            .await
    });

    // ── Run until close or ctrl-c ─────────────────────────────────────────
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received — shutting down");
            let _ = shutdown_tx.send(true);
        }
        _ = shutdown_rx.changed() => {
            info!("close requested — shutting down");
        }
    }

    if let Err(e) = socket_task.await {
        warn!("socket task join error: {e}");
    }
    match http_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("http server error: {e}"),
        Err(e) => warn!("http task join error: {e}"),
    }

    info!("Hark stopped");
    Ok(())
}
