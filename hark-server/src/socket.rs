//! Line-oriented TCP request/response protocol.
//!
//! ## Commands (newline-terminated UTF-8)
//!
//! | Command | Reply |
//! |---------|-------|
//! | `transcribe` | one line with the concatenated segment text |
//! | `close` | `bye`, then the whole service shuts down |
//! | anything else | `error: unknown command '…'` |
//!
//! Malformed input and connection drops are logged and never abort the
//! hosting process; each request is independent.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::service::SttService;

/// A parsed protocol command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Transcribe,
    Close,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "transcribe" => Some(Self::Transcribe),
            "close" => Some(Self::Close),
            _ => None,
        }
    }
}

/// Accept connections until the shutdown flag flips.
pub async fn serve(
    listener: TcpListener,
    service: Arc<SttService>,
    shutdown_tx: watch::Sender<bool>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "socket client connected");
                        let service = Arc::clone(&service);
                        let shutdown_tx = shutdown_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, service, shutdown_tx).await {
                                // Transport errors stay at the transport boundary.
                                warn!("socket connection error: {e}");
                            }
                        });
                    }
                    Err(e) => warn!("accept failed: {e}"),
                }
            }
        }
    }
    info!("socket listener stopped");
}

async fn handle_connection(
    stream: TcpStream,
    service: Arc<SttService>,
    shutdown_tx: watch::Sender<bool>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line) {
            Some(Command::Transcribe) => {
                let service = Arc::clone(&service);
                let result =
                    tokio::task::spawn_blocking(move || service.transcribe_live()).await;
                let reply = match result {
                    Ok(Ok(transcription)) => transcription.text(),
                    Ok(Err(e)) => {
                        warn!("transcribe request failed: {e}");
                        format!("error: {e}")
                    }
                    Err(e) => {
                        warn!("transcribe task panicked: {e}");
                        "error: internal failure".to_string()
                    }
                };
                write_half.write_all(reply.as_bytes()).await?;
                write_half.write_all(b"\n").await?;
            }
            Some(Command::Close) => {
                info!("close command received");
                write_half.write_all(b"bye\n").await?;
                let _ = shutdown_tx.send(true);
                break;
            }
            None => {
                warn!(command = %line.trim(), "unknown socket command");
                write_half
                    .write_all(format!("error: unknown command '{}'\n", line.trim()).as_bytes())
                    .await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use hark_core::transcribe::stub::StubTranscriber;
    use hark_core::{EndpointConfig, TranscriberHandle};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn stub_service() -> Arc<SttService> {
        Arc::new(SttService::new(
            EndpointConfig::default(),
            TranscriberHandle::new(StubTranscriber::new()),
            5,
            None,
        ))
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("transcribe"), Some(Command::Transcribe));
        assert_eq!(Command::parse("  close \n"), Some(Command::Close));
        assert_eq!(Command::parse("TRANSCRIBE"), None);
        assert_eq!(Command::parse("record"), None);
    }

    #[tokio::test]
    async fn close_command_replies_and_signals_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let server = tokio::spawn(serve(listener, stub_service(), shutdown_tx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"close\n").await.unwrap();

        let mut reply = String::new();
        BufReader::new(read_half)
            .read_line(&mut reply)
            .await
            .unwrap();
        assert_eq!(reply, "bye\n");

        shutdown_rx.changed().await.unwrap();
        assert!(*shutdown_rx.borrow());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_command_gets_error_reply_and_keeps_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);

        let server = tokio::spawn(serve(listener, stub_service(), shutdown_tx.clone()));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        write_half.write_all(b"record\n").await.unwrap();
        let mut reply = String::new();
        reader.read_line(&mut reply).await.unwrap();
        assert_eq!(reply, "error: unknown command 'record'\n");

        // Connection is still usable afterwards.
        write_half.write_all(b"close\n").await.unwrap();
        reply.clear();
        reader.read_line(&mut reply).await.unwrap();
        assert_eq!(reply, "bye\n");

        server.await.unwrap();
    }
}
