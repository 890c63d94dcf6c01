//! TCP front end.
//!
//! Each connection gets a reader that turns lines into intents for the
//! coordinator and a writer that drains the session's outbox to the socket.

use crate::coordinator::{self, CoordinatorHandle};
use crate::error::NetError;
use crate::protocol::{decode_line, encode_line, ClientMessage, ServerMessage};
use crate::session::Outbox;
use crate::world::WorldState;
use place3d_core::PlayerId;
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Longest line accepted from a session, newline included. A session that
/// sends more without a newline is told so and disconnected.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    world: WorldState,
    shutdown: impl Future<Output = ()>,
) -> Result<WorldState, NetError> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, world, shutdown).await
}

/// Serve on an already bound listener. Returns the final world once the
/// coordinator has drained its queue.
pub async fn serve_listener(
    listener: TcpListener,
    world: WorldState,
    shutdown: impl Future<Output = ()>,
) -> Result<WorldState, NetError> {
    tracing::info!("Listening on {}", listener.local_addr()?);
    let (handle, coordinator) = coordinator::spawn(world);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(stream, peer, handle.clone()));
                }
                Err(error) => tracing::warn!("Accept failed: {}", error),
            },
        }
    }

    tracing::info!("Shutdown requested, draining coordinator");
    handle.shutdown()?;
    Ok(coordinator.await?)
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, coordinator: CoordinatorHandle) {
    if let Err(error) = stream.set_nodelay(true) {
        tracing::debug!("Could not set TCP_NODELAY for {}: {}", peer, error);
    }
    let (read_half, write_half) = stream.into_split();
    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(write_half, inbox));

    let player = match coordinator.join(outbox.clone()).await {
        Ok(player) => player,
        Err(error) => {
            tracing::warn!("Connection from {} refused: {}", peer, error);
            drop(outbox);
            let _ = writer.await;
            return;
        }
    };
    tracing::info!("Player {} connected from {}", player, peer);

    if let Err(error) = read_loop(read_half, player, &coordinator, &outbox).await {
        tracing::warn!("Connection for player {} failed: {}", player, error);
    }

    // The leave is queued behind every intent this session already submitted.
    let _ = coordinator.leave(player);
    drop(outbox);
    match writer.await {
        Ok(Err(error)) => tracing::debug!("Writer for player {} stopped: {}", player, error),
        Err(error) => tracing::warn!("Writer for player {} panicked: {}", player, error),
        Ok(Ok(())) => {}
    }
    tracing::info!("Player {} disconnected", player);
}

async fn read_loop(
    read_half: OwnedReadHalf,
    player: PlayerId,
    coordinator: &CoordinatorHandle,
    outbox: &Outbox,
) -> Result<(), NetError> {
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if buf.len() == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            let _ = outbox.send(ServerMessage::Error {
                message: format!("message exceeds {MAX_LINE_BYTES} bytes"),
            });
            return Err(NetError::LineTooLong(MAX_LINE_BYTES));
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(error) => {
                tracing::warn!("Non UTF-8 message from player {}: {}", player, error);
                let _ = outbox.send(ServerMessage::Error {
                    message: "invalid message: not UTF-8".to_string(),
                });
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match decode_line::<ClientMessage>(line) {
            Ok(intent) => coordinator.submit(player, intent)?,
            Err(error) => {
                tracing::warn!("Undecodable message from player {}: {}", player, error);
                let _ = outbox.send(ServerMessage::Error {
                    message: format!("invalid message: {error}"),
                });
            }
        }
    }
}

async fn write_loop(
    write_half: OwnedWriteHalf,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<(), NetError> {
    let mut writer = BufWriter::new(write_half);
    while let Some(message) = inbox.recv().await {
        let line = encode_line(&message)?;
        writer.write_all(line.as_bytes()).await?;
        if inbox.is_empty() {
            writer.flush().await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
