//! TCP client for a place3d coordinator.

use crate::error::NetError;
use crate::protocol::{decode_line, encode_line, ClientMessage, ServerMessage, Snapshot};
use crate::replica::ReplicaView;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Raw message stream to a coordinator.
pub struct ClientConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ClientConnection {
    /// Connect and wait for the join snapshot.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<(Self, Snapshot), NetError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        let mut connection = Self {
            lines: BufReader::new(read_half).lines(),
            writer: BufWriter::new(write_half),
        };

        match connection.recv().await? {
            Some(ServerMessage::Snapshot(snapshot)) => Ok((connection, snapshot)),
            Some(other) => Err(NetError::UnexpectedMessage(other.kind())),
            None => Err(NetError::Closed),
        }
    }

    pub async fn send(&mut self, intent: &ClientMessage) -> Result<(), NetError> {
        let line = encode_line(intent)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next message from the coordinator, or `None` once the connection closes.
    pub async fn recv(&mut self) -> Result<Option<ServerMessage>, NetError> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(decode_line(&line)?));
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), NetError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// A connection paired with the replica it keeps up to date.
pub struct ClientSession {
    connection: ClientConnection,
    view: ReplicaView,
}

impl ClientSession {
    pub async fn connect(
        addr: impl ToSocketAddrs,
        prediction_timeout: Duration,
    ) -> Result<Self, NetError> {
        let (connection, snapshot) = ClientConnection::connect(addr).await?;
        tracing::debug!(
            "Joined as player {} with {} cubes",
            snapshot.assigned_id,
            snapshot.cubes.len()
        );
        Ok(Self {
            connection,
            view: ReplicaView::from_snapshot(snapshot, prediction_timeout),
        })
    }

    pub fn view(&self) -> &ReplicaView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ReplicaView {
        &mut self.view
    }

    pub async fn send(&mut self, intent: &ClientMessage) -> Result<(), NetError> {
        self.connection.send(intent).await
    }

    /// Receive one event and fold it into the replica.
    pub async fn next_event(&mut self) -> Result<Option<ServerMessage>, NetError> {
        let message = self.connection.recv().await?;
        if let Some(message) = &message {
            self.view.apply(message);
        }
        Ok(message)
    }

    pub async fn close(self) -> Result<(), NetError> {
        self.connection.close().await
    }
}
