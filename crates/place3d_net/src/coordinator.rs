//! The single writer.
//!
//! One task owns the [`WorldState`] and the [`SessionRegistry`]. Connection
//! tasks talk to it only through [`CoordinatorHandle`], so every mutation is
//! applied in the order it reached the command queue.

use crate::error::NetError;
use crate::protocol::ClientMessage;
use crate::session::{Outbox, SessionRegistry};
use crate::world::{WorldError, WorldState};
use place3d_core::PlayerId;
use place3d_metrics::{Counter, LatencyWindow};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const LATENCY_WINDOW: usize = 1024;

/// Work items for the coordinator, processed strictly FIFO.
#[derive(Debug)]
pub enum Command {
    Join {
        outbox: Outbox,
        reply: oneshot::Sender<Result<PlayerId, WorldError>>,
    },
    Intent {
        player: PlayerId,
        intent: ClientMessage,
    },
    Leave {
        player: PlayerId,
    },
    Shutdown,
}

/// Cloneable sender side of the command queue.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Join as a new player. The snapshot is pushed to `outbox` before any
    /// later event, then the assigned id is returned.
    pub async fn join(&self, outbox: Outbox) -> Result<PlayerId, NetError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Join { outbox, reply })?;
        let player = response.await.map_err(|_| NetError::CoordinatorClosed)??;
        Ok(player)
    }

    pub fn submit(&self, player: PlayerId, intent: ClientMessage) -> Result<(), NetError> {
        self.send(Command::Intent { player, intent })
    }

    pub fn leave(&self, player: PlayerId) -> Result<(), NetError> {
        self.send(Command::Leave { player })
    }

    /// Stop after every command already queued has been applied.
    pub fn shutdown(&self) -> Result<(), NetError> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), NetError> {
        self.commands
            .send(command)
            .map_err(|_| NetError::CoordinatorClosed)
    }
}

/// Start a coordinator task for `world`. The task hands the world back when it stops.
pub fn spawn(world: WorldState) -> (CoordinatorHandle, JoinHandle<WorldState>) {
    let (commands, queue) = mpsc::unbounded_channel();
    let task = tokio::spawn(Coordinator::new(world).run(queue));
    (CoordinatorHandle { commands }, task)
}

pub struct Coordinator {
    world: WorldState,
    sessions: SessionRegistry,
    counters: Counter,
    apply_latency: LatencyWindow,
}

impl Coordinator {
    pub fn new(world: WorldState) -> Self {
        Self {
            world,
            sessions: SessionRegistry::new(),
            counters: Counter::new(),
            apply_latency: LatencyWindow::new(LATENCY_WINDOW),
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub async fn run(mut self, mut queue: mpsc::UnboundedReceiver<Command>) -> WorldState {
        tracing::info!("Coordinator started");
        while let Some(command) = queue.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            let start = Instant::now();
            self.handle(command);
            self.apply_latency.record(start.elapsed());
        }
        self.report();
        self.world
    }

    /// Apply one command and deliver whatever it produced.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Join { outbox, reply } => self.join(outbox, reply),
            Command::Intent { player, intent } => self.intent(player, intent),
            Command::Leave { player } => self.leave(player),
            Command::Shutdown => {}
        }
    }

    fn join(&mut self, outbox: Outbox, reply: oneshot::Sender<Result<PlayerId, WorldError>>) {
        let joined = match self.world.connect() {
            Ok(joined) => joined,
            Err(error) => {
                tracing::warn!("Refused join: {}", error);
                let _ = reply.send(Err(error));
                return;
            }
        };

        let player = joined.player_id;
        self.sessions.register(player, outbox);
        self.sessions.deliver(&joined.snapshot);
        self.sessions.deliver(&joined.announce);
        self.counters.increment("sessions.joined", 1);
        tracing::info!("Player {} joined ({} connected)", player, self.sessions.len());

        if reply.send(Ok(player)).is_err() {
            // Requester vanished before learning its id.
            self.leave(player);
        }
    }

    fn intent(&mut self, player: PlayerId, intent: ClientMessage) {
        let kind = intent.kind();
        if !self.sessions.contains(player) {
            tracing::debug!("Ignored {} from unregistered player {}", kind, player);
            self.counters.increment("intents.declined", 1);
            return;
        }

        match self.world.apply(player, intent) {
            Ok(outbound) => {
                self.sessions.deliver(&outbound);
                self.counters.increment("intents.accepted", 1);
            }
            Err(error) => {
                tracing::debug!("Declined {} from player {}: {}", kind, player, error);
                self.counters.increment("intents.declined", 1);
            }
        }
    }

    fn leave(&mut self, player: PlayerId) {
        self.sessions.unregister(player);
        match self.world.disconnect(player) {
            Ok(outbound) => {
                self.sessions.deliver(&outbound);
                self.counters.increment("sessions.left", 1);
                tracing::info!("Player {} left ({} connected)", player, self.sessions.len());
            }
            Err(error) => tracing::debug!("Ignored leave: {}", error),
        }
    }

    fn report(&self) {
        tracing::info!(
            "Coordinator stopped with {} cubes and {} sessions",
            self.world.cubes().len(),
            self.sessions.len()
        );
        if place3d_metrics::ENABLED {
            for (name, value) in self.counters.snapshot() {
                tracing::info!("  {}: {}", name, value);
            }
            tracing::info!(
                "  apply latency: mean {:?}, max {:?} over {} commands",
                self.apply_latency.mean(),
                self.apply_latency.max(),
                self.apply_latency.len()
            );
        }
    }
}
