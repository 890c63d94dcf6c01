//! Place3D Probe
//!
//! Joins a running coordinator, reports what it sees, and optionally places
//! one cube on the ground to check the round trip.

use anyhow::{bail, Context, Result};
use clap::Parser;
use place3d_core::placement::PlacementCandidate;
use place3d_core::Color;
use place3d_net::{ClientSession, ServerMessage};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "place3d-probe", about = "Join a Place3D coordinator and test placement")]
struct Args {
    /// Coordinator address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,
    /// JSON settings file for the prediction timeout
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ground-plane x of a cube to place
    #[arg(long, requires = "z", allow_hyphen_values = true)]
    x: Option<f32>,
    /// Ground-plane z of a cube to place
    #[arg(long, requires = "x", allow_hyphen_values = true)]
    z: Option<f32>,
    /// Cube color; defaults to the color the coordinator assigns
    #[arg(long)]
    color: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let settings = place3d_services::load_settings(args.config.as_deref())?;
    let timeout = settings.client.prediction_timeout();

    let mut session = ClientSession::connect(args.addr.as_str(), timeout)
        .await
        .with_context(|| format!("failed to join {}", args.addr))?;
    let view = session.view();
    tracing::info!(
        "Joined as player {} ({}), {} cubes, {} players",
        view.player_id(),
        view.color(),
        view.cubes().len(),
        view.players().count()
    );

    let (Some(x), Some(z)) = (args.x, args.z) else {
        return Ok(session.close().await?);
    };

    let color = args
        .color
        .map(Color::new)
        .unwrap_or_else(|| session.view().color().clone());
    let me = session.view().player_id();
    let candidate = PlacementCandidate::Ground { x, z };
    let key = session.view().preview(candidate)?;
    let intent = session
        .view_mut()
        .predict_place(candidate, color, Instant::now())?;
    session.send(&intent).await?;
    tracing::info!("Requested cube at {}", key);

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, session.next_event()).await {
            Ok(Ok(Some(ServerMessage::CubePlaced {
                key: placed,
                owner_id,
                ..
            }))) if placed == key => {
                if owner_id != me {
                    bail!("player {} placed at {} first", owner_id, key);
                }
                tracing::info!("Coordinator confirmed cube at {}", key);
                break;
            }
            Ok(Ok(Some(_))) => continue,
            Ok(Ok(None)) => bail!("coordinator closed the connection"),
            Ok(Err(error)) => return Err(error.into()),
            Err(_) => {
                session.view_mut().expire_predictions(Instant::now());
                bail!("no confirmation for {} within {:?}; placement was declined", key, timeout);
            }
        }
    }

    session.close().await?;
    Ok(())
}
