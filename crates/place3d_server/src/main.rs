//! Place3D Coordinator
//!
//! Runs the authoritative world behind the TCP front end until ctrl-c

use anyhow::{Context, Result};
use clap::Parser;
use place3d_net::{WorldConfig, WorldState};
use place3d_services::Settings;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "place3d",
    about = "Authoritative coordinator for collaborative cube building"
)]
struct Args {
    /// JSON settings file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, overriding the settings file
    #[arg(long, env = "PLACE3D_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    tracing::info!("Place3D v{}", place3d_core::VERSION);

    let mut settings = place3d_services::load_settings(args.config.as_deref())
        .context("failed to load settings")?;
    if let Some(bind) = args.bind {
        settings.network.bind = bind;
    }
    settings.validate()?;

    let grid = settings.world.grid;
    tracing::info!(
        "World {}x{} cells, {} layers, cube size {}",
        grid.grid_size,
        grid.grid_size,
        grid.max_height,
        grid.cube_size
    );

    let world = WorldState::new(world_config(&settings));
    let world = place3d_net::serve(&settings.network.bind, world, shutdown_signal())
        .await
        .with_context(|| format!("server on {} failed", settings.network.bind))?;

    tracing::info!("Stopped with {} cubes in the world", world.cubes().len());
    Ok(())
}

fn world_config(settings: &Settings) -> WorldConfig {
    WorldConfig {
        grid: settings.world.grid,
        spawn_position: settings.world.spawn_position,
        palette: settings.world.palette.clone(),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for ctrl-c, running until killed: {}", error);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_config_follows_settings() {
        let mut settings = Settings::default();
        settings.world.grid.max_height = 4;
        let config = world_config(&settings);
        assert_eq!(config.grid.max_height, 4);
        assert_eq!(config.palette, settings.world.palette);
        assert_eq!(config.spawn_position, settings.world.spawn_position);
    }

    #[test]
    fn bind_flag_is_optional() {
        let args = Args::try_parse_from(["place3d"]).unwrap();
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["place3d", "--bind", "127.0.0.1:4000"]).unwrap();
        assert_eq!(args.bind.as_deref(), Some("127.0.0.1:4000"));
    }
}
