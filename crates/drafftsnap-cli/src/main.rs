//! DrafftSnap probe runner
//!
//! Loads a scene, runs its snap probes and prints the results as JSON.

mod scene;

use clap::Parser;
use drafftsnap_core::document::SceneError;
use drafftsnap_core::snap::{ConfigError, SnapManager, SnapPreferences};
use scene::Scene;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "drafftsnap")]
#[command(about = "Run snap probes against a DrafftSnap scene")]
struct Cli {
    /// Scene file (JSON).
    #[arg(value_name = "SCENE")]
    scene: PathBuf,
    /// Preferences file overriding the ones in the scene.
    #[arg(long, value_name = "FILE")]
    preferences: Option<PathBuf>,
    /// Print compact instead of pretty JSON.
    #[arg(long)]
    compact: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let scene = Scene::load(&cli.scene)?;
    let preferences = match &cli.preferences {
        Some(path) => SnapPreferences::load(path)?,
        None => scene.preferences.clone(),
    };
    log::info!(
        "Running {} probes from {}",
        scene.probes.len(),
        cli.scene.display()
    );

    let mut manager = SnapManager::new(preferences);
    let outcomes = scene.run(&mut manager);
    let json = if cli.compact {
        serde_json::to_string(&outcomes)?
    } else {
        serde_json::to_string_pretty(&outcomes)?
    };
    println!("{json}");
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(error) = run(&cli) {
        log::error!("{error}");
        eprintln!("drafftsnap: {error}");
        std::process::exit(1);
    }
}
