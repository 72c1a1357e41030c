use anyhow::Result;
use clap::Parser;
use haemocytometer_common::{OutputConfig, SimulatorConfig};
use log::{debug, error, info};
use std::path::PathBuf;
use std::time::Instant;

// Define modules used by main
mod calculator;
mod output;
mod renderer;
mod scene;
mod session;
mod simulator;
mod state;

use state::SimulationState;

/// Command-line arguments for the simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulator configuration with the scripted session
    #[arg(default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Haemocytometer Simulator...");

    // --- Load Configuration ---
    let config = SimulatorConfig::load(&args.config)?;
    info!(
        "Loaded {} with {} scripted actions.",
        args.config.display(),
        config.session.actions.len()
    );
    debug!("Scene parameters: {:#?}", config.get_scene_params());
    match config.scene.seed {
        Some(seed) => info!("Scene generator seeded with {}.", seed),
        None => info!("Scene generator seeded from OS entropy."),
    }

    // --- Replay Session ---
    let start_time = Instant::now();
    let output = &config.output;
    if output.save_frames {
        let sim = session::run_session(&config);
        log_elapsed(start_time);
        let format = output.format.as_deref().unwrap_or("json");
        let path = output::frames_path(&output.base_filename, format);
        if let Err(e) = output::save_frames(sim.renderer().frames(), &path, format) {
            error!("Error saving frames to '{}': {:#}", path.display(), e);
        }
        save_cells(output, sim.state());
    } else {
        info!("Frames are not saved (save_frames is false); logging presentation updates instead.");
        let sim = session::run_logged_session(&config);
        log_elapsed(start_time);
        save_cells(output, sim.state());
    }

    info!("Simulation Complete.");
    Ok(())
}

fn log_elapsed(start_time: Instant) {
    info!(
        "Session replayed in {:.3} ms.",
        start_time.elapsed().as_secs_f64() * 1000.0
    );
}

fn save_cells(output: &OutputConfig, state: &SimulationState) {
    if !output.save_cells {
        info!("Skipping saving cells as per config.");
        return;
    }
    let path = PathBuf::from(format!("{}_cells.csv", output.base_filename));
    if let Err(e) = output::save_cells_csv(state.cells(), state.counted(), &path) {
        error!("Error saving cells to '{}': {:#}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_defaults_to_config_toml() {
        let args = Args::try_parse_from(["haemocytometer-sim"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.toml"));
        let args = Args::try_parse_from(["haemocytometer-sim", "runs/dense.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("runs/dense.toml"));
    }
}
