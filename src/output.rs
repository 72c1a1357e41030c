use anyhow::{Context, Result};
use haemocytometer_common::{Cell, CellId, Frame};
use log::{error, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File the frames are written to for a given base name and format.
pub fn frames_path(base_filename: &str, format: &str) -> PathBuf {
    let ext = match format {
        "bincode" => "bin",
        "messagepack" => "msgpack",
        _ => "json",
    };
    PathBuf::from(format!("{}_frames.{}", base_filename, ext))
}

/// Writes recorded frames in the requested format. Unknown formats fall back to JSON.
pub fn save_frames(frames: &[Frame], path: &Path, format: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create frames file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        "bincode" => {
            bincode::serialize_into(&mut writer, frames).context("Failed to serialize frames to bincode")?;
        }
        "messagepack" => {
            rmp_serde::encode::write(&mut writer, frames).context("Failed to serialize frames to MessagePack")?;
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            serde_json::to_writer(&mut writer, frames).context("Failed to serialize frames to JSON")?;
        }
    }
    writer.flush()?;
    info!("{} frames saved to {} ({})", frames.len(), path.display(), format);
    Ok(())
}

/// Writes the scene as CSV: one row per cell with its counted flag.
pub fn save_cells_csv(cells: &[Cell], counted: &HashSet<CellId>, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create cells file '{}'", path.display()))?;
    writer.write_record(["id", "x", "y", "radius", "counted"])?;
    for cell in cells {
        writer.write_record([
            cell.id.to_string(),
            format!("{:.4}", cell.position.x),
            format!("{:.4}", cell.position.y),
            format!("{:.4}", cell.radius),
            counted.contains(&cell.id).to_string(),
        ])?;
    }
    writer.flush()?;
    info!("{} cells saved to {}", cells.len(), path.display());
    Ok(())
}
