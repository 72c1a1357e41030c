use crate::grid::GridLayout;
use serde::{Deserialize, Serialize};

/// Scene generation parameters derived from the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneParams {
    pub layout: GridLayout,
    /// Share of the per-region count emitted in unselected regions.
    pub unselected_factor: f32,
    /// Full width of the per-axis position jitter.
    pub jitter: f32,
    pub region_radius: (f32, f32),
    pub background_radius: (f32, f32),
    /// Scales the background population down relative to the selected-region density.
    pub background_scale: f32,
    /// Background cells emitted regardless of target.
    pub background_floor: u32,
}

impl Default for SceneParams {
    fn default() -> Self {
        crate::config::SimulatorConfig::default().get_scene_params()
    }
}
