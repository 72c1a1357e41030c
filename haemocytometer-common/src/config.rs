use crate::grid::{GridLayout, GridRegion, Rect};
use crate::input::InputValue;
use crate::scene_params::SceneParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Geometry of the ruled grid, in drawing units
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    pub divisions: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            origin_x: 60.0,
            origin_y: 60.0,
            width: 580.0,
            height: 440.0,
            divisions: 5,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityPreset {
    Low,
    Medium,
    High,
}

// Target cell counts behind the three density buttons
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ScenePresets {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for ScenePresets {
    fn default() -> Self {
        ScenePresets { low: 60, medium: 150, high: 400 }
    }
}

impl ScenePresets {
    pub fn target(&self, preset: DensityPreset) -> u32 {
        match preset {
            DensityPreset::Low => self.low,
            DensityPreset::Medium => self.medium,
            DensityPreset::High => self.high,
        }
    }
}

// Scene generation settings. The tuning values only shape how the field looks.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SceneConfig {
    /// Fixed seed for reproducible layouts; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub presets: ScenePresets,
    #[serde(default = "default_preset")]
    pub default_preset: DensityPreset,
    #[serde(default = "default_unselected_factor")]
    pub unselected_factor: f32,
    #[serde(default = "default_jitter")]
    pub jitter: f32,
    #[serde(default = "default_region_radius")]
    pub region_radius: [f32; 2],
    #[serde(default = "default_background_radius")]
    pub background_radius: [f32; 2],
    #[serde(default = "default_background_scale")]
    pub background_scale: f32,
    #[serde(default = "default_background_floor")]
    pub background_floor: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            seed: None,
            presets: ScenePresets::default(),
            default_preset: default_preset(),
            unselected_factor: default_unselected_factor(),
            jitter: default_jitter(),
            region_radius: default_region_radius(),
            background_radius: default_background_radius(),
            background_scale: default_background_scale(),
            background_floor: default_background_floor(),
        }
    }
}

/// Which square the count was taken over.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SquareType {
    /// Small square used for red (and some white) cell counts, 0.2 x 0.2 mm.
    Rbc,
    /// Large square used for white cell counts, 1 x 1 mm.
    Wbc,
    Custom,
}

impl SquareType {
    /// Fixed area of the preset squares; `None` for custom.
    pub fn preset_area_mm2(self) -> Option<f64> {
        match self {
            SquareType::Rbc => Some(RBC_SQUARE_AREA_MM2),
            SquareType::Wbc => Some(WBC_SQUARE_AREA_MM2),
            SquareType::Custom => None,
        }
    }
}

pub const RBC_SQUARE_AREA_MM2: f64 = 0.04;
pub const WBC_SQUARE_AREA_MM2: f64 = 1.0;

// Values the simulation starts with and returns to on reset
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_focus")]
    pub focus: f32,
    #[serde(default = "default_dilution")]
    pub dilution: f64,
    #[serde(default = "default_selected_regions")]
    pub selected_regions: Vec<GridRegion>,
    #[serde(default = "default_square_type")]
    pub square_type: SquareType,
    #[serde(default = "default_custom_area")]
    pub custom_area_mm2: f64,
    #[serde(default = "default_depth")]
    pub depth_mm: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            focus: default_focus(),
            dilution: default_dilution(),
            selected_regions: default_selected_regions(),
            square_type: default_square_type(),
            custom_area_mm2: default_custom_area(),
            depth_mm: default_depth(),
        }
    }
}

/// One scripted user interaction replayed by the headless driver.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    Load,
    Preset { density: DensityPreset },
    Generate { target: u32 },
    ToggleRegion { region: GridRegion },
    /// Clicks the cell at this position in the current scene.
    ClickCell { index: usize },
    CountSelectedRegions,
    Focus { level: f32 },
    Dilution { value: InputValue },
    #[serde(rename = "square_type")]
    SetSquareType { square_type: SquareType },
    Area { value: InputValue },
    Depth { value: InputValue },
    Calculate {
        #[serde(default)]
        counted: Option<InputValue>,
        #[serde(default)]
        squares: Option<InputValue>,
        #[serde(default)]
        area_mm2: Option<InputValue>,
        #[serde(default)]
        depth_mm: Option<InputValue>,
        #[serde(default)]
        dilution: Option<InputValue>,
    },
    Reset,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub actions: Vec<SessionAction>,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_frames: bool,
    #[serde(default = "default_true")]
    pub save_cells: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_frames: true,
            save_cells: true,
            format: None,
        }
    }
}

pub const OUTPUT_FORMATS: [&str; 3] = ["json", "bincode", "messagepack"];

/// Largest scene a preset or scripted `generate` may ask for.
pub const MAX_SCENE_TARGET: u32 = 5_000;

// Main configuration structure, loaded from config.toml. Every section is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulatorConfig {
    /// Loads the simulator configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulatorConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        if !grid.origin_x.is_finite() || !grid.origin_y.is_finite() {
            anyhow::bail!("grid origin must be a finite point.");
        }
        if !(grid.width > 0.0 && grid.width.is_finite()) || !(grid.height > 0.0 && grid.height.is_finite()) {
            anyhow::bail!("grid width and height must be positive.");
        }
        // Corners and center only stay distinct from three divisions up.
        if grid.divisions < 3 {
            anyhow::bail!("grid divisions must be at least 3.");
        }

        let scene = &self.scene;
        for (name, target) in [
            ("low", scene.presets.low),
            ("medium", scene.presets.medium),
            ("high", scene.presets.high),
        ] {
            if target == 0 || target > MAX_SCENE_TARGET {
                anyhow::bail!("preset '{}' must be between 1 and {} cells.", name, MAX_SCENE_TARGET);
            }
        }
        for (name, value) in [
            ("unselected_factor", scene.unselected_factor),
            ("jitter", scene.jitter),
            ("background_scale", scene.background_scale),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                anyhow::bail!("scene {} must be a non-negative number.", name);
            }
        }
        for (name, [lo, hi]) in [
            ("region_radius", scene.region_radius),
            ("background_radius", scene.background_radius),
        ] {
            if !(lo >= 0.0 && hi >= lo && hi.is_finite()) {
                anyhow::bail!("{} must be a non-negative [min, max] pair.", name);
            }
        }

        if let Some(format) = self.output.format.as_deref() {
            if !OUTPUT_FORMATS.contains(&format) {
                anyhow::bail!("output format '{}' is not one of {:?}.", format, OUTPUT_FORMATS);
            }
        }
        Ok(())
    }

    /// Grid geometry described by the `[grid]` section.
    pub fn layout(&self) -> GridLayout {
        let g = &self.grid;
        GridLayout::new(Rect::new(g.origin_x, g.origin_y, g.width, g.height), g.divisions)
    }

    /// Converts the configuration into the parameters the scene generator runs with.
    pub fn get_scene_params(&self) -> SceneParams {
        let scene = &self.scene;
        SceneParams {
            layout: self.layout(),
            unselected_factor: scene.unselected_factor,
            jitter: scene.jitter,
            region_radius: (scene.region_radius[0], scene.region_radius[1]),
            background_radius: (scene.background_radius[0], scene.background_radius[1]),
            background_scale: scene.background_scale,
            background_floor: scene.background_floor,
        }
    }
}

fn default_preset() -> DensityPreset {
    DensityPreset::Medium
}

fn default_unselected_factor() -> f32 {
    0.25
}

fn default_jitter() -> f32 {
    3.0
}

fn default_region_radius() -> [f32; 2] {
    [4.0, 6.0]
}

fn default_background_radius() -> [f32; 2] {
    [3.5, 6.0]
}

fn default_background_scale() -> f32 {
    0.6
}

fn default_background_floor() -> u32 {
    20
}

fn default_focus() -> f32 {
    60.0
}

fn default_dilution() -> f64 {
    1.0
}

fn default_selected_regions() -> Vec<GridRegion> {
    GridRegion::ALL.to_vec()
}

fn default_square_type() -> SquareType {
    SquareType::Rbc
}

fn default_custom_area() -> f64 {
    RBC_SQUARE_AREA_MM2
}

fn default_depth() -> f64 {
    0.1
}

fn default_base_filename() -> String {
    "haemocytometer".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config.grid.divisions, 5);
        assert_eq!(config.scene.presets.target(DensityPreset::High), 400);
        assert_eq!(config.defaults.selected_regions.len(), 5);
        assert_eq!(config.defaults.square_type, SquareType::Rbc);
        assert!(config.session.actions.is_empty());
        assert_eq!(config.output.base_filename, "haemocytometer");
    }

    #[test]
    fn session_actions_parse_from_tagged_tables() {
        let text = r#"
            [[session.actions]]
            action = "load"

            [[session.actions]]
            action = "preset"
            density = "high"

            [[session.actions]]
            action = "toggle_region"
            region = 4

            [[session.actions]]
            action = "square_type"
            square_type = "wbc"

            [[session.actions]]
            action = "calculate"
            counted = "100"
            squares = 5
        "#;
        let config = SimulatorConfig::from_toml_str(text).unwrap();
        let actions = &config.session.actions;
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], SessionAction::Load);
        assert_eq!(actions[1], SessionAction::Preset { density: DensityPreset::High });
        assert_eq!(actions[2], SessionAction::ToggleRegion { region: GridRegion::Center });
        assert_eq!(actions[3], SessionAction::SetSquareType { square_type: SquareType::Wbc });
        match &actions[4] {
            SessionAction::Calculate { counted, squares, area_mm2, .. } => {
                assert_eq!(counted.as_ref().and_then(InputValue::as_number), Some(100.0));
                assert_eq!(squares.as_ref().and_then(InputValue::as_number), Some(5.0));
                assert!(area_mm2.is_none());
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn out_of_range_region_is_rejected() {
        let text = "[defaults]\nselected_regions = [0, 7]\n";
        assert!(SimulatorConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn invalid_geometry_and_format_are_rejected() {
        assert!(SimulatorConfig::from_toml_str("[grid]\norigin_x = 0.0\norigin_y = 0.0\nwidth = 0.0\nheight = 10.0\ndivisions = 5\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[grid]\norigin_x = 0.0\norigin_y = 0.0\nwidth = 10.0\nheight = 10.0\ndivisions = 2\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[output]\nformat = \"yaml\"\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[scene]\nregion_radius = [6.0, 4.0]\n").is_err());
    }

    #[test]
    fn nan_geometry_and_tuning_are_rejected() {
        assert!(SimulatorConfig::from_toml_str("[grid]\norigin_x = 0.0\norigin_y = 0.0\nwidth = nan\nheight = 10.0\ndivisions = 5\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[grid]\norigin_x = 0.0\norigin_y = 0.0\nwidth = 10.0\nheight = inf\ndivisions = 5\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[scene]\njitter = nan\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[scene]\nbackground_radius = [nan, 6.0]\n").is_err());
    }

    #[test]
    fn presets_must_be_positive_and_bounded() {
        assert!(SimulatorConfig::from_toml_str("[scene.presets]\nlow = 0\nmedium = 150\nhigh = 400\n").is_err());
        assert!(SimulatorConfig::from_toml_str("[scene.presets]\nlow = 60\nmedium = 150\nhigh = 4000000\n").is_err());
        let config = SimulatorConfig::from_toml_str("[scene.presets]\nlow = 10\nmedium = 20\nhigh = 30\n").unwrap();
        assert_eq!(config.scene.presets.target(DensityPreset::Medium), 20);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scene]\nseed = 7\n\n[output]\nformat = \"bincode\"").unwrap();
        let config = SimulatorConfig::load(file.path()).unwrap();
        assert_eq!(config.scene.seed, Some(7));
        assert_eq!(config.output.format.as_deref(), Some("bincode"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimulatorConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn scene_params_carry_layout_and_tuning() {
        let params = SimulatorConfig::default().get_scene_params();
        assert_eq!(params.layout, GridLayout::default());
        assert_eq!(params.region_radius, (4.0, 6.0));
        assert_eq!(params.background_floor, 20);
    }
}
