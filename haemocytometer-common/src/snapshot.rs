use crate::grid::{GridLayout, GridRegion};
use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};

/// Running totals shown next to the calculator inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Cells currently marked as counted.
    pub counted: u32,
    /// Regions currently selected, i.e. squares counted.
    pub squares_selected: u32,
}

/// Result of the haemocytometer formula. Unrounded; rounding is for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub cells_per_microliter: f64,
    pub cells_per_milliliter: f64,
}

/// A cell as the renderer last drew it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub id: String,
    pub position: Vec2,
    pub radius: f32,
    pub counted: bool,
}

/// What the presentation layer showed after one interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Interaction that produced this frame.
    pub label: String,
    pub layout: GridLayout,
    /// Whether the sample (liquid and cells) is visible.
    pub loaded: bool,
    /// Blur in pixels standing in for microscope focus.
    pub blur: f32,
    pub dilution: f64,
    pub highlighted_regions: Vec<GridRegion>,
    pub cells: Vec<CellView>,
    pub summary: Summary,
    /// Last calculator result on display, if any.
    #[serde(default)]
    pub concentration: Option<Concentration>,
}

