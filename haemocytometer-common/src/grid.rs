use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five conventionally counted squares of the ruled grid.
///
/// Serialized as its index (0-4) so configs and frame files can list regions
/// as plain integers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GridRegion {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl GridRegion {
    /// All regions in index order.
    pub const ALL: [GridRegion; 5] = [
        GridRegion::TopLeft,
        GridRegion::TopRight,
        GridRegion::BottomLeft,
        GridRegion::BottomRight,
        GridRegion::Center,
    ];

    pub fn index(self) -> usize {
        match self {
            GridRegion::TopLeft => 0,
            GridRegion::TopRight => 1,
            GridRegion::BottomLeft => 2,
            GridRegion::BottomRight => 3,
            GridRegion::Center => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            GridRegion::TopLeft => "Top-Left",
            GridRegion::TopRight => "Top-Right",
            GridRegion::BottomLeft => "Bottom-Left",
            GridRegion::BottomRight => "Bottom-Right",
            GridRegion::Center => "Center",
        }
    }

    /// Column and row of this region in a `divisions` x `divisions` grid.
    pub fn grid_cell(self, divisions: u32) -> (u32, u32) {
        let last = divisions.saturating_sub(1);
        let mid = divisions / 2;
        match self {
            GridRegion::TopLeft => (0, 0),
            GridRegion::TopRight => (last, 0),
            GridRegion::BottomLeft => (0, last),
            GridRegion::BottomRight => (last, last),
            GridRegion::Center => (mid, mid),
        }
    }
}

impl TryFrom<u8> for GridRegion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        GridRegion::from_index(value as usize)
            .ok_or_else(|| format!("grid region index {} out of range 0-4", value))
    }
}

impl From<GridRegion> for u8 {
    fn from(region: GridRegion) -> u8 {
        region.index() as u8
    }
}

impl fmt::Display for GridRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.index())
    }
}

/// Axis-aligned rectangle in drawing units.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect { origin: Vec2::new(x, y), width, height }
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width, self.origin.y + self.height)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Haemocytometer counting rule: top and left edges count, bottom and
    /// right edges belong to the neighbour.
    pub fn contains(&self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.origin.x && p.x < max.x && p.y >= self.origin.y && p.y < max.y
    }
}

/// Geometry of the ruled grid: a bounding box divided into equal cells.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub bounds: Rect,
    pub divisions: u32,
}

impl GridLayout {
    pub fn new(bounds: Rect, divisions: u32) -> Self {
        GridLayout { bounds, divisions }
    }

    #[inline(always)]
    pub fn cell_width(&self) -> f32 {
        self.bounds.width / self.divisions as f32
    }

    #[inline(always)]
    pub fn cell_height(&self) -> f32 {
        self.bounds.height / self.divisions as f32
    }

    pub fn cell_area(&self) -> f32 {
        self.cell_width() * self.cell_height()
    }

    pub fn region_rect(&self, region: GridRegion) -> Rect {
        let (col, row) = region.grid_cell(self.divisions);
        Rect::new(
            self.bounds.origin.x + col as f32 * self.cell_width(),
            self.bounds.origin.y + row as f32 * self.cell_height(),
            self.cell_width(),
            self.cell_height(),
        )
    }

    /// The counted region whose square holds `p`, if any.
    pub fn region_containing(&self, p: Vec2) -> Option<GridRegion> {
        GridRegion::ALL
            .into_iter()
            .find(|&region| self.region_rect(region).contains(p))
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout::new(Rect::new(60.0, 60.0, 580.0, 440.0), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_region_rects_match_corner_and_center_cells() {
        let layout = GridLayout::default();
        assert_eq!(layout.region_rect(GridRegion::TopLeft), Rect::new(60.0, 60.0, 116.0, 88.0));
        assert_eq!(layout.region_rect(GridRegion::TopRight), Rect::new(524.0, 60.0, 116.0, 88.0));
        assert_eq!(layout.region_rect(GridRegion::BottomLeft), Rect::new(60.0, 412.0, 116.0, 88.0));
        assert_eq!(layout.region_rect(GridRegion::BottomRight), Rect::new(524.0, 412.0, 116.0, 88.0));
        assert_eq!(layout.region_rect(GridRegion::Center), Rect::new(292.0, 236.0, 116.0, 88.0));
    }

    #[test]
    fn boundary_rule_includes_top_left_and_excludes_bottom_right() {
        let layout = GridLayout::default();
        let rect = layout.region_rect(GridRegion::Center);
        assert_eq!(layout.region_containing(rect.origin), Some(GridRegion::Center));
        assert_eq!(layout.region_containing(rect.max()), None);
        assert_eq!(layout.region_containing(Vec2::new(rect.max().x, rect.origin.y)), None);
    }

    #[test]
    fn points_between_regions_belong_to_none() {
        let layout = GridLayout::default();
        assert_eq!(layout.region_containing(Vec2::new(200.0, 100.0)), None);
    }

    #[test]
    fn region_index_round_trips_through_u8() {
        for region in GridRegion::ALL {
            let raw: u8 = region.into();
            assert_eq!(GridRegion::try_from(raw), Ok(region));
        }
        assert!(GridRegion::try_from(5u8).is_err());
    }
}
