use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a generated cell marker, unique within one scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub String);

impl CellId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A synthetic cell marker placed on the grid for counting practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub position: Vec2,
    /// Drawing radius only; has no bearing on any count.
    pub radius: f32,
}
