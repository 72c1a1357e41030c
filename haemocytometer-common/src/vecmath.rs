use serde::{Deserialize, Serialize};
use std::ops::Add;

/// A point or offset in chamber drawing units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2.
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Clamps each component into `[min, max]` of the matching component.
    pub fn clamp_to(&self, min: Vec2, max: Vec2) -> Self {
        Vec2 {
            x: clamp(self.x, min.x, max.x),
            y: clamp(self.y, min.y, max.y),
        }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

/// Clamps a value between a minimum and maximum.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}
