pub mod cell;
pub mod config;
pub mod grid;
pub mod input;
pub mod scene_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use cell::{Cell, CellId};
pub use config::{
    DefaultsConfig, DensityPreset, GridConfig, OutputConfig, SceneConfig, ScenePresets, SessionAction,
    SessionConfig, SimulatorConfig, SquareType, MAX_SCENE_TARGET,
};
pub use grid::{GridLayout, GridRegion, Rect};
pub use input::{coerce, InputValue};
pub use scene_params::SceneParams;
pub use snapshot::{CellView, Concentration, Frame, Summary};
pub use vecmath::{clamp, Vec2};
