use crate::calculator::{CalculatorInputs, DEFAULT_DEPTH_MM, MIN_AREA_MM2, MIN_DEPTH_MM, MIN_DILUTION};
use haemocytometer_common::config::RBC_SQUARE_AREA_MM2;
use haemocytometer_common::{coerce, Cell, CellId, DefaultsConfig, GridRegion, InputValue, SquareType, Summary};
use std::collections::{BTreeSet, HashSet};

/// Blur applied at focus 0; focus 100 is sharp.
pub const MAX_BLUR: f32 = 6.0;

/// Maps a focus level in [0, 100] to a blur amount, inversely.
pub fn blur_for_focus(focus: f32) -> f32 {
    (MAX_BLUR - (focus / 100.0) * MAX_BLUR).max(0.0)
}

/// Everything the simulator knows between two interactions.
///
/// Owned by the `Simulator`; mutated only through its handlers and thrown
/// away wholesale on reset.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// True once the sample-loading sequence has started.
    pub loaded: bool,
    focus: f32,
    // Single source of truth for both dilution input surfaces.
    dilution: f64,
    selected_regions: BTreeSet<GridRegion>,
    cells: Vec<Cell>,
    counted: HashSet<CellId>,
    square_type: SquareType,
    custom_area_mm2: f64,
    depth_mm: f64,
}

impl SimulationState {
    /// Creates a state holding the configured defaults, with no sample loaded.
    pub fn new(defaults: &DefaultsConfig) -> Self {
        let mut state = Self {
            loaded: false,
            focus: 0.0,
            dilution: MIN_DILUTION,
            selected_regions: defaults.selected_regions.iter().copied().collect(),
            cells: Vec::new(),
            counted: HashSet::new(),
            square_type: defaults.square_type,
            custom_area_mm2: RBC_SQUARE_AREA_MM2,
            depth_mm: DEFAULT_DEPTH_MM,
        };
        state.set_focus(defaults.focus);
        state.set_dilution(&InputValue::Number(defaults.dilution));
        state.set_custom_area(&InputValue::Number(defaults.custom_area_mm2));
        state.set_depth(&InputValue::Number(defaults.depth_mm));
        state
    }

    pub fn focus(&self) -> f32 {
        self.focus
    }

    /// Stores the focus level clamped to [0, 100].
    pub fn set_focus(&mut self, level: f32) {
        self.focus = if level.is_nan() { 0.0 } else { level.clamp(0.0, 100.0) };
    }

    pub fn blur(&self) -> f32 {
        blur_for_focus(self.focus)
    }

    pub fn dilution(&self) -> f64 {
        self.dilution
    }

    /// Stores the dilution factor; anything below 1 or unreadable becomes at least 1.
    pub fn set_dilution(&mut self, value: &InputValue) -> f64 {
        self.dilution = coerce(Some(value), MIN_DILUTION).max(MIN_DILUTION);
        self.dilution
    }

    pub fn square_type(&self) -> SquareType {
        self.square_type
    }

    pub fn set_square_type(&mut self, square_type: SquareType) {
        self.square_type = square_type;
    }

    /// Area of one counted square under the current square type.
    pub fn area_per_square_mm2(&self) -> f64 {
        self.square_type.preset_area_mm2().unwrap_or(self.custom_area_mm2)
    }

    pub fn set_custom_area(&mut self, value: &InputValue) -> f64 {
        self.custom_area_mm2 = coerce(Some(value), RBC_SQUARE_AREA_MM2).max(MIN_AREA_MM2);
        self.custom_area_mm2
    }

    pub fn depth_mm(&self) -> f64 {
        self.depth_mm
    }

    pub fn set_depth(&mut self, value: &InputValue) -> f64 {
        self.depth_mm = coerce(Some(value), DEFAULT_DEPTH_MM).max(MIN_DEPTH_MM);
        self.depth_mm
    }

    pub fn selected_regions(&self) -> &BTreeSet<GridRegion> {
        &self.selected_regions
    }

    /// Adds or removes `region`; returns whether it is selected afterwards.
    pub fn toggle_region(&mut self, region: GridRegion) -> bool {
        if self.selected_regions.remove(&region) {
            false
        } else {
            self.selected_regions.insert(region);
            true
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Swaps in a freshly generated scene. Every cell starts uncounted.
    pub fn replace_cells(&mut self, cells: Vec<Cell>) {
        self.counted.clear();
        self.cells = cells;
    }

    pub fn has_cell(&self, id: &CellId) -> bool {
        self.cells.iter().any(|c| &c.id == id)
    }

    pub fn counted(&self) -> &HashSet<CellId> {
        &self.counted
    }

    pub fn is_counted(&self, id: &CellId) -> bool {
        self.counted.contains(id)
    }

    /// Flips a cell between counted and uncounted; returns whether it is counted afterwards.
    pub fn toggle_counted(&mut self, id: &CellId) -> bool {
        if self.counted.remove(id) {
            false
        } else {
            self.counted.insert(id.clone());
            true
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            counted: self.counted.len() as u32,
            squares_selected: self.selected_regions.len() as u32,
        }
    }

    /// Calculator fields as prefilled from the current scene and settings.
    pub fn prefilled_inputs(&self) -> CalculatorInputs {
        let summary = self.summary();
        CalculatorInputs {
            counted_cells: summary.counted,
            squares_counted: summary.squares_selected,
            area_per_square_mm2: self.area_per_square_mm2(),
            depth_mm: self.depth_mm,
            dilution_factor: self.dilution,
        }
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new(&DefaultsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haemocytometer_common::Vec2;

    fn cell(id: &str) -> Cell {
        Cell { id: CellId(id.to_string()), position: Vec2::new(100.0, 100.0), radius: 5.0 }
    }

    #[test]
    fn defaults_match_a_fresh_session() {
        let state = SimulationState::default();
        assert!(!state.loaded);
        assert_eq!(state.focus(), 60.0);
        assert_eq!(state.dilution(), 1.0);
        assert_eq!(state.selected_regions().len(), 5);
        assert!(state.cells().is_empty());
        assert!(state.counted().is_empty());
        assert_eq!(state.area_per_square_mm2(), 0.04);
        assert_eq!(state.depth_mm(), 0.1);
    }

    #[test]
    fn blur_is_inverse_to_focus() {
        assert_eq!(blur_for_focus(0.0), MAX_BLUR);
        assert_eq!(blur_for_focus(100.0), 0.0);
        assert!(blur_for_focus(25.0) > blur_for_focus(75.0));
        let mut state = SimulationState::default();
        state.set_focus(150.0);
        assert_eq!(state.focus(), 100.0);
        assert_eq!(state.blur(), 0.0);
        state.set_focus(-5.0);
        assert_eq!(state.blur(), MAX_BLUR);
    }

    #[test]
    fn dilution_is_clamped_and_coerced() {
        let mut state = SimulationState::default();
        assert_eq!(state.set_dilution(&InputValue::Number(10.0)), 10.0);
        assert_eq!(state.set_dilution(&InputValue::Number(-3.0)), 1.0);
        assert_eq!(state.set_dilution(&InputValue::from("n/a")), 1.0);
        assert_eq!(state.set_dilution(&InputValue::from("4")), 4.0);
    }

    #[test]
    fn square_type_selects_area() {
        let mut state = SimulationState::default();
        state.set_square_type(SquareType::Wbc);
        assert_eq!(state.area_per_square_mm2(), 1.0);
        state.set_square_type(SquareType::Custom);
        state.set_custom_area(&InputValue::Number(0.0625));
        assert_eq!(state.area_per_square_mm2(), 0.0625);
        state.set_custom_area(&InputValue::Number(0.0));
        assert_eq!(state.area_per_square_mm2(), 0.04);
        state.set_custom_area(&InputValue::Number(-1.0));
        assert_eq!(state.area_per_square_mm2(), MIN_AREA_MM2);
        state.set_square_type(SquareType::Rbc);
        assert_eq!(state.area_per_square_mm2(), 0.04);
    }

    #[test]
    fn depth_is_clamped() {
        let mut state = SimulationState::default();
        assert_eq!(state.set_depth(&InputValue::Number(0.001)), MIN_DEPTH_MM);
        assert_eq!(state.set_depth(&InputValue::from("")), DEFAULT_DEPTH_MM);
    }

    #[test]
    fn region_toggle_adds_and_removes() {
        let mut state = SimulationState::default();
        assert!(!state.toggle_region(GridRegion::Center));
        assert_eq!(state.summary().squares_selected, 4);
        assert!(state.toggle_region(GridRegion::Center));
        assert_eq!(state.summary().squares_selected, 5);
    }

    #[test]
    fn toggling_twice_restores_counted_set() {
        let mut state = SimulationState::default();
        state.replace_cells(vec![cell("0-0-a"), cell("0-1-b")]);
        state.toggle_counted(&CellId("0-1-b".into()));
        let before = state.counted().clone();
        let id = CellId("0-0-a".into());
        assert!(state.toggle_counted(&id));
        assert!(!state.toggle_counted(&id));
        assert_eq!(state.counted(), &before);
    }

    #[test]
    fn replacing_cells_clears_counts() {
        let mut state = SimulationState::default();
        state.replace_cells(vec![cell("a")]);
        state.toggle_counted(&CellId("a".into()));
        assert_eq!(state.summary().counted, 1);
        state.replace_cells(vec![cell("b")]);
        assert_eq!(state.summary().counted, 0);
        assert!(state.has_cell(&CellId("b".into())));
        assert!(!state.has_cell(&CellId("a".into())));
    }

    #[test]
    fn prefilled_inputs_follow_scene_and_settings() {
        let mut state = SimulationState::default();
        state.replace_cells(vec![cell("a"), cell("b")]);
        state.toggle_counted(&CellId("a".into()));
        state.set_dilution(&InputValue::Number(2.0));
        let inputs = state.prefilled_inputs();
        assert_eq!(inputs.counted_cells, 1);
        assert_eq!(inputs.squares_counted, 5);
        assert_eq!(inputs.area_per_square_mm2, 0.04);
        assert_eq!(inputs.dilution_factor, 2.0);
    }
}
