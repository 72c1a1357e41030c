use crate::calculator::{format_concentration, CalculationRequest, ConcentrationCalculator};
use crate::renderer::Renderer;
use crate::scene::SceneGenerator;
use crate::state::SimulationState;
use haemocytometer_common::{
    CellId, Concentration, DefaultsConfig, DensityPreset, GridRegion, InputValue, ScenePresets, SimulatorConfig,
    SquareType, Summary,
};
use log::{debug, info, trace, warn};
use rand::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The loading sequence begins; finish it with `on_load_animation_finished`.
    Started,
    /// A sample is already in the chamber; nothing happens.
    AlreadyLoaded,
}

/// The interaction handlers of the haemocytometer simulator.
///
/// Owns the simulation state, the scene generator and the renderer. Every
/// handler runs to completion before the next one starts.
pub struct Simulator<R: Renderer, G: Rng = StdRng> {
    defaults: DefaultsConfig,
    presets: ScenePresets,
    default_preset: DensityPreset,
    state: SimulationState,
    generator: SceneGenerator<G>,
    renderer: R,
}

impl<R: Renderer> Simulator<R, StdRng> {
    /// Creates a simulator from the configuration, seeding the generator from `scene.seed`.
    pub fn new(config: &SimulatorConfig, renderer: R) -> Self {
        let generator = SceneGenerator::from_seed(config.get_scene_params(), config.scene.seed);
        Self::with_generator(config, generator, renderer)
    }
}

impl<R: Renderer, G: Rng> Simulator<R, G> {
    pub fn with_generator(config: &SimulatorConfig, generator: SceneGenerator<G>, renderer: R) -> Self {
        let mut sim = Self {
            defaults: config.defaults.clone(),
            presets: config.scene.presets.clone(),
            default_preset: config.scene.default_preset,
            state: SimulationState::new(&config.defaults),
            generator,
            renderer,
        };
        sim.sync_renderer();
        sim
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn summary(&self) -> Summary {
        self.state.summary()
    }

    /// Generates a new scene of about `target` cells in the selected regions.
    pub fn on_preset_selected(&mut self, target: u32) {
        let cells = self.generator.generate(target, self.state.selected_regions());
        info!(
            "Generated scene: target {}, {} cells over {} selected regions.",
            target,
            cells.len(),
            self.state.selected_regions().len()
        );
        self.state.replace_cells(cells);
        self.renderer.render_cells(self.state.cells(), self.state.counted());
        self.renderer.show_summary(self.state.summary());
    }

    pub fn on_density_preset(&mut self, preset: DensityPreset) {
        let target = self.presets.target(preset);
        debug!("Density preset {:?} -> target {}", preset, target);
        self.on_preset_selected(target);
    }

    /// Toggles a region in or out of the counted selection; returns whether it is selected now.
    pub fn on_region_toggled(&mut self, region: GridRegion) -> bool {
        let selected = self.state.toggle_region(region);
        debug!("Region {} {}", region, if selected { "selected" } else { "deselected" });
        self.renderer.highlight_regions(self.state.selected_regions());
        self.renderer.show_summary(self.state.summary());
        selected
    }

    /// Flips a cell between counted and uncounted. Returns the new state, or
    /// `None` if no such cell is in the scene.
    pub fn on_cell_clicked(&mut self, id: &CellId) -> Option<bool> {
        if !self.state.has_cell(id) {
            warn!("Ignoring click on unknown cell {}", id);
            return None;
        }
        let counted = self.state.toggle_counted(id);
        trace!("Cell {} {}", id, if counted { "counted" } else { "uncounted" });
        self.renderer.restyle_cell(id, counted);
        self.renderer.show_summary(self.state.summary());
        Some(counted)
    }

    /// Marks every uncounted cell inside a selected region as counted.
    /// Returns how many cells were marked.
    pub fn count_selected_regions(&mut self) -> usize {
        let layout = self.generator.params().layout;
        let to_mark: Vec<CellId> = self
            .state
            .cells()
            .iter()
            .filter(|c| !self.state.is_counted(&c.id))
            .filter(|c| {
                layout
                    .region_containing(c.position)
                    .is_some_and(|r| self.state.selected_regions().contains(&r))
            })
            .map(|c| c.id.clone())
            .collect();
        for id in &to_mark {
            self.on_cell_clicked(id);
        }
        debug!("Marked {} cells inside selected regions.", to_mark.len());
        to_mark.len()
    }

    /// Runs the haemocytometer formula on the form fields. Leaves the state untouched.
    pub fn on_calculate_requested(&mut self, request: &CalculationRequest) -> Concentration {
        let custom = self.state.square_type() == SquareType::Custom;
        let inputs = request.resolve(&self.state.prefilled_inputs(), custom);
        let result = ConcentrationCalculator::calculate(&inputs);
        info!(
            "N={}, squares={}, area={} mm2, depth={} mm, dilution={}x -> {}",
            inputs.counted_cells,
            inputs.squares_counted,
            inputs.area_per_square_mm2,
            inputs.depth_mm,
            inputs.dilution_factor,
            format_concentration(&result)
        );
        self.renderer.show_concentration(Some(&result));
        result
    }

    /// Starts loading the sample. Idempotent while loaded.
    pub fn on_load_requested(&mut self) -> LoadOutcome {
        if self.state.loaded {
            debug!("Load requested while already loaded; ignoring.");
            return LoadOutcome::AlreadyLoaded;
        }
        self.state.loaded = true;
        info!("Loading sample into the chamber...");
        LoadOutcome::Started
    }

    /// The loading animation has played out: show the sample, making sure
    /// there is a scene to show.
    pub fn on_load_animation_finished(&mut self) {
        if !self.state.loaded {
            warn!("Load animation finished without a load request; ignoring.");
            return;
        }
        self.renderer.set_loaded_visuals(true);
        if self.state.cells().is_empty() {
            self.on_density_preset(self.default_preset);
        }
        info!("Sample loaded with {} cells.", self.state.cells().len());
    }

    /// Discards everything and returns to the configured defaults.
    pub fn on_reset(&mut self) {
        self.state = SimulationState::new(&self.defaults);
        self.sync_renderer();
        info!("Simulation reset.");
    }

    pub fn on_focus_changed(&mut self, level: f32) {
        self.state.set_focus(level);
        self.renderer.set_blur(self.state.blur());
    }

    pub fn on_dilution_changed(&mut self, value: &InputValue) -> f64 {
        let dilution = self.state.set_dilution(value);
        self.renderer.show_dilution(dilution);
        dilution
    }

    pub fn on_square_type_changed(&mut self, square_type: SquareType) {
        self.state.set_square_type(square_type);
        debug!(
            "Square type {:?}: {} mm2 per square",
            square_type,
            self.state.area_per_square_mm2()
        );
    }

    pub fn on_area_changed(&mut self, value: &InputValue) -> f64 {
        self.state.set_custom_area(value)
    }

    pub fn on_depth_changed(&mut self, value: &InputValue) -> f64 {
        self.state.set_depth(value)
    }

    // Pushes the whole state to the renderer.
    fn sync_renderer(&mut self) {
        self.renderer.set_loaded_visuals(self.state.loaded);
        self.renderer.render_cells(self.state.cells(), self.state.counted());
        self.renderer.highlight_regions(self.state.selected_regions());
        self.renderer.set_blur(self.state.blur());
        self.renderer.show_dilution(self.state.dilution());
        self.renderer.show_summary(self.state.summary());
        self.renderer.show_concentration(None);
    }
}
