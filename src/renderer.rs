use haemocytometer_common::{Cell, CellId, CellView, Concentration, Frame, GridLayout, GridRegion, Summary};
use log::{debug, info, trace};
use std::collections::{BTreeSet, HashSet};

/// Presentation capability driven by the simulator.
///
/// The simulator never touches drawing primitives itself; it tells the
/// renderer what changed and the renderer decides how to show it.
pub trait Renderer {
    /// Replaces every drawn cell.
    fn render_cells(&mut self, cells: &[Cell], counted: &HashSet<CellId>);
    /// Restyles a single cell after a click.
    fn restyle_cell(&mut self, id: &CellId, counted: bool);
    fn highlight_regions(&mut self, regions: &BTreeSet<GridRegion>);
    fn set_blur(&mut self, amount: f32);
    /// Shows or hides the liquid and the cells in it.
    fn set_loaded_visuals(&mut self, loaded: bool);

    /// Every dilution input mirrors this value.
    fn show_dilution(&mut self, _dilution: f64) {}
    fn show_summary(&mut self, _summary: Summary) {}
    fn show_concentration(&mut self, _result: Option<&Concentration>) {}
}

/// Keeps the current presentation in memory and snapshots it into frames.
pub struct FrameRecorder {
    current: Frame,
    frames: Vec<Frame>,
}

impl FrameRecorder {
    pub fn new(layout: GridLayout) -> Self {
        Self {
            current: Frame {
                label: String::new(),
                layout,
                loaded: false,
                blur: 0.0,
                dilution: 1.0,
                highlighted_regions: Vec::new(),
                cells: Vec::new(),
                summary: Summary::default(),
                concentration: None,
            },
            frames: Vec::new(),
        }
    }

    /// What is on screen right now.
    pub fn current(&self) -> &Frame {
        &self.current
    }

    /// Records the current presentation under `label`.
    pub fn capture(&mut self, label: impl Into<String>) {
        let mut frame = self.current.clone();
        frame.label = label.into();
        trace!("Captured frame {} '{}'", self.frames.len(), frame.label);
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl Renderer for FrameRecorder {
    fn render_cells(&mut self, cells: &[Cell], counted: &HashSet<CellId>) {
        self.current.cells = cells
            .iter()
            .map(|c| CellView {
                id: c.id.0.clone(),
                position: c.position,
                radius: c.radius,
                counted: counted.contains(&c.id),
            })
            .collect();
    }

    fn restyle_cell(&mut self, id: &CellId, counted: bool) {
        if let Some(view) = self.current.cells.iter_mut().find(|v| v.id == id.as_str()) {
            view.counted = counted;
        }
    }

    fn highlight_regions(&mut self, regions: &BTreeSet<GridRegion>) {
        self.current.highlighted_regions = regions.iter().copied().collect();
    }

    fn set_blur(&mut self, amount: f32) {
        self.current.blur = amount;
    }

    fn set_loaded_visuals(&mut self, loaded: bool) {
        self.current.loaded = loaded;
    }

    fn show_dilution(&mut self, dilution: f64) {
        self.current.dilution = dilution;
    }

    fn show_summary(&mut self, summary: Summary) {
        self.current.summary = summary;
    }

    fn show_concentration(&mut self, result: Option<&Concentration>) {
        self.current.concentration = result.copied();
    }
}

/// Presents nothing; narrates every update through the log instead.
#[derive(Debug, Default)]
pub struct LogRenderer {
    updates: usize,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of presentation updates received so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl Renderer for LogRenderer {
    fn render_cells(&mut self, cells: &[Cell], counted: &HashSet<CellId>) {
        self.updates += 1;
        info!("Render: {} cells on screen, {} counted", cells.len(), counted.len());
    }

    fn restyle_cell(&mut self, id: &CellId, counted: bool) {
        self.updates += 1;
        debug!("Render: cell {} is now {}", id, if counted { "counted" } else { "uncounted" });
    }

    fn highlight_regions(&mut self, regions: &BTreeSet<GridRegion>) {
        self.updates += 1;
        let labels: Vec<&str> = regions.iter().map(|r| r.label()).collect();
        debug!("Render: highlighting {:?}", labels);
    }

    fn set_blur(&mut self, amount: f32) {
        self.updates += 1;
        debug!("Render: blur {:.2}px", amount);
    }

    fn set_loaded_visuals(&mut self, loaded: bool) {
        self.updates += 1;
        info!("Render: sample {}", if loaded { "visible" } else { "hidden" });
    }

    fn show_dilution(&mut self, dilution: f64) {
        self.updates += 1;
        debug!("Render: dilution {}x", dilution);
    }

    fn show_summary(&mut self, summary: Summary) {
        self.updates += 1;
        debug!(
            "Render: {} counted in {} squares",
            summary.counted, summary.squares_selected
        );
    }

    fn show_concentration(&mut self, result: Option<&Concentration>) {
        self.updates += 1;
        match result {
            Some(c) => info!(
                "Render: {:.0} cells/uL ({:.0} cells/mL)",
                c.cells_per_microliter, c.cells_per_milliliter
            ),
            None => debug!("Render: result cleared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haemocytometer_common::Vec2;

    fn cells() -> Vec<Cell> {
        ["a", "b"]
            .iter()
            .map(|id| Cell { id: CellId(id.to_string()), position: Vec2::new(70.0, 70.0), radius: 4.0 })
            .collect()
    }

    #[test]
    fn render_then_restyle_updates_only_that_cell() {
        let mut recorder = FrameRecorder::new(GridLayout::default());
        recorder.render_cells(&cells(), &HashSet::new());
        recorder.restyle_cell(&CellId("b".into()), true);
        let views = &recorder.current().cells;
        assert!(!views[0].counted);
        assert!(views[1].counted);
    }

    #[test]
    fn captured_frames_are_independent_copies() {
        let mut recorder = FrameRecorder::new(GridLayout::default());
        recorder.set_blur(3.0);
        recorder.capture("first");
        recorder.set_blur(0.0);
        recorder.set_loaded_visuals(true);
        recorder.capture("second");
        let frames = recorder.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].label, "first");
        assert_eq!(frames[0].blur, 3.0);
        assert!(!frames[0].loaded);
        assert!(frames[1].loaded);
    }

    #[test]
    fn log_renderer_counts_every_update() {
        let mut renderer = LogRenderer::new();
        assert_eq!(renderer.updates(), 0);
        renderer.render_cells(&cells(), &HashSet::new());
        renderer.restyle_cell(&CellId("a".into()), true);
        let regions: BTreeSet<GridRegion> = GridRegion::ALL.into_iter().collect();
        renderer.highlight_regions(&regions);
        renderer.set_blur(1.5);
        renderer.set_loaded_visuals(true);
        renderer.show_dilution(2.0);
        renderer.show_summary(Summary { counted: 1, squares_selected: 5 });
        renderer.show_concentration(None);
        assert_eq!(renderer.updates(), 8);
    }
}
