use haemocytometer_common::{Cell, CellId, GridRegion, Rect, SceneParams, Vec2};
use log::debug;
use rand::distr::Alphanumeric;
use rand::prelude::*;
use std::collections::BTreeSet;

const ID_SUFFIX_LEN: usize = 8;

/// Places synthetic cell markers on the grid for counting practice.
///
/// Selected regions receive about `target / |selected|` cells each, unselected
/// regions a fraction of that, and a background population is scattered over
/// the whole bounding box so counting outside the regions still looks real.
pub struct SceneGenerator<R: Rng = StdRng> {
    params: SceneParams,
    rng: R,
}

impl SceneGenerator<StdRng> {
    /// Seeded generators reproduce the same layouts; without a seed the OS supplies entropy.
    pub fn from_seed(params: SceneParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(params, rng)
    }
}

impl<R: Rng> SceneGenerator<R> {
    pub fn new(params: SceneParams, rng: R) -> Self {
        Self { params, rng }
    }

    pub fn params(&self) -> &SceneParams {
        &self.params
    }

    /// Cells emitted into `region` for this target and selection.
    pub fn region_count(&self, target: u32, region: GridRegion, selected: &BTreeSet<GridRegion>) -> usize {
        if selected.is_empty() {
            return 0;
        }
        let per_region = target as f32 / selected.len() as f32;
        let expected = if selected.contains(&region) {
            per_region
        } else {
            per_region * self.params.unselected_factor
        };
        expected.round() as usize
    }

    /// Background cells emitted once `region_cells` cells have been placed.
    pub fn background_count(&self, target: u32, selected: &BTreeSet<GridRegion>, region_cells: usize) -> usize {
        let layout = &self.params.layout;
        let expected_total = if selected.is_empty() {
            0
        } else {
            let selected_area = selected.len() as f32 * layout.cell_area();
            let density = target as f32 / selected_area;
            (layout.bounds.area() * density * self.params.background_scale).round() as usize
        };
        expected_total
            .saturating_sub(region_cells)
            .max(self.params.background_floor as usize)
    }

    /// Generates a fresh scene. Never fails: an empty selection or a zero
    /// target still yields the background scatter.
    pub fn generate(&mut self, target: u32, selected: &BTreeSet<GridRegion>) -> Vec<Cell> {
        let layout = self.params.layout;
        let mut cells = Vec::new();

        for region in GridRegion::ALL {
            let count = self.region_count(target, region, selected);
            let rect = layout.region_rect(region);
            for k in 0..count {
                let base = self.sample_in(&rect);
                let offset = Vec2::new(self.jitter(), self.jitter());
                let position = (base + offset).clamp_to(layout.bounds.origin, layout.bounds.max());
                let radius = self.radius(self.params.region_radius);
                let id = self.make_id(&region.index().to_string(), k);
                cells.push(Cell { id, position, radius });
            }
        }
        let region_cells = cells.len();

        let background = self.background_count(target, selected, region_cells);
        for k in 0..background {
            let position = self.sample_in(&layout.bounds);
            let radius = self.radius(self.params.background_radius);
            let id = self.make_id("m", k);
            cells.push(Cell { id, position, radius });
        }

        debug!(
            "Generated {} cells for target {} ({} in regions, {} background, {} regions selected).",
            cells.len(),
            target,
            region_cells,
            background,
            selected.len()
        );
        cells
    }

    fn sample_in(&mut self, rect: &Rect) -> Vec2 {
        Vec2::new(
            rect.origin.x + self.rng.random::<f32>() * rect.width,
            rect.origin.y + self.rng.random::<f32>() * rect.height,
        )
    }

    fn jitter(&mut self) -> f32 {
        (self.rng.random::<f32>() - 0.5) * self.params.jitter
    }

    fn radius(&mut self, (lo, hi): (f32, f32)) -> f32 {
        lo + self.rng.random::<f32>() * (hi - lo)
    }

    fn make_id(&mut self, prefix: &str, k: usize) -> CellId {
        let suffix: String = (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(ID_SUFFIX_LEN)
            .map(char::from)
            .collect();
        CellId(format!("{}-{}-{}", prefix, k, suffix))
    }
}
