use haemocytometer_common::{coerce, Concentration, InputValue};

pub const MIN_DILUTION: f64 = 1.0;
pub const MIN_AREA_MM2: f64 = 0.0001;
pub const MIN_DEPTH_MM: f64 = 0.01;
pub const DEFAULT_DEPTH_MM: f64 = 0.1;

const MICROLITERS_PER_MILLILITER: f64 = 1000.0;

/// The five quantities the haemocytometer formula needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculatorInputs {
    pub counted_cells: u32,
    /// Must be at least 1.
    pub squares_counted: u32,
    /// Must be positive.
    pub area_per_square_mm2: f64,
    /// Must be positive.
    pub depth_mm: f64,
    /// Must be at least 1.
    pub dilution_factor: f64,
}

/// Converts a manual count into cells per microliter and per milliliter.
pub struct ConcentrationCalculator;

impl ConcentrationCalculator {
    /// Applies `(N / (S * area * depth)) * D`, using 1 mm^3 = 1 uL.
    ///
    /// Callers clamp their inputs first; `squares_counted == 0` or a zero
    /// volume has no defined result.
    pub fn calculate(inputs: &CalculatorInputs) -> Concentration {
        let volume_per_square_mm3 = inputs.area_per_square_mm2 * inputs.depth_mm;
        let cells_per_microliter = (inputs.counted_cells as f64
            / (inputs.squares_counted as f64 * volume_per_square_mm3))
            * inputs.dilution_factor;
        Concentration {
            cells_per_microliter,
            cells_per_milliliter: cells_per_microliter * MICROLITERS_PER_MILLILITER,
        }
    }
}

/// Raw calculator form fields. `None` means the field was left at the value
/// prefilled from the scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationRequest {
    pub counted: Option<InputValue>,
    pub squares: Option<InputValue>,
    pub area_mm2: Option<InputValue>,
    pub depth_mm: Option<InputValue>,
    pub dilution: Option<InputValue>,
}

impl CalculationRequest {
    /// Resolves the form against the prefilled values and clamps everything
    /// into the calculator's domain. Typed area is honoured only for custom squares.
    pub fn resolve(&self, prefilled: &CalculatorInputs, custom_area: bool) -> CalculatorInputs {
        let counted = match &self.counted {
            Some(v) => coerce(Some(v), 0.0),
            None => prefilled.counted_cells as f64,
        };
        let squares = match &self.squares {
            Some(v) => coerce(Some(v), 1.0),
            None => prefilled.squares_counted as f64,
        };
        let area = match (&self.area_mm2, custom_area) {
            (Some(v), true) => coerce(Some(v), prefilled.area_per_square_mm2),
            _ => prefilled.area_per_square_mm2,
        };
        let depth = coerce(self.depth_mm.as_ref(), prefilled.depth_mm);
        let dilution = coerce(self.dilution.as_ref(), prefilled.dilution_factor);

        CalculatorInputs {
            counted_cells: counted.max(0.0).round() as u32,
            squares_counted: squares.max(1.0).round() as u32,
            area_per_square_mm2: area.max(MIN_AREA_MM2),
            depth_mm: depth.max(MIN_DEPTH_MM),
            dilution_factor: dilution.max(MIN_DILUTION),
        }
    }
}

/// Display form of a result: whole cells, as shown to the user.
pub fn format_concentration(c: &Concentration) -> String {
    format!(
        "{} cells/uL, {} cells/mL",
        c.cells_per_microliter.round(),
        c.cells_per_milliliter.round()
    )
}
