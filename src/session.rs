use crate::calculator::CalculationRequest;
use crate::renderer::{FrameRecorder, LogRenderer, Renderer};
use crate::simulator::{LoadOutcome, Simulator};
use haemocytometer_common::{SessionAction, SimulatorConfig, MAX_SCENE_TARGET};
use log::{debug, info, warn};
use rand::Rng;

/// Replays the scripted session from the config, capturing a frame after
/// every action. Returns the simulator so callers can inspect the end state.
pub fn run_session(config: &SimulatorConfig) -> Simulator<FrameRecorder> {
    let mut sim = Simulator::new(config, FrameRecorder::new(config.layout()));
    sim.renderer_mut().capture("start");
    replay(&mut sim, &config.session.actions, |sim, label| sim.renderer_mut().capture(label));
    sim
}

/// Replays the scripted session with every presentation update written to the log.
pub fn run_logged_session(config: &SimulatorConfig) -> Simulator<LogRenderer> {
    let mut sim = Simulator::new(config, LogRenderer::new());
    replay(&mut sim, &config.session.actions, |_, _| {});
    debug!("{} presentation updates logged.", sim.renderer().updates());
    sim
}

/// Applies `actions` in order, calling `after_each` with the action label once each has run.
pub fn replay<R, G, F>(sim: &mut Simulator<R, G>, actions: &[SessionAction], mut after_each: F)
where
    R: Renderer,
    G: Rng,
    F: FnMut(&mut Simulator<R, G>, String),
{
    let total = actions.len();
    for (step, action) in actions.iter().enumerate() {
        let label = action_label(action);
        debug!("Action [{}/{}]: {}", step + 1, total, label);
        apply_action(sim, action);
        after_each(sim, label);
    }

    info!(
        "Session finished after {} actions: {} cells, {} counted, {} squares selected.",
        total,
        sim.state().cells().len(),
        sim.summary().counted,
        sim.summary().squares_selected
    );
}

/// Performs one scripted interaction. Actions that cannot apply are logged and skipped.
pub fn apply_action<R: Renderer, G: Rng>(sim: &mut Simulator<R, G>, action: &SessionAction) {
    match action {
        SessionAction::Load => {
            // No animation runs headless, so readiness follows immediately.
            if sim.on_load_requested() == LoadOutcome::Started {
                sim.on_load_animation_finished();
            }
        }
        SessionAction::Preset { density } => sim.on_density_preset(*density),
        SessionAction::Generate { target } => {
            if *target > MAX_SCENE_TARGET {
                warn!("Generate target {} capped at {} cells.", target, MAX_SCENE_TARGET);
            }
            sim.on_preset_selected((*target).min(MAX_SCENE_TARGET));
        }
        SessionAction::ToggleRegion { region } => {
            sim.on_region_toggled(*region);
        }
        SessionAction::ClickCell { index } => {
            match sim.state().cells().get(*index).map(|c| c.id.clone()) {
                Some(id) => {
                    sim.on_cell_clicked(&id);
                }
                None => warn!(
                    "Skipping click on cell {}: the scene has {} cells.",
                    index,
                    sim.state().cells().len()
                ),
            }
        }
        SessionAction::CountSelectedRegions => {
            sim.count_selected_regions();
        }
        SessionAction::Focus { level } => sim.on_focus_changed(*level),
        SessionAction::Dilution { value } => {
            sim.on_dilution_changed(value);
        }
        SessionAction::SetSquareType { square_type } => sim.on_square_type_changed(*square_type),
        SessionAction::Area { value } => {
            sim.on_area_changed(value);
        }
        SessionAction::Depth { value } => {
            sim.on_depth_changed(value);
        }
        SessionAction::Calculate { counted, squares, area_mm2, depth_mm, dilution } => {
            let request = CalculationRequest {
                counted: counted.clone(),
                squares: squares.clone(),
                area_mm2: area_mm2.clone(),
                depth_mm: depth_mm.clone(),
                dilution: dilution.clone(),
            };
            sim.on_calculate_requested(&request);
        }
        SessionAction::Reset => sim.on_reset(),
    }
}

/// Short human-readable name of an action, used as the frame label.
pub fn action_label(action: &SessionAction) -> String {
    match action {
        SessionAction::Load => "load".to_string(),
        SessionAction::Preset { density } => format!("preset {:?}", density).to_lowercase(),
        SessionAction::Generate { target } => format!("generate {}", target),
        SessionAction::ToggleRegion { region } => format!("toggle region {}", region.index()),
        SessionAction::ClickCell { index } => format!("click cell {}", index),
        SessionAction::CountSelectedRegions => "count selected regions".to_string(),
        SessionAction::Focus { level } => format!("focus {}", level),
        SessionAction::Dilution { .. } => "dilution".to_string(),
        SessionAction::SetSquareType { square_type } => format!("square type {:?}", square_type).to_lowercase(),
        SessionAction::Area { .. } => "area".to_string(),
        SessionAction::Depth { .. } => "depth".to_string(),
        SessionAction::Calculate { .. } => "calculate".to_string(),
        SessionAction::Reset => "reset".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haemocytometer_common::{DensityPreset, GridRegion, InputValue};

    fn config_with(actions: Vec<SessionAction>) -> SimulatorConfig {
        let mut config = SimulatorConfig::default();
        config.scene.seed = Some(2024);
        config.session.actions = actions;
        config
    }

    #[test]
    fn one_frame_per_action_plus_start() {
        let config = config_with(vec![
            SessionAction::Load,
            SessionAction::Preset { density: DensityPreset::Low },
            SessionAction::Reset,
        ]);
        let sim = run_session(&config);
        let labels: Vec<&str> = sim.renderer().frames().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["start", "load", "preset low", "reset"]);
    }

    #[test]
    fn full_counting_session_produces_a_result() {
        let config = config_with(vec![
            SessionAction::Load,
            SessionAction::ToggleRegion { region: GridRegion::TopRight },
            SessionAction::Preset { density: DensityPreset::Medium },
            SessionAction::CountSelectedRegions,
            SessionAction::Dilution { value: InputValue::Number(2.0) },
            SessionAction::Calculate {
                counted: None,
                squares: None,
                area_mm2: None,
                depth_mm: None,
                dilution: None,
            },
        ]);
        let sim = run_session(&config);
        let last = sim.renderer().frames().last().unwrap();
        assert!(last.loaded);
        assert_eq!(last.summary.squares_selected, 4);
        assert!(last.summary.counted > 0);
        let result = last.concentration.expect("calculation shown");
        let expected = last.summary.counted as f64 / (4.0 * 0.04 * 0.1) * 2.0;
        assert!((result.cells_per_microliter - expected).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_click_is_skipped() {
        let config = config_with(vec![
            SessionAction::Generate { target: 10 },
            SessionAction::ClickCell { index: 10_000 },
            SessionAction::ClickCell { index: 0 },
        ]);
        let sim = run_session(&config);
        assert_eq!(sim.summary().counted, 1);
    }

    #[test]
    fn shipped_config_replays_cleanly() {
        let config = SimulatorConfig::from_toml_str(include_str!("../config.toml")).unwrap();
        let sim = run_session(&config);
        let frames = sim.renderer().frames();
        assert_eq!(frames.len(), config.session.actions.len() + 1);
        let last = frames.last().unwrap();
        assert_eq!(last.label, "calculate");
        // 250 / (4 * 1.0 * 0.1) * 2
        let result = last.concentration.unwrap();
        assert!((result.cells_per_microliter - 1250.0).abs() < 1e-6);
        assert!((last.blur - 0.3).abs() < 1e-5);
    }

    #[test]
    fn second_load_is_a_no_op() {
        let config = config_with(vec![SessionAction::Load, SessionAction::ClickCell { index: 0 }, SessionAction::Load]);
        let sim = run_session(&config);
        let frames = sim.renderer().frames();
        assert_eq!(frames[2].cells, frames[3].cells);
        assert_eq!(sim.summary().counted, 1);
    }

    #[test]
    fn oversized_generate_target_is_capped() {
        let config = config_with(vec![SessionAction::Generate { target: u32::MAX }]);
        let sim = run_session(&config);
        let region_cells = sim
            .state()
            .cells()
            .iter()
            .filter(|c| !c.id.as_str().starts_with("m-"))
            .count();
        assert_eq!(region_cells, MAX_SCENE_TARGET as usize);
    }

    #[test]
    fn logged_session_matches_recorded_session() {
        let config = SimulatorConfig::from_toml_str(include_str!("../config.toml")).unwrap();
        let logged = run_logged_session(&config);
        let recorded = run_session(&config);
        assert_eq!(logged.state().cells(), recorded.state().cells());
        assert_eq!(logged.summary(), recorded.summary());
        assert!(logged.renderer().updates() > config.session.actions.len());
    }
}
