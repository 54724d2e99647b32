//! Gating of workflow actions by prior step completion.

use crate::core::change_map::MapMode;
use crate::types::{SarError, SarResult};

/// User-triggered operations subject to gating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Collect,
    Preview,
    ExportToAssets,
    ExportToDrive,
    ExportSeries,
    ExportFiltered,
    /// Editing the bitemporal interval index
    EditInterval,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Collect => "Collect",
            Action::Preview => "Preview",
            Action::ExportToAssets => "ExportToAssets",
            Action::ExportToDrive => "ExportToDrive",
            Action::ExportSeries => "ExportSeries",
            Action::ExportFiltered => "ExportFiltered",
            Action::EditInterval => "Interval",
        };
        write!(f, "{}", name)
    }
}

/// Step completion flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub has_aoi: bool,
    pub collected: bool,
    pub detected: bool,
    pub previewed: bool,
    /// Interval input is only meaningful in bitemporal mode
    pub interval_input_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowStateController {
    state: WorkflowState,
}

impl WorkflowStateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn permits(&self, action: Action) -> bool {
        let s = &self.state;
        match action {
            Action::Collect => s.has_aoi,
            Action::Preview => s.detected,
            Action::ExportToAssets | Action::ExportToDrive | Action::ExportSeries | Action::ExportFiltered => {
                s.detected && s.previewed
            }
            Action::EditInterval => s.interval_input_enabled,
        }
    }

    pub fn require(&self, action: Action) -> SarResult<()> {
        if self.permits(action) {
            return Ok(());
        }
        let reason = match action {
            Action::Collect => "define an area of interest first",
            Action::Preview => "run Collect first",
            Action::EditInterval => "select the Bitemporal map mode first",
            _ => "run Preview first",
        };
        Err(SarError::Validation(format!("{} is not available: {}", action, reason)))
    }

    /// A polygon was added to the AOI.
    pub fn on_aoi_added(&mut self) {
        self.state.has_aoi = true;
        self.invalidate_results();
    }

    /// A polygon was removed; `empty` tells whether anything is left.
    pub fn on_aoi_removed(&mut self, empty: bool) {
        if empty {
            self.state.has_aoi = false;
        }
    }

    /// The AOI was replaced by asset or collection bounds.
    pub fn on_aoi_replaced(&mut self) {
        self.state.has_aoi = true;
    }

    pub fn on_aoi_cleared(&mut self) {
        self.state.has_aoi = false;
    }

    /// A collect started; earlier results no longer apply.
    pub fn on_results_discarded(&mut self) {
        self.invalidate_results();
    }

    pub fn on_collected(&mut self) {
        self.state.collected = true;
        self.state.detected = false;
        self.state.previewed = false;
    }

    /// A new detection supersedes any earlier preview.
    pub fn on_detected(&mut self) {
        self.state.detected = true;
        self.state.previewed = false;
    }

    pub fn on_previewed(&mut self) {
        self.state.previewed = true;
    }

    /// Any processing parameter changed.
    pub fn on_parameters_changed(&mut self) {
        self.invalidate_results();
    }

    pub fn on_map_mode_changed(&mut self, mode: MapMode) {
        self.state.interval_input_enabled = mode == MapMode::Bitemporal;
    }

    fn invalidate_results(&mut self) {
        self.state.collected = false;
        self.state.detected = false;
        self.state.previewed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORTS: [Action; 4] = [
        Action::ExportToAssets,
        Action::ExportToDrive,
        Action::ExportSeries,
        Action::ExportFiltered,
    ];

    #[test]
    fn test_initial_state_permits_nothing() {
        let gate = WorkflowStateController::new();
        assert!(!gate.permits(Action::Collect));
        assert!(!gate.permits(Action::Preview));
        assert!(EXPORTS.iter().all(|&a| !gate.permits(a)));
        assert!(gate.require(Action::Collect).is_err());
    }

    #[test]
    fn test_collect_preview_export_sequence() {
        let mut gate = WorkflowStateController::new();
        gate.on_aoi_added();
        assert!(gate.permits(Action::Collect));

        gate.on_collected();
        assert!(!gate.permits(Action::Preview));
        gate.on_detected();
        assert!(gate.permits(Action::Preview));
        assert!(EXPORTS.iter().all(|&a| !gate.permits(a)));

        gate.on_previewed();
        assert!(EXPORTS.iter().all(|&a| gate.permits(a)));
    }

    #[test]
    fn test_parameter_change_revokes_preview_and_export() {
        let mut gate = WorkflowStateController::new();
        gate.on_aoi_added();
        gate.on_collected();
        gate.on_detected();
        gate.on_previewed();

        gate.on_parameters_changed();
        assert!(gate.permits(Action::Collect));
        assert!(!gate.permits(Action::Preview));
        assert!(EXPORTS.iter().all(|&a| !gate.permits(a)));
    }

    #[test]
    fn test_redetection_requires_new_preview() {
        let mut gate = WorkflowStateController::new();
        gate.on_aoi_added();
        gate.on_collected();
        gate.on_detected();
        gate.on_previewed();
        gate.on_collected();
        gate.on_detected();
        assert!(gate.permits(Action::Preview));
        assert!(!gate.permits(Action::ExportSeries));
    }

    #[test]
    fn test_discarded_results_keep_collect_available() {
        let mut gate = WorkflowStateController::new();
        gate.on_aoi_added();
        gate.on_collected();
        gate.on_detected();
        gate.on_previewed();

        gate.on_results_discarded();
        assert!(gate.permits(Action::Collect));
        assert!(!gate.permits(Action::Preview));
        assert!(EXPORTS.iter().all(|&a| !gate.permits(a)));
    }

    #[test]
    fn test_aoi_removal_and_mode_gating() {
        let mut gate = WorkflowStateController::new();
        gate.on_aoi_added();
        gate.on_aoi_removed(false);
        assert!(gate.permits(Action::Collect));
        gate.on_aoi_removed(true);
        assert!(!gate.permits(Action::Collect));

        gate.on_map_mode_changed(MapMode::Bitemporal);
        assert!(gate.permits(Action::EditInterval));
        gate.on_map_mode_changed(MapMode::Frequency);
        assert!(!gate.permits(Action::EditInterval));
    }
}
