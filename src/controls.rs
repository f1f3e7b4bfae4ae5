use crate::{
    dispatch::View,
    error::ScopeResult,
    props::{Field, Snapshot},
};

/// What the transport strip currently shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct ControlsState {
    /// Text of the big year label.
    pub year_label: i32,
    /// Position of the range slider, in year units.
    pub slider_year: f64,
    /// Play/pause toggle appearance.
    pub playing: bool,
}

/// The transport controls as a dispatcher view. Pure display state; the
/// input side (pointer/keyboard adapters) talks to the engine's command
/// methods directly.
pub struct ControlsView {
    state: ControlsState,
    /// Set by the input adapter while the slider is held; the slider then
    /// stops following the engine so the drag position wins.
    slider_active: bool,
}

impl ControlsView {
    pub fn new(start_year: i32) -> Self {
        Self {
            state: ControlsState {
                year_label: start_year,
                slider_year: f64::from(start_year),
                playing: false,
            },
            slider_active: false,
        }
    }

    pub fn state(&self) -> &ControlsState {
        &self.state
    }

    pub fn set_slider_active(&mut self, active: bool) {
        self.slider_active = active;
    }
}

impl View for ControlsView {
    fn name(&self) -> &'static str {
        "controls"
    }

    fn watched(&self) -> &'static [Field] {
        &[Field::Year, Field::RoundYear, Field::Animating]
    }

    fn update(&mut self, snapshot: &Snapshot, changed: &[Field]) -> ScopeResult<()> {
        if changed.contains(&Field::RoundYear) {
            self.state.year_label = snapshot.round_year;
        }
        if changed.contains(&Field::Year) && !self.slider_active {
            self.state.slider_year = snapshot.year;
        }
        if changed.contains(&Field::Animating) {
            self.state.playing = snapshot.animating;
        }
        Ok(())
    }
}
