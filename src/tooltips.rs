use std::sync::Arc;

use crate::{
    data::{DataPoint, Dataset, Generation},
    dispatch::View,
    error::ScopeResult,
    props::{Field, HIGHLIGHT_SLOTS, Snapshot},
};

/// `$52,000`-style formatting for incomes.
pub fn format_dollars(value: f64) -> String {
    let whole = value.round().abs() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.push('$');
    let lead = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One highlight panel's display state.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct TooltipPanel {
    /// Birth year of the highlighted cohort; `None` renders the panel
    /// inactive.
    pub cohort: Option<i32>,
    pub generation: Option<Generation>,
    /// The cohort's peak observation (income, age, survey year).
    pub peak: Option<DataPoint>,
    /// Age at the current round year; `None` before the cohort is born.
    pub current_age: Option<i32>,
    /// Occupied and not the slot future interactions write to.
    pub locked: bool,
}

/// The highlight tooltips as a dispatcher view: one panel per slot, fed by
/// the dataset's per-cohort peak lookup.
pub struct TooltipView {
    dataset: Arc<Dataset>,
    panels: [TooltipPanel; HIGHLIGHT_SLOTS],
    current_year: i32,
}

impl TooltipView {
    pub fn new(dataset: Arc<Dataset>, start_year: i32) -> Self {
        Self {
            dataset,
            panels: [TooltipPanel::default(); HIGHLIGHT_SLOTS],
            current_year: start_year,
        }
    }

    pub fn panels(&self) -> &[TooltipPanel; HIGHLIGHT_SLOTS] {
        &self.panels
    }

    /// The round year the panels were last rendered against.
    pub fn current_year(&self) -> i32 {
        self.current_year
    }
}

impl View for TooltipView {
    fn name(&self) -> &'static str {
        "tooltips"
    }

    fn watched(&self) -> &'static [Field] {
        &[
            Field::RoundYear,
            Field::HighlightedCohorts,
            Field::HighlightIndex,
        ]
    }

    fn update(&mut self, snapshot: &Snapshot, _changed: &[Field]) -> ScopeResult<()> {
        self.current_year = snapshot.round_year;
        for (i, panel) in self.panels.iter_mut().enumerate() {
            let Some(born) = snapshot.highlighted_cohorts[i] else {
                *panel = TooltipPanel::default();
                continue;
            };
            *panel = TooltipPanel {
                cohort: Some(born),
                generation: Some(Generation::for_birth_year(born)),
                peak: self.dataset.peak_income(born),
                current_age: (born <= snapshot.round_year)
                    .then(|| snapshot.round_year - born),
                locked: snapshot.highlight_index != Some(i),
            };
        }
        Ok(())
    }
}
