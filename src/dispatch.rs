use crate::{
    error::ScopeResult,
    props::{ALL_FIELDS, Field, Snapshot},
};

/// A dependent display bound to snapshot fields.
///
/// `update` receives the full merged snapshot plus the subset of its watched
/// fields that actually changed; it is only called when that subset is
/// non-empty.
pub trait View {
    fn name(&self) -> &'static str;

    /// Fields this view reacts to.
    fn watched(&self) -> &'static [Field];

    fn update(&mut self, snapshot: &Snapshot, changed: &[Field]) -> ScopeResult<()>;
}

/// What one dispatch did; returned for observability and tests.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct DispatchReport {
    /// Fields that differ from the last-seen snapshot.
    pub changed: Vec<Field>,
    /// Views whose watched fields intersected `changed` and updated cleanly.
    pub invoked: Vec<&'static str>,
    /// Views whose update returned an error (isolated, loop continues).
    pub failed: Vec<&'static str>,
}

/// Fans committed snapshots out to registered views, gated by a per-field
/// shallow diff so a view never re-renders for inputs it does not watch.
#[derive(Default)]
pub struct Dispatcher {
    views: Vec<Box<dyn View>>,
    last: Option<Snapshot>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, view: Box<dyn View>) {
        self.views.push(view);
    }

    /// Delivers `snapshot` to every view with a changed watched field. The
    /// first dispatch treats every field as changed. A failing view is
    /// logged and skipped; it never stalls the tick loop or its peers.
    #[tracing::instrument(skip(self, snapshot), fields(year = snapshot.year))]
    pub fn dispatch(&mut self, snapshot: &Snapshot) -> DispatchReport {
        let changed: Vec<Field> = match &self.last {
            None => ALL_FIELDS.to_vec(),
            Some(prev) => ALL_FIELDS
                .iter()
                .copied()
                .filter(|f| !snapshot.field_eq(prev, *f))
                .collect(),
        };

        let mut report = DispatchReport {
            changed,
            ..DispatchReport::default()
        };

        for view in &mut self.views {
            let relevant: Vec<Field> = report
                .changed
                .iter()
                .copied()
                .filter(|f| view.watched().contains(f))
                .collect();
            if relevant.is_empty() {
                continue;
            }
            match view.update(snapshot, &relevant) {
                Ok(()) => report.invoked.push(view.name()),
                Err(err) => {
                    tracing::warn!(view = view.name(), %err, "view update failed");
                    report.failed.push(view.name());
                }
            }
        }

        self.last = Some(*snapshot);
        report
    }
}
