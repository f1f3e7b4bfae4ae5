use std::collections::{BTreeMap, VecDeque};

use smallvec::SmallVec;

use crate::{
    clock::Millis,
    data::Dataset,
    error::{ScopeError, ScopeResult},
    props::{HIGHLIGHT_SLOTS, PendingTransition, PropKey, PropUpdate, Snapshot},
};

/// Default sweep speed: milliseconds of animation per year of data.
pub const SWEEP_MS_PER_YEAR: f64 = 300.0;

/// Default snap duration: a short transition that brings a fractional year to
/// its nearest integer. Also the threshold separating a snap from a
/// deliberate sweep when deriving `animating`.
pub const SNAP_MS: f64 = 83.0;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub sweep_ms_per_year: f64,
    pub snap_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_year: 1974,
            end_year: 2014,
            sweep_ms_per_year: SWEEP_MS_PER_YEAR,
            snap_ms: SNAP_MS,
        }
    }
}

impl EngineConfig {
    /// Default timings over the dataset's observed year range.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let (start_year, end_year) = dataset.year_extent();
        Self {
            start_year,
            end_year,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ScopeResult<()> {
        if self.start_year >= self.end_year {
            return Err(ScopeError::validation("start_year must precede end_year"));
        }
        if !(self.sweep_ms_per_year.is_finite() && self.sweep_ms_per_year > 0.0) {
            return Err(ScopeError::validation("sweep_ms_per_year must be > 0"));
        }
        if !(self.snap_ms.is_finite() && self.snap_ms > 0.0) {
            return Err(ScopeError::validation("snap_ms must be > 0"));
        }
        Ok(())
    }
}

/// An in-flight interpolation of one property toward a target.
///
/// `distance` is `start_value - target`, so the advancing form is
/// `target + distance * remaining` with `remaining` falling 1 -> 0.
#[derive(Clone, Copy, Debug)]
struct ActiveTransition {
    target: f64,
    distance: f64,
    duration: f64,
    start: Millis,
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// Nothing changed; the engine stopped its loop. No further ticks until
    /// the next enqueue.
    Idle,
    /// A new snapshot was committed; dispatch it and schedule the next tick.
    Updated(Snapshot),
}

/// The animation/state-transition engine.
///
/// Input adapters call the command methods (or [`Engine::enqueue`] directly),
/// which only append to the pending queue; all state mutation happens inside
/// [`Engine::tick`], one call per display refresh. Two engine states:
/// Idle (`live == false`, nothing scheduled) and Running.
pub struct Engine {
    config: EngineConfig,
    state: Snapshot,
    queue: VecDeque<PendingTransition>,
    active: BTreeMap<PropKey, ActiveTransition>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> ScopeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Snapshot::at_year(config.start_year),
            queue: VecDeque::new(),
            active: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The last committed snapshot.
    pub fn state(&self) -> &Snapshot {
        &self.state
    }

    /// True while the tick loop should be running.
    pub fn is_live(&self) -> bool {
        self.state.live
    }

    /// Appends transitions to the pending queue, FIFO. Returns true when the
    /// engine just left Idle and the caller must schedule the first tick;
    /// enqueueing while Running needs no action.
    pub fn enqueue<I>(&mut self, batch: I) -> bool
    where
        I: IntoIterator<Item = PendingTransition>,
    {
        self.queue.extend(batch);
        if self.state.live || self.queue.is_empty() {
            false
        } else {
            self.state.live = true;
            true
        }
    }

    /// One per-frame step: drain the queue, advance interpolations, commit.
    ///
    /// `now` must be strictly increasing across calls; a stalled clock would
    /// stall every in-flight interpolation with it.
    #[tracing::instrument(skip(self))]
    pub fn tick(&mut self, now: Millis) -> TickOutcome {
        let mut staged: BTreeMap<PropKey, PropUpdate> = BTreeMap::new();

        // Drain in queue order: a later entry on the same key supersedes an
        // earlier one, and an immediate assignment cancels any interpolation
        // set up before it in this same drain.
        while let Some(pending) = self.queue.pop_front() {
            let key = pending.update.key();
            if !pending.update.is_finite()
                || !pending.duration.is_finite()
                || pending.duration.0 < 0.0
            {
                tracing::warn!(?key, "dropping malformed transition");
                continue;
            }

            if pending.duration.0 == 0.0 {
                staged.insert(key, pending.update);
                self.active.remove(&key);
            } else {
                let Some(target) = pending.update.as_number() else {
                    tracing::warn!(?key, "dropping tweened transition on discrete property");
                    continue;
                };
                // Continuity on supersede: restart from the value as it
                // currently sits, staged this tick or last committed.
                let start_value = staged
                    .get(&key)
                    .and_then(|u| u.as_number())
                    .or_else(|| self.state.number(key));
                let Some(start_value) = start_value else {
                    tracing::warn!(?key, "dropping tweened transition on discrete property");
                    continue;
                };
                self.active.insert(
                    key,
                    ActiveTransition {
                        target,
                        distance: start_value - target,
                        duration: pending.duration.0,
                        start: now,
                    },
                );
            }
        }

        let mut finished: SmallVec<[PropKey; 2]> = SmallVec::new();
        for (key, tr) in &self.active {
            let remaining = if now.0 == tr.start.0 {
                1.0
            } else {
                (1.0 - (now.0 - tr.start.0) / tr.duration).max(0.0)
            };
            if let Some(update) = key.with_number(tr.target + tr.distance * remaining) {
                staged.insert(*key, update);
            }
            if remaining == 0.0 {
                finished.push(*key);
            }
        }
        for key in finished {
            self.active.remove(&key);
        }

        if staged.is_empty() {
            self.state.live = false;
            return TickOutcome::Idle;
        }

        let year_touched = staged.contains_key(&PropKey::Year);
        let mut next = self.state;
        for update in staged.values() {
            next.apply(*update);
        }
        if year_touched {
            next.round_year = next.year.round() as i32;
        }
        next.animating = self
            .active
            .get(&PropKey::Year)
            .is_some_and(|tr| tr.duration > self.config.snap_ms);
        next.live = true;

        self.state = next;
        TickOutcome::Updated(next)
    }

    /// Play/pause. Pausing snaps the fractional year to the nearest integer
    /// over the short snap duration; playing sweeps toward the end year at
    /// the configured speed, wrapping to the start first when already there.
    pub fn toggle_animation(&mut self) -> bool {
        let mut batch: SmallVec<[PendingTransition; 2]> = SmallVec::new();

        if self.state.animating {
            batch.push(PendingTransition::over(
                PropUpdate::Year(f64::from(self.state.round_year)),
                Millis(self.config.snap_ms),
            ));
        } else {
            let end = f64::from(self.config.end_year);
            let mut current = self.state.year;
            if current >= end {
                current = f64::from(self.config.start_year);
                batch.push(PendingTransition::immediate(PropUpdate::Year(current)));
            }
            batch.push(PendingTransition::over(
                PropUpdate::Year(end),
                Millis((end - current) * self.config.sweep_ms_per_year),
            ));
        }

        self.enqueue(batch)
    }

    /// Scrub to an absolute position; `snap` eases over the snap duration
    /// instead of jumping.
    pub fn set_year(&mut self, year: f64, snap: bool) -> bool {
        let duration = if snap {
            Millis(self.config.snap_ms)
        } else {
            Millis::ZERO
        };
        self.enqueue([PendingTransition::over(PropUpdate::Year(year), duration)])
    }

    /// Hover/click over an age band. Writes `round_year - age` into the slot
    /// `highlight_index` points at (age 0 clears it); a lock never overwrites
    /// an occupied slot and advances `highlight_index` to the first empty
    /// slot, or `None` when both are taken.
    pub fn request_highlight_year(&mut self, age: i32, lock: bool) -> bool {
        let Some(index) = self.state.highlight_index else {
            return false;
        };

        let mut batch: SmallVec<[PendingTransition; 2]> = SmallVec::new();
        let mut slots = self.state.highlighted_cohorts;

        if !lock || slots[index].is_none() {
            slots[index] = (age != 0).then(|| self.state.round_year - age);
            batch.push(PendingTransition::immediate(PropUpdate::HighlightedCohorts(
                slots,
            )));
        }

        if lock {
            let next = slots.iter().position(Option::is_none);
            batch.push(PendingTransition::immediate(PropUpdate::HighlightIndex(
                next,
            )));
        }

        self.enqueue(batch)
    }

    /// Clears one highlight slot; `highlight_index` falls back to the first
    /// empty slot (which is at most `index` itself).
    pub fn remove_highlight(&mut self, index: usize) -> bool {
        if index >= HIGHLIGHT_SLOTS {
            tracing::warn!(index, "ignoring out-of-range highlight slot");
            return false;
        }

        let mut slots = self.state.highlighted_cohorts;
        slots[index] = None;
        let first_empty = slots.iter().position(Option::is_none);

        self.enqueue([
            PendingTransition::immediate(PropUpdate::HighlightedCohorts(slots)),
            PendingTransition::immediate(PropUpdate::HighlightIndex(first_empty)),
        ])
    }
}
