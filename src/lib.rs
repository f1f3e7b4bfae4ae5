//! Cohortscope animates income-by-age trajectories for birth cohorts: a
//! fractional "current year" scrubs through history while cohort polylines
//! grow, fade, and carry a current-position marker.
//!
//! # Pipeline overview
//!
//! 1. **Load**: CSV rows -> [`Dataset`] (one-time cohort projection, grouped
//!    by `year - age`)
//! 2. **Command**: input adapters call [`Engine`] command methods, which only
//!    enqueue [`PendingTransition`]s
//! 3. **Tick**: [`Engine::tick`] drains the queue, advances interpolations,
//!    commits a [`Snapshot`]
//! 4. **Dispatch**: [`Dispatcher`] fans the snapshot out to views whose
//!    watched fields changed
//! 5. **Geometry**: [`ChartView`] turns a snapshot into a serializable
//!    [`ChartFrame`] a renderer can draw
//!
//! All state mutation happens inside `tick`, one call per display refresh;
//! the tick source is an injected capability ([`TickSource`]), so tests run
//! the whole loop on a virtual clock.
#![forbid(unsafe_code)]

pub mod chart;
pub mod clock;
pub mod controls;
pub mod data;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod player;
pub mod props;
pub mod tooltips;

pub use chart::{
    ChartFrame, ChartGeometry, ChartView, CohortTrace, Emphasis, LinearScale, Marker,
    TraceSegment, render_frame, trace_cohort,
};
pub use clock::{IntervalTicker, ManualTicker, Millis, TickSource};
pub use controls::{ControlsState, ControlsView};
pub use data::{Cohort, DataPoint, Dataset, Generation};
pub use dispatch::{DispatchReport, Dispatcher, View};
pub use engine::{Engine, EngineConfig, TickOutcome};
pub use error::{ScopeError, ScopeResult};
pub use player::Player;
pub use props::{
    ALL_FIELDS, Field, HIGHLIGHT_SLOTS, HighlightSlots, PendingTransition, PropKey, PropUpdate,
    Snapshot,
};
pub use tooltips::{TooltipPanel, TooltipView, format_dollars};
