use crate::{
    clock::TickSource,
    dispatch::{DispatchReport, Dispatcher},
    engine::{Engine, TickOutcome},
};

/// Couples the engine, the dispatcher, and a tick source into the
/// cooperative playback loop: one tick per frame, snapshots fanned out to
/// views, stopping the moment the engine reports Idle.
///
/// Everything runs on the caller's thread; input adapters enqueue commands
/// between frames via [`Player::engine_mut`].
pub struct Player<S: TickSource> {
    engine: Engine,
    dispatcher: Dispatcher,
    ticks: S,
}

impl<S: TickSource> Player<S> {
    pub fn new(engine: Engine, dispatcher: Dispatcher, ticks: S) -> Self {
        Self {
            engine,
            dispatcher,
            ticks,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Runs one frame: pulls the next timestamp, ticks, dispatches. Returns
    /// `None` when the engine went (or already was) idle.
    pub fn step(&mut self) -> Option<DispatchReport> {
        if !self.engine.is_live() {
            return None;
        }
        let now = self.ticks.next_frame();
        match self.engine.tick(now) {
            TickOutcome::Idle => None,
            TickOutcome::Updated(snapshot) => Some(self.dispatcher.dispatch(&snapshot)),
        }
    }

    /// Drives frames until the engine idles. Returns how many snapshots were
    /// committed and dispatched.
    #[tracing::instrument(skip(self))]
    pub fn run_until_idle(&mut self) -> u64 {
        let mut frames = 0;
        while self.step().is_some() {
            frames += 1;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTicker;
    use crate::engine::EngineConfig;

    fn player() -> Player<ManualTicker> {
        let engine = Engine::new(EngineConfig {
            start_year: 2000,
            end_year: 2004,
            sweep_ms_per_year: 100.0,
            snap_ms: 20.0,
        })
        .unwrap();
        Player::new(engine, Dispatcher::new(), ManualTicker::new(16.0))
    }

    #[test]
    fn idle_player_does_not_step() {
        let mut p = player();
        assert!(p.step().is_none());
    }

    #[test]
    fn sweep_runs_to_completion_then_idles() {
        let mut p = player();
        p.engine_mut().toggle_animation();
        let frames = p.run_until_idle();

        // 4 years at 100ms/year from t=0 with 16ms frames: the tween
        // finishes on the first tick at or past 400ms, plus the initial
        // hold tick at t=0.
        assert!(frames >= 25);
        assert_eq!(p.engine().state().year, 2004.0);
        assert!(!p.engine().state().live);
        assert!(!p.engine().state().animating);
    }

    #[test]
    fn no_ticks_are_scheduled_while_idle() {
        let mut p = player();
        p.engine_mut().toggle_animation();
        p.run_until_idle();
        assert!(p.step().is_none());
        assert!(p.step().is_none());
    }
}
