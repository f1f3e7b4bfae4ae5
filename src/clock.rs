use std::time::{Duration, Instant};

use crate::error::{ScopeError, ScopeResult};

/// Timestamp in milliseconds since an arbitrary origin.
///
/// The engine only ever subtracts timestamps, so the origin does not matter;
/// what matters is that a [`TickSource`] hands out strictly increasing values.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Millis(pub f64);

impl Millis {
    pub const ZERO: Millis = Millis(0.0);

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

/// The "request next tick" capability injected into the playback loop.
///
/// `next_frame` blocks until the next display-refresh moment and returns its
/// timestamp. Production uses [`IntervalTicker`]; tests use [`ManualTicker`]
/// so interpolation can be checked without real timers.
pub trait TickSource {
    fn next_frame(&mut self) -> Millis;
}

/// Fixed-rate tick source backed by a monotonic clock.
pub struct IntervalTicker {
    origin: Instant,
    frame: Duration,
    deadline: Instant,
}

impl IntervalTicker {
    pub fn new(fps: u32) -> ScopeResult<Self> {
        if fps == 0 {
            return Err(ScopeError::validation("fps must be > 0"));
        }
        let origin = Instant::now();
        Ok(Self {
            origin,
            frame: Duration::from_secs_f64(1.0 / f64::from(fps)),
            deadline: origin,
        })
    }
}

impl TickSource for IntervalTicker {
    fn next_frame(&mut self) -> Millis {
        self.deadline += self.frame;
        let now = Instant::now();
        if self.deadline > now {
            std::thread::sleep(self.deadline - now);
        }
        // Instant is monotonic, and the sleep guarantees we moved past the
        // previous deadline, so successive timestamps strictly increase.
        Millis(self.origin.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Virtual clock advancing by a fixed step per frame. First frame is at 0.
pub struct ManualTicker {
    step: f64,
    next: f64,
}

impl ManualTicker {
    pub fn new(step_ms: f64) -> Self {
        Self {
            step: step_ms,
            next: 0.0,
        }
    }

    /// Timestamp the next `next_frame` call will return.
    pub fn peek(&self) -> Millis {
        Millis(self.next)
    }
}

impl TickSource for ManualTicker {
    fn next_frame(&mut self) -> Millis {
        let now = self.next;
        self.next += self.step;
        Millis(now)
    }
}
