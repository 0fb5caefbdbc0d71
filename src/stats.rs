use std::time::{Duration, Instant};

/// Game frames per second of emulated time.
pub const FRAMES_PER_SECOND: u32 = 60;

/// What one poll did to the frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAdvance {
    /// First frame ever observed; it becomes the baseline and counts as new.
    First { frame: u32 },
    /// No new frame since the last poll.
    Same,
    Advanced { frame: u32, delta: u32, skipped: u32 },
    /// The counter went backwards. Not expected from the transport, so only logged.
    Regressed { from: u32, to: u32 },
}

impl FrameAdvance {
    pub fn is_new_frame(&self) -> bool {
        matches!(self, FrameAdvance::First { .. } | FrameAdvance::Advanced { .. })
    }
}

/// Tracks the last observed frame counter.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<u32>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<u32> {
        self.last
    }

    pub fn observe(&mut self, frame: u32) -> FrameAdvance {
        let Some(last) = self.last else {
            self.last = Some(frame);
            return FrameAdvance::First { frame };
        };

        if frame == last {
            FrameAdvance::Same
        } else if frame > last {
            self.last = Some(frame);
            let delta = frame - last;
            FrameAdvance::Advanced {
                frame,
                delta,
                skipped: delta - 1,
            }
        } else {
            // Clamp so the next forward step is measured from here
            self.last = Some(frame);
            FrameAdvance::Regressed { from: last, to: frame }
        }
    }
}

/// Process-lifetime counters for frames and thinking time.
#[derive(Debug)]
pub struct RunStats {
    pub total_frames: u64,
    pub skip_frames: u64,
    pub regressions: u64,
    pub dispatches: u64,
    pub thinking_time: Duration,
    start_time: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            skip_frames: 0,
            regressions: 0,
            dispatches: 0,
            thinking_time: Duration::ZERO,
            start_time: Instant::now(),
        }
    }

    pub fn record_frame(&mut self, advance: FrameAdvance) {
        match advance {
            FrameAdvance::Advanced { delta, skipped, .. } => {
                self.total_frames += u64::from(delta);
                self.skip_frames += u64::from(skipped);
            }
            FrameAdvance::Regressed { .. } => self.regressions += 1,
            FrameAdvance::First { .. } | FrameAdvance::Same => {}
        }
    }

    pub fn record_thinking(&mut self, elapsed: Duration) {
        self.dispatches += 1;
        self.thinking_time += elapsed;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Summarize against a budget of `act_every` frames per decision.
    pub fn report(&self, act_every: u32) -> StatsReport {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();

        let fps = if secs > 0.0 {
            self.total_frames as f64 / secs
        } else {
            0.0
        };
        let skip_fraction = if self.total_frames > 0 {
            self.skip_frames as f64 / self.total_frames as f64
        } else {
            0.0
        };
        let avg_thinking = if self.dispatches > 0 {
            self.thinking_time.as_secs_f64() / self.dispatches as f64
        } else {
            0.0
        };
        let budget = f64::from(act_every) / f64::from(FRAMES_PER_SECOND);

        StatsReport {
            total_frames: self.total_frames,
            skip_frames: self.skip_frames,
            dispatches: self.dispatches,
            elapsed,
            fps,
            skip_fraction,
            avg_thinking_ms: avg_thinking * 1000.0,
            thinking_fraction: avg_thinking / budget,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub total_frames: u64,
    pub skip_frames: u64,
    pub dispatches: u64,
    pub elapsed: Duration,
    pub fps: f64,
    pub skip_fraction: f64,
    pub avg_thinking_ms: f64,
    /// Mean thinking time as a fraction of the time between decisions
    pub thinking_fraction: f64,
}
