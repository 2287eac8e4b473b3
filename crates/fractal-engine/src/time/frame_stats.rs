use std::time::Duration;

use super::FrameTime;

/// Average frame time over a reporting window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub frames: u32,
    pub average_dt: f32,
}

impl FrameReport {
    pub fn fps(&self) -> f32 {
        if self.average_dt > 0.0 { 1.0 / self.average_dt } else { 0.0 }
    }
}

/// Accumulates frame times and yields a [`FrameReport`] once per `interval`.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval: f32,
    elapsed: f32,
    frames: u32,
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.as_secs_f32(),
            elapsed: 0.0,
            frames: 0,
        }
    }

    /// Records one frame. Returns a report when the interval has elapsed and
    /// starts a new window.
    pub fn record(&mut self, time: &FrameTime) -> Option<FrameReport> {
        self.elapsed += time.dt;
        self.frames += 1;
        if self.elapsed < self.interval {
            return None;
        }

        let report = FrameReport {
            frames: self.frames,
            average_dt: self.elapsed / self.frames as f32,
        };
        self.elapsed = 0.0;
        self.frames = 0;
        Some(report)
    }
}
