//! Frame counting and frames-per-second telemetry.
//!
//! [`FrameMetrics::capture`] returns a [`MetricsGuard`] that the orchestrator
//! holds for the whole render call. Dropping the guard takes an FPS sample, so
//! the sample is taken exactly once per call on every exit path, early
//! returns and `?` included.
//!
//! # Key types
//!
//! - [`FrameMetrics`] holds the counters and the clock
//! - [`MetricsGuard`] samples on drop
//! - [`Telemetry`] fans FPS values out to listeners

use std::ops::{Deref, DerefMut};

use instant::{Duration, Instant};

/// Length of one FPS sampling window.
pub const SAMPLE_WINDOW: Duration = Duration::from_millis(1000);

pub struct FrameMetrics {
    /// Frames rendered since the last sample.
    pub frames_since_sample: u32,
    /// Frames rendered since start-up.
    pub total_frames: usize,
    last_sample: Instant,
    clock: Box<dyn Fn() -> Instant>,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self::with_clock(Box::new(Instant::now))
    }
}

impl std::fmt::Debug for FrameMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameMetrics")
            .field("frames_since_sample", &self.frames_since_sample)
            .field("total_frames", &self.total_frames)
            .field("last_sample", &self.last_sample)
            .finish_non_exhaustive()
    }
}

impl FrameMetrics {
    /// Metrics reading time from `clock`. The first window starts now.
    pub fn with_clock(clock: Box<dyn Fn() -> Instant>) -> Self {
        let last_sample = clock();
        Self {
            frames_since_sample: 0,
            total_frames: 0,
            last_sample,
            clock,
        }
    }

    pub fn frame_rendered(&mut self) {
        self.frames_since_sample += 1;
        self.total_frames += 1;
    }

    /// Close the current window if it is at least [`SAMPLE_WINDOW`] long and
    /// return the rounded frame rate over it.
    pub fn sample(&mut self, now: Instant) -> Option<u32> {
        let elapsed = now.saturating_duration_since(self.last_sample);
        if elapsed < SAMPLE_WINDOW {
            return None;
        }
        let fps = (self.frames_since_sample as f64 / elapsed.as_secs_f64()).round() as u32;
        self.frames_since_sample = 0;
        self.last_sample = now;
        Some(fps)
    }

    /// Start instrumenting one render call.
    pub fn capture<'a>(&'a mut self, telemetry: &'a mut Telemetry) -> MetricsGuard<'a> {
        MetricsGuard {
            metrics: self,
            telemetry,
        }
    }
}

/// Listeners interested in FPS updates.
#[derive(Default)]
pub struct Telemetry {
    listeners: Vec<Box<dyn FnMut(u32)>>,
}

impl Telemetry {
    pub fn subscribe(&mut self, listener: impl FnMut(u32) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, fps: u32) {
        log::debug!("FPS: {}", fps);
        for listener in &mut self.listeners {
            listener(fps);
        }
    }
}

/// Takes an FPS sample when dropped.
pub struct MetricsGuard<'a> {
    metrics: &'a mut FrameMetrics,
    telemetry: &'a mut Telemetry,
}

impl Deref for MetricsGuard<'_> {
    type Target = FrameMetrics;

    fn deref(&self) -> &Self::Target {
        self.metrics
    }
}

impl DerefMut for MetricsGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.metrics
    }
}

impl Drop for MetricsGuard<'_> {
    fn drop(&mut self) {
        let now = (self.metrics.clock)();
        if let Some(fps) = self.metrics.sample(now) {
            self.telemetry.emit(fps);
        }
    }
}
