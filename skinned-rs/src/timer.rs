//! Frame timer

use std::time::{Duration, Instant};

/// How the timer measures frame time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerMode {
    /// Wall-clock time between ticks
    RealTime,
    /// Every tick advances by the same step, for reproducible headless runs
    Fixed(f32),
}

/// Tracks the time since the previous frame and the total running time.
///
/// Time spent stopped is excluded from the total, and a negative delta
/// (which wall clocks can produce across sleep states) is reported as zero.
#[derive(Debug, Clone)]
pub struct GameTimer {
    mode: TimerMode,
    base: Instant,
    prev: Instant,
    paused: Duration,
    stopped_at: Option<Instant>,
    delta: f32,
    fixed_total: f64,
    frame_count: u64,
}

impl GameTimer {
    pub fn new(mode: TimerMode) -> Self {
        let now = Instant::now();
        Self {
            mode,
            base: now,
            prev: now,
            paused: Duration::ZERO,
            stopped_at: None,
            delta: 0.0,
            fixed_total: 0.0,
            frame_count: 0,
        }
    }

    pub fn fixed(step: f32) -> Self {
        Self::new(TimerMode::Fixed(step))
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Restart the clock, typically just before the first frame
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.base = now;
        self.prev = now;
        self.paused = Duration::ZERO;
        self.stopped_at = None;
        self.delta = 0.0;
        self.fixed_total = 0.0;
        self.frame_count = 0;
    }

    pub fn start(&mut self) {
        if let Some(stopped_at) = self.stopped_at.take() {
            let now = Instant::now();
            self.paused += now.duration_since(stopped_at);
            self.prev = now;
        }
    }

    pub fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Advance one frame
    pub fn tick(&mut self) {
        if self.is_stopped() {
            self.delta = 0.0;
            return;
        }

        self.delta = match self.mode {
            TimerMode::Fixed(step) => step.max(0.0),
            TimerMode::RealTime => {
                let now = Instant::now();
                let delta = now.saturating_duration_since(self.prev).as_secs_f32();
                self.prev = now;
                delta.max(0.0)
            }
        };
        self.fixed_total += f64::from(self.delta);
        self.frame_count += 1;
    }

    /// Seconds elapsed between the two most recent ticks
    pub fn delta_time(&self) -> f32 {
        self.delta
    }

    /// Seconds elapsed since reset, not counting time spent stopped
    pub fn total_time(&self) -> f32 {
        match self.mode {
            TimerMode::Fixed(_) => self.fixed_total as f32,
            TimerMode::RealTime => {
                let end = self.stopped_at.unwrap_or(self.prev);
                end.saturating_duration_since(self.base)
                    .saturating_sub(self.paused)
                    .as_secs_f32()
            }
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new(TimerMode::RealTime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step() {
        let mut timer = GameTimer::fixed(0.25);
        assert_eq!(timer.delta_time(), 0.0);
        for _ in 0..4 {
            timer.tick();
        }
        assert_eq!(timer.delta_time(), 0.25);
        assert_eq!(timer.total_time(), 1.0);
        assert_eq!(timer.frame_count(), 4);
    }

    #[test]
    fn test_negative_step_is_zero() {
        let mut timer = GameTimer::fixed(-1.0);
        timer.tick();
        assert_eq!(timer.delta_time(), 0.0);
    }

    #[test]
    fn test_stopped_timer_does_not_advance() {
        let mut timer = GameTimer::fixed(0.5);
        timer.tick();
        timer.stop();
        timer.tick();
        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.total_time(), 0.5);

        timer.start();
        timer.tick();
        assert_eq!(timer.total_time(), 1.0);
    }

    #[test]
    fn test_reset() {
        let mut timer = GameTimer::fixed(0.5);
        timer.tick();
        timer.reset();
        assert_eq!(timer.total_time(), 0.0);
        assert_eq!(timer.frame_count(), 0);
    }

    #[test]
    fn test_real_time_is_monotonic() {
        let mut timer = GameTimer::default();
        timer.tick();
        let first = timer.total_time();
        timer.tick();
        assert!(timer.delta_time() >= 0.0);
        assert!(timer.total_time() >= first);
    }
}
