use std::time::{Duration, Instant};

use crate::settings::ClockSettings;

/// World clock.
///
/// Tracks the per-tick delta and the accumulated (game) time that delayed
/// messages are scheduled against. The delta comes either from the wall clock
/// or from a fixed time step, is clamped to `[min_time_step, max_time_step]`,
/// and is then scaled by `speed`. A paused clock reports a zero delta and does
/// not accumulate.
#[derive(Debug, Clone)]
pub struct Clock {
    last_update: Instant,
    /// Time since last tick (after clamping and speed scaling)
    delta: Duration,
    /// Total game time accumulated over all ticks
    accumulated: Duration,
    /// Total number of ticks
    frame_count: u64,

    speed: f64,
    paused: bool,
    fixed_time_step: Option<Duration>,
    min_time_step: Duration,
    max_time_step: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(&ClockSettings::default())
    }
}

impl Clock {
    /// Creates a new clock starting from now.
    #[must_use]
    pub fn new(settings: &ClockSettings) -> Self {
        Self {
            last_update: Instant::now(),
            delta: Duration::ZERO,
            accumulated: Duration::ZERO,
            frame_count: 0,
            speed: settings.speed,
            paused: settings.paused,
            fixed_time_step: settings.fixed_time_step,
            min_time_step: settings.min_time_step,
            max_time_step: settings.max_time_step,
        }
    }

    /// Advances the clock by one tick, measuring the wall clock unless a fixed
    /// time step is configured.
    pub fn update(&mut self) {
        let now = Instant::now();
        let raw = self.fixed_time_step.unwrap_or(now - self.last_update);
        self.last_update = now;
        self.advance(raw);
    }

    /// Advances the clock by an explicit raw delta.
    pub fn advance(&mut self, raw_delta: Duration) {
        self.frame_count += 1;

        if self.paused {
            self.delta = Duration::ZERO;
            return;
        }

        let clamped = if self.fixed_time_step.is_some() {
            raw_delta
        } else {
            raw_delta.clamp(self.min_time_step, self.max_time_step)
        };

        self.delta = clamped.mul_f64(self.speed);
        self.accumulated += self.delta;
    }

    /// Time since last tick.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    #[inline]
    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// `1 / delta`, or zero before the first non-empty tick.
    #[must_use]
    pub fn inv_delta_seconds(&self) -> f32 {
        let dt = self.dt_seconds();
        if dt > 0.0 { dt.recip() } else { 0.0 }
    }

    /// Accumulated game time.
    #[inline]
    #[must_use]
    pub fn accumulated_time(&self) -> Duration {
        self.accumulated
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the speed multiplier. Zero, negative and non-finite values are
    /// ignored (pause the clock instead); returns whether the speed changed.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        if !is_valid_speed(speed) {
            log::warn!("ignoring clock speed {speed}: must be finite and positive");
            return false;
        }
        self.speed = speed;
        true
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn set_fixed_time_step(&mut self, step: Option<Duration>) {
        self.fixed_time_step = step;
    }
}

#[inline]
pub(crate) fn is_valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}
