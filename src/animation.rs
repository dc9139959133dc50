//! Flip rotation animation
//!
//! A half turn interpolated with quadratic ease-in-out, advanced by the
//! same fixed tick that drives the countdown.

use std::time::Duration;

/// Length of one flip
pub const FLIP_DURATION: Duration = Duration::from_millis(600);

/// Degrees added by one flip
pub const FLIP_DEGREES: f32 = 180.0;

/// Quadratic ease-in-out on `t` in [0, 1]
pub fn ease_in_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlipAnimation {
    from: f32,
    to: f32,
    elapsed: Duration,
}

impl FlipAnimation {
    /// Half turn starting at `from`
    pub fn starting_at(from: f32) -> Self {
        FlipAnimation {
            from,
            to: from + FLIP_DEGREES,
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by `dt`; returns true once the animation has finished
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed = (self.elapsed + dt).min(FLIP_DURATION);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= FLIP_DURATION
    }

    pub fn progress(&self) -> f32 {
        self.elapsed.as_secs_f32() / FLIP_DURATION.as_secs_f32()
    }

    /// Current eased angle in degrees
    pub fn angle(&self) -> f32 {
        if self.is_finished() {
            return self.to;
        }
        self.from + (self.to - self.from) * ease_in_out_quad(self.progress())
    }

    pub fn target(&self) -> f32 {
        self.to
    }
}
