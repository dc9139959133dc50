//! Hourglass countdown and flip state machine
//!
//! Owns the sand clock: total and remaining time, orientation, rotation and
//! the trickle of falling grains. Everything advances through `tick()`,
//! called once per fixed 20ms interval by the event loop.

use std::time::Duration;

use crate::animation::FlipAnimation;
use crate::config::Settings;

/// Interval between two ticks
pub const TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Seconds drained per tick
pub const TICK_SECONDS: f64 = 0.02;

/// Upper bound on concurrently falling grains
pub const MAX_PARTICLES: usize = 15;

/// Grains are dropped once below this fraction of the widget height
const PARTICLE_FLOOR: f32 = 0.8;

/// The widget is this many times larger than the glass, leaving room to rotate
const EXTENT_FACTOR: f32 = 1.6;

/// Remainders below this are float noise from repeated subtraction
const REMAINING_EPSILON: f64 = 1e-9;

/// Widget edge length in pixels for a glass of `size` pixels
pub fn extent_for(size: u32) -> u32 {
    (size as f32 * EXTENT_FACTOR) as u32
}

/// One falling grain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Spawn order, unique for the lifetime of the state
    pub id: u64,
    pub x: f32,
    pub y: f32,
    /// Pixels per tick, in [2, 4)
    pub speed: f32,
    /// Radius in pixels, in [0.5, 1.5)
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Sand is running
    Draining,
    /// Top bulb is empty
    Empty,
    /// Rotation in progress, the clock is stopped
    Flipping(FlipAnimation),
}

pub struct HourglassState {
    total: f64,
    remaining: f64,
    flipped: bool,
    /// Angle at rest; the animation owns the angle while flipping
    rotation: f32,
    phase: Phase,
    particles: Vec<Particle>,
    glass_size: u32,
    next_particle_id: u64,
    rng: fastrand::Rng,
}

impl HourglassState {
    pub fn new(settings: &Settings) -> Self {
        Self::with_rng(settings, fastrand::Rng::new())
    }

    /// Same as `new` with a caller-provided generator for particle spread
    pub fn with_rng(settings: &Settings, rng: fastrand::Rng) -> Self {
        let settings = settings.clamped();
        let total = f64::from(settings.duration);
        HourglassState {
            total,
            remaining: total,
            flipped: false,
            rotation: 0.0,
            phase: Phase::Draining,
            particles: Vec::with_capacity(MAX_PARTICLES),
            glass_size: settings.size,
            next_particle_id: 0,
            rng,
        }
    }

    pub fn total_seconds(&self) -> f64 {
        self.total
    }

    pub fn remaining_seconds(&self) -> f64 {
        self.remaining
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Flipping(_))
    }

    /// Current vessel angle in degrees, eased while flipping
    pub fn rotation_angle(&self) -> f32 {
        match &self.phase {
            Phase::Flipping(anim) => anim.angle(),
            _ => self.rotation,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn glass_size(&self) -> u32 {
        self.glass_size
    }

    /// Widget edge length in pixels
    pub fn extent(&self) -> u32 {
        extent_for(self.glass_size)
    }

    /// remaining / total in [0, 1]; 0 when there is no total
    pub fn ratio(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        (self.remaining / self.total).clamp(0.0, 1.0)
    }

    /// Advance one tick
    pub fn tick(&mut self) {
        match self.phase {
            Phase::Flipping(mut anim) => {
                if anim.advance(TICK_INTERVAL) {
                    self.rotation = anim.target();
                    self.phase = self.resting_phase();
                } else {
                    self.phase = Phase::Flipping(anim);
                }
            }
            Phase::Draining => {
                self.remaining -= TICK_SECONDS;
                if self.remaining < REMAINING_EPSILON {
                    self.remaining = 0.0;
                    self.phase = Phase::Empty;
                } else if self.particles.len() < MAX_PARTICLES {
                    self.spawn_particle();
                }
            }
            Phase::Empty => {}
        }

        let floor = self.extent() as f32 * PARTICLE_FLOOR;
        for particle in &mut self.particles {
            particle.y += particle.speed;
        }
        self.particles.retain(|p| p.y <= floor);
    }

    /// Turn the glass over. Returns false when a flip is already running.
    pub fn flip(&mut self) -> bool {
        if self.is_animating() {
            return false;
        }

        self.remaining = (self.total - self.remaining).clamp(0.0, self.total);
        self.flipped = !self.flipped;
        self.particles.clear();
        self.phase = Phase::Flipping(FlipAnimation::starting_at(self.rotation));
        tracing::debug!(
            "Flip to {:.0} deg, {:.2}s remaining",
            self.rotation + crate::animation::FLIP_DEGREES,
            self.remaining
        );
        true
    }

    /// Full top bulb, upright, no flip in progress
    pub fn refill(&mut self) {
        self.remaining = self.total;
        self.flipped = false;
        self.rotation = 0.0;
        self.particles.clear();
        self.phase = self.resting_phase();
    }

    /// Take a new size and duration without touching the sand already run
    pub fn apply_settings(&mut self, settings: &Settings) {
        let settings = settings.clamped();
        self.glass_size = settings.size;
        self.total = f64::from(settings.duration);
        self.remaining = self.remaining.clamp(0.0, self.total);
        if !self.is_animating() {
            self.phase = self.resting_phase();
        }
    }

    fn resting_phase(&self) -> Phase {
        if self.remaining > 0.0 {
            Phase::Draining
        } else {
            Phase::Empty
        }
    }

    fn spawn_particle(&mut self) {
        let center = self.extent() as f32 / 2.0;
        let particle = Particle {
            id: self.next_particle_id,
            x: center,
            y: center,
            speed: 2.0 + self.rng.f32() * 2.0,
            size: 0.5 + self.rng.f32(),
        };
        self.next_particle_id += 1;
        self.particles.push(particle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOLERANCE: f64 = 1e-6;

    fn state_for(duration: u32) -> HourglassState {
        let settings = Settings {
            duration,
            ..Settings::default()
        };
        HourglassState::with_rng(&settings, fastrand::Rng::with_seed(7))
    }

    fn run_ticks(state: &mut HourglassState, n: usize) {
        for _ in 0..n {
            state.tick();
        }
    }

    /// Ticks until the running flip settles
    fn finish_flip(state: &mut HourglassState) {
        while state.is_animating() {
            state.tick();
        }
    }

    #[test]
    fn test_fresh_state_from_defaults() {
        let state = HourglassState::new(&Settings::default());
        assert_eq!(state.total_seconds(), 60.0);
        assert_eq!(state.remaining_seconds(), 60.0);
        assert_eq!(state.glass_size(), 64);
        assert_eq!(state.extent(), 102);
        assert_eq!(state.phase(), Phase::Draining);
        assert!(!state.is_flipped());
        assert_eq!(state.rotation_angle(), 0.0);
    }

    #[test]
    fn test_half_minute_of_ticks() {
        let mut state = state_for(60);
        run_ticks(&mut state, 1500);
        assert!((state.remaining_seconds() - 30.0).abs() < TOLERANCE);
        assert!((state.ratio() - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_countdown_matches_elapsed_time() {
        for duration in [5, 7, 13] {
            let mut state = state_for(duration);
            let ticks_to_empty = (f64::from(duration) / TICK_SECONDS).round() as usize;
            for elapsed_ticks in 1..=ticks_to_empty + 10 {
                state.tick();
                let expected = (f64::from(duration) - elapsed_ticks as f64 * TICK_SECONDS).max(0.0);
                assert!(
                    (state.remaining_seconds() - expected).abs() <= TICK_SECONDS,
                    "duration {} after {} ticks: {} vs {}",
                    duration,
                    elapsed_ticks,
                    state.remaining_seconds(),
                    expected
                );
                assert!(state.remaining_seconds() >= 0.0);
            }
            assert_eq!(state.remaining_seconds(), 0.0);
            assert_eq!(state.phase(), Phase::Empty);
        }
    }

    #[test]
    fn test_empty_glass_stays_empty() {
        let mut state = state_for(5);
        run_ticks(&mut state, 400);
        assert_eq!(state.phase(), Phase::Empty);
        run_ticks(&mut state, 50);
        assert_eq!(state.remaining_seconds(), 0.0);
        assert_eq!(state.ratio(), 0.0);
    }

    #[test]
    fn test_flip_swaps_drained_and_remaining() {
        let mut state = state_for(60);
        run_ticks(&mut state, 300);
        let before = state.remaining_seconds();

        assert!(state.flip());
        assert!(state.is_animating());
        assert!(state.is_flipped());
        assert!(state.particles().is_empty());
        assert!((state.remaining_seconds() - (60.0 - before)).abs() < TOLERANCE);
    }

    #[test]
    fn test_flip_settles_after_animation() {
        let mut state = state_for(60);
        run_ticks(&mut state, 300);
        state.flip();
        let swapped = state.remaining_seconds();

        run_ticks(&mut state, 29);
        assert!(state.is_animating());
        state.tick();
        assert_eq!(state.phase(), Phase::Draining);
        assert_eq!(state.rotation_angle(), 180.0);
        // the clock stays stopped for the whole rotation
        assert_eq!(state.remaining_seconds(), swapped);
    }

    #[test]
    fn test_double_flip_restores_split() {
        let mut state = state_for(60);
        run_ticks(&mut state, 777);
        let before = state.remaining_seconds();

        state.flip();
        finish_flip(&mut state);
        state.flip();
        finish_flip(&mut state);

        assert!((state.remaining_seconds() - before).abs() < TOLERANCE);
        assert!(!state.is_flipped());
    }

    #[test]
    fn test_flip_while_flipping_is_ignored() {
        let mut state = state_for(60);
        run_ticks(&mut state, 100);
        state.flip();
        run_ticks(&mut state, 10);

        let remaining = state.remaining_seconds();
        let angle = state.rotation_angle();
        assert!(!state.flip());
        assert_eq!(state.remaining_seconds(), remaining);
        assert_eq!(state.rotation_angle(), angle);
        assert!(state.is_flipped());

        finish_flip(&mut state);
        assert_eq!(state.rotation_angle(), 180.0);
    }

    #[test]
    fn test_rotation_accumulates_per_flip() {
        let mut state = state_for(60);
        for n in 1..=4 {
            state.flip();
            finish_flip(&mut state);
            assert_eq!(state.rotation_angle(), 180.0 * n as f32);
        }
        assert_eq!(state.rotation_angle(), 720.0);
        assert_eq!(state.rotation_angle() % 360.0, 0.0);
    }

    #[test]
    fn test_rotation_increases_during_flip() {
        let mut state = state_for(60);
        state.flip();
        let mut last = state.rotation_angle();
        while state.is_animating() {
            state.tick();
            assert!(state.rotation_angle() >= last);
            last = state.rotation_angle();
        }
        assert_eq!(last, 180.0);
    }

    #[test]
    fn test_flip_empty_glass_refills_top() {
        let mut state = state_for(5);
        run_ticks(&mut state, 300);
        assert_eq!(state.phase(), Phase::Empty);

        state.flip();
        finish_flip(&mut state);
        assert_eq!(state.phase(), Phase::Draining);
        assert_eq!(state.remaining_seconds(), 5.0);
    }

    #[test]
    fn test_flip_full_glass_lands_empty() {
        let mut state = state_for(60);
        state.flip();
        finish_flip(&mut state);
        assert_eq!(state.phase(), Phase::Empty);
        assert_eq!(state.remaining_seconds(), 0.0);
    }

    #[test]
    fn test_particle_cap() {
        let mut state = state_for(600);
        for _ in 0..500 {
            state.tick();
            assert!(state.particles().len() <= MAX_PARTICLES);
        }
        assert!(!state.particles().is_empty());
    }

    #[test]
    fn test_particles_only_fall() {
        let mut state = state_for(600);
        let mut seen: HashMap<u64, f32> = HashMap::new();
        for _ in 0..300 {
            state.tick();
            for p in state.particles() {
                if let Some(prev) = seen.get(&p.id) {
                    assert!(p.y >= *prev);
                }
                seen.insert(p.id, p.y);
            }
        }
    }

    #[test]
    fn test_particle_spread_and_floor() {
        let mut state = state_for(600);
        let floor = state.extent() as f32 * 0.8;
        for _ in 0..300 {
            state.tick();
            for p in state.particles() {
                assert!((2.0..4.0).contains(&p.speed));
                assert!((0.5..1.5).contains(&p.size));
                assert!(p.y <= floor);
                assert_eq!(p.x, state.extent() as f32 / 2.0);
            }
        }
    }

    #[test]
    fn test_no_particles_once_empty() {
        let mut state = state_for(5);
        run_ticks(&mut state, 250);
        assert_eq!(state.phase(), Phase::Empty);
        run_ticks(&mut state, 100);
        assert!(state.particles().is_empty());
    }

    #[test]
    fn test_apply_settings_clamps_size() {
        let mut state = state_for(60);
        for (requested, expected) in [(500, 128), (1, 32), (77, 77)] {
            state.apply_settings(&Settings {
                size: requested,
                ..Settings::default()
            });
            assert_eq!(state.glass_size(), expected);
        }
    }

    #[test]
    fn test_apply_settings_keeps_progress() {
        let mut state = state_for(60);
        run_ticks(&mut state, 500);
        state.flip();
        finish_flip(&mut state);
        let remaining = state.remaining_seconds();

        state.apply_settings(&Settings {
            duration: 120,
            ..Settings::default()
        });
        assert_eq!(state.total_seconds(), 120.0);
        assert_eq!(state.remaining_seconds(), remaining);
        assert!(state.is_flipped());
        assert_eq!(state.rotation_angle(), 180.0);
    }

    #[test]
    fn test_apply_shorter_duration_caps_remaining() {
        let mut state = state_for(60);
        state.apply_settings(&Settings {
            duration: 10,
            ..Settings::default()
        });
        assert_eq!(state.remaining_seconds(), 10.0);
        assert_eq!(state.ratio(), 1.0);
    }

    #[test]
    fn test_apply_settings_during_flip_keeps_animation() {
        let mut state = state_for(60);
        state.flip();
        state.tick();
        state.apply_settings(&Settings {
            size: 100,
            ..Settings::default()
        });
        assert!(state.is_animating());
    }

    #[test]
    fn test_refill() {
        let mut state = state_for(60);
        run_ticks(&mut state, 800);
        state.flip();
        state.tick();

        state.refill();
        assert_eq!(state.remaining_seconds(), 60.0);
        assert!(!state.is_flipped());
        assert_eq!(state.rotation_angle(), 0.0);
        assert!(state.particles().is_empty());
        assert_eq!(state.phase(), Phase::Draining);
    }

    #[test]
    fn test_ratio_guards_zero_total() {
        let mut state = state_for(60);
        state.total = 0.0;
        state.remaining = 0.0;
        assert_eq!(state.ratio(), 0.0);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let mut state = state_for(60);
        state.remaining = 90.0;
        assert_eq!(state.ratio(), 1.0);
        state.remaining = -1.0;
        assert_eq!(state.ratio(), 0.0);
    }
}
