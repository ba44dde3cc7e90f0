//! Point-mass integration
//!
//! Two kinds of bodies exist:
//! - `GravityBody`: the bird. Displacement follows d = v*t + 0.5*a*t^2 where t
//!   counts ticks since the last impulse, clamped to terminal velocity.
//! - `LinearBody`: balls, pipes and the floor. Constant velocity per tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Gravity-driven body with impulse-based control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravityBody {
    pub pos: Vec2,
    /// Vertical velocity at the start of the current epoch
    pub vel: f32,
    /// Ticks since the last impulse
    pub tick_count: u32,
    /// Height at the last impulse (drives tilt)
    pub launch_height: f32,
    /// Tilt in degrees, cosmetic only
    pub tilt: f32,
}

impl GravityBody {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: 0.0,
            tick_count: 0,
            launch_height: pos.y,
            tilt: 0.0,
        }
    }

    /// Start a new integration epoch with upward velocity
    pub fn impulse(&mut self) {
        self.vel = IMPULSE_VELOCITY;
        self.tick_count = 0;
        self.launch_height = self.pos.y;
    }

    /// Advance one tick and return the applied displacement
    pub fn step(&mut self) -> f32 {
        self.tick_count += 1;
        let displacement = displacement(self.vel, self.tick_count);
        self.pos.y += displacement;
        self.update_tilt(displacement);
        displacement
    }

    /// Advance `dt_ticks` ticks and return the net displacement
    pub fn integrate(&mut self, dt_ticks: u32) -> f32 {
        (0..dt_ticks).map(|_| self.step()).sum()
    }

    fn update_tilt(&mut self, displacement: f32) {
        if displacement < 0.0 || self.pos.y < self.launch_height + 50.0 {
            self.tilt = self.tilt.max(MAX_ROTATION);
        } else if self.tilt > MIN_ROTATION {
            self.tilt = (self.tilt - ROTATION_VELOCITY).max(MIN_ROTATION);
        }
    }
}

/// Displacement for tick `t` of an epoch that started with velocity `vel`
///
/// Rising displacement gets an extra `RISE_BIAS` kick. The result is always
/// within [-TERMINAL_VELOCITY, TERMINAL_VELOCITY].
#[inline]
pub fn displacement(vel: f32, t: u32) -> f32 {
    let t = t as f32;
    let raw = vel * t + 0.5 * GRAVITY * t * t;
    let mut d = raw.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY);
    if d < 0.0 {
        d = (d - RISE_BIAS).max(-TERMINAL_VELOCITY);
    }
    d
}

/// Constant-velocity body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearBody {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl LinearBody {
    pub fn new(pos: Vec2, vel: Vec2) -> Self {
        Self { pos, vel }
    }

    #[inline]
    pub fn step(&mut self) {
        self.pos += self.vel;
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}
