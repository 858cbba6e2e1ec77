//! Brickfall - falling-brick arcade simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (swept collisions, brick lifecycle, effects)
//! - `tuning`: Data-driven game balance
//! - `catalog`: Built-in ball kinds and their abilities
//!
//! Rendering, DOM, audio and persistence live in the host. The core consumes
//! arena bounds and the player position each tick and hands back events.

pub mod catalog;
pub mod sim;
pub mod tuning;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use catalog::{BallKind, Catalog};
pub use tuning::Tuning;

use glam::Vec2;

/// Simulation constants that are not balance knobs
pub mod consts {
    /// Reference tick length. Frame-counted timers (cooldowns, charge) assume this rate.
    pub const SIM_DT: f32 = 1.0 / 60.0;
    pub const TICKS_PER_SECOND: f32 = 60.0;

    /// Axis displacement below this is treated as exactly zero by the sweep test
    pub const SWEEP_EPSILON: f32 = 1e-8;
    /// Contact time reported when only the line fallback registers a hit
    pub const FALLBACK_CONTACT_T: f32 = 1e-4;
}

/// Unit vector pointing along `angle` (radians, screen coordinates: +y is down)
#[inline]
pub fn angle_to_dir(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Heading of a velocity vector in radians
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}
