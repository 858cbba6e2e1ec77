//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod abilities;
pub mod collision;
pub mod effects;
pub mod lifecycle;
pub mod projectile;
pub mod spawner;
pub mod state;
pub mod status;
pub mod tick;
pub mod world;

pub use abilities::EffectKind;
pub use collision::{
    ArenaBounds, Rect, SweepHit, line_intersects_rect, reflect_velocity, sweep_circle_vs_rect,
};
pub use effects::{Effect, EffectContext, EffectOverrides, EffectRegistry, SpawnQueue};
pub use lifecycle::{BrickSignal, LifecycleEnv};
pub use projectile::{StepEnv, step_ball};
pub use spawner::Spawner;
pub use state::{
    Ball, BallStats, BossState, Brick, BrickState, EntityId, GameEvent, GamePhase, Lock, OwnerId,
};
pub use status::{StatusEffects, StatusKind};
pub use tick::{TickInput, tick};
pub use world::World;

use rand::Rng;

/// Uniform sample in `[lo, hi)`, or `lo` when the range is empty
pub(crate) fn uniform(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi <= lo { lo } else { rng.random_range(lo..hi) }
}
