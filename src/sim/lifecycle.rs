//! Per-tick brick state machine
//!
//! Normal bricks fall to the danger line, back up while charging, then rush
//! the bottom edge. A boss drops to its resting row and cycles its armor:
//! immune while companions live, then counting toward a telegraphed
//! re-summon once they are gone.

use glam::Vec2;

use super::collision::ArenaBounds;
use super::state::{Brick, BrickState};
use crate::Tuning;

/// Knockback drift damping per tick
const DRIFT_DAMPING: f32 = 0.9;

/// World values a brick needs to advance one tick
#[derive(Debug, Clone, Copy)]
pub struct LifecycleEnv<'a> {
    pub dt: f32,
    pub fall_speed: f32,
    pub danger_line_y: f32,
    pub bounds: ArenaBounds,
    pub tuning: &'a Tuning,
}

impl<'a> LifecycleEnv<'a> {
    pub fn new(dt: f32, level: u32, bounds: ArenaBounds, tuning: &'a Tuning) -> Self {
        Self {
            dt,
            fall_speed: tuning.fall_speed_at(level),
            danger_line_y: bounds.height * tuning.danger_line,
            bounds,
            tuning,
        }
    }
}

/// Outcome of a brick's tick that the orchestrator must act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrickSignal {
    /// Health ran out; the brick is now marked for removal
    Died,
    /// A rusher crossed the bottom edge
    DamagePlayer(f32),
    /// A boss-summoned rusher crossed the bottom edge
    GameOver,
    /// Boss wants a fresh armor batch now
    Summon,
    /// Boss started its pre-summon warning
    Telegraph,
    /// Decoy reached the danger line and vanished
    QuietExit,
}

impl Brick {
    /// Advance one tick. Removed bricks are skipped entirely.
    pub fn advance(&mut self, env: &LifecycleEnv<'_>) -> Option<BrickSignal> {
        if !self.is_live() {
            return None;
        }
        if self.is_dead() {
            self.marked_for_removal = true;
            return Some(BrickSignal::Died);
        }
        if self.pending_offset != Vec2::ZERO {
            self.rect.x += self.pending_offset.x;
            self.rect.y += self.pending_offset.y;
            self.pending_offset = Vec2::ZERO;
        }

        self.hit_flash = self.hit_flash.saturating_sub(1);
        if self.status.is_immobilized() {
            return None;
        }
        self.drift(env);

        let speed_factor = self.status.speed_factor();
        let tuning = env.tuning;
        match self.state {
            BrickState::Normal => {
                self.rect.y += env.fall_speed * speed_factor * env.dt;
                if self.rect.bottom() >= env.danger_line_y {
                    if self.ghost {
                        self.marked_for_removal = true;
                        return Some(BrickSignal::QuietExit);
                    }
                    self.state = BrickState::Charging {
                        remaining: tuning.charge_ticks,
                    };
                    log::debug!("Brick {} charging", self.id);
                }
            }
            BrickState::Charging { remaining } => {
                self.rect.y -= tuning.charge_rise_speed * speed_factor * env.dt;
                let remaining = remaining.saturating_sub(1);
                self.state = if remaining == 0 {
                    log::debug!("Brick {} rushing", self.id);
                    BrickState::Rushing {
                        speed: env.fall_speed,
                    }
                } else {
                    BrickState::Charging { remaining }
                };
            }
            BrickState::Rushing { speed } => {
                let speed = speed + tuning.rush_acceleration * env.dt;
                self.rect.y += speed * speed_factor * env.dt;
                self.state = BrickState::Rushing { speed };
                if self.rect.y > env.bounds.height {
                    self.marked_for_removal = true;
                    return Some(if self.summoner.is_some() {
                        BrickSignal::GameOver
                    } else {
                        BrickSignal::DamagePlayer(tuning.rush_damage)
                    });
                }
            }
            BrickState::Dropping => {
                self.rect.y += tuning.boss_drop_speed * env.dt;
                if self.rect.y >= tuning.boss_rest_y {
                    self.rect.y = tuning.boss_rest_y;
                    self.state = BrickState::Active;
                    log::info!("Boss {} active", self.id);
                    // First activation always summons
                    return Some(BrickSignal::Summon);
                }
            }
            BrickState::Active => return self.advance_boss(tuning),
        }
        None
    }

    fn advance_boss(&mut self, tuning: &Tuning) -> Option<BrickSignal> {
        let boss = self.boss.as_mut()?;
        if let Some(remaining) = boss.telegraph {
            if remaining <= 1 {
                boss.telegraph = None;
                return Some(BrickSignal::Summon);
            }
            boss.telegraph = Some(remaining - 1);
            return None;
        }
        if !boss.armor.is_empty() {
            return None;
        }
        boss.summon_cooldown += 1;
        if boss.summon_cooldown < tuning.summon_threshold {
            return None;
        }
        boss.summon_cooldown = 0;
        if tuning.telegraph_ticks == 0 {
            return Some(BrickSignal::Summon);
        }
        boss.telegraph = Some(tuning.telegraph_ticks);
        Some(BrickSignal::Telegraph)
    }

    /// Apply and damp knockback drift, keeping the brick inside the columns
    fn drift(&mut self, env: &LifecycleEnv<'_>) {
        if self.vel == Vec2::ZERO {
            return;
        }
        self.rect.x += self.vel.x * env.dt;
        self.rect.y += self.vel.y * env.dt;
        self.rect.x = self
            .rect
            .x
            .clamp(env.bounds.left, (env.bounds.right - self.rect.w).max(env.bounds.left));
        self.vel *= DRIFT_DAMPING;
        if self.vel.length_squared() < 1e-4 {
            self.vel = Vec2::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::collision::Rect;
    use crate::sim::state::BossState;
    use crate::sim::status::StatusKind;

    fn env(tuning: &Tuning) -> LifecycleEnv<'_> {
        let bounds = ArenaBounds::from_canvas(800.0, 600.0, tuning);
        LifecycleEnv::new(SIM_DT, 1, bounds, tuning)
    }

    fn brick_at(y: f32) -> Brick {
        Brick::new(1, Rect::new(200.0, y, 70.0, 30.0), 50.0, "hsl(270, 40%, 50%)")
    }

    #[test]
    fn test_normal_falls_then_charges_at_danger_line() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(0.0);
        brick.advance(&env);
        assert!((brick.rect.y - tuning.fall_speed * SIM_DT).abs() < 1e-5);
        assert_eq!(brick.state, BrickState::Normal);

        brick.rect.y = env.danger_line_y - brick.rect.h;
        brick.advance(&env);
        assert_eq!(
            brick.state,
            BrickState::Charging {
                remaining: tuning.charge_ticks
            }
        );
    }

    #[test]
    fn test_queued_offset_applies_once() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(0.0);
        brick.pending_offset = Vec2::new(6.0, -3.0);
        brick.advance(&env);
        assert_eq!(brick.rect.x, 206.0);
        assert!((brick.rect.y - (-3.0 + tuning.fall_speed * SIM_DT)).abs() < 1e-5);
        assert_eq!(brick.pending_offset, Vec2::ZERO);

        brick.advance(&env);
        assert_eq!(brick.rect.x, 206.0);
    }

    #[test]
    fn test_charging_rises_then_rushes() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(400.0);
        brick.state = BrickState::Charging { remaining: 2 };
        brick.advance(&env);
        assert!(brick.rect.y < 400.0);
        assert_eq!(brick.state, BrickState::Charging { remaining: 1 });
        brick.advance(&env);
        assert!(matches!(brick.state, BrickState::Rushing { .. }));
    }

    #[test]
    fn test_rusher_damages_player_past_bottom() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(598.0);
        brick.state = BrickState::Rushing { speed: 300.0 };
        assert_eq!(
            brick.advance(&env),
            Some(BrickSignal::DamagePlayer(tuning.rush_damage))
        );
        assert!(brick.marked_for_removal);
        assert_eq!(brick.advance(&env), None);
    }

    #[test]
    fn test_summoned_rusher_ends_the_run() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(598.0);
        brick.summoner = Some(9);
        brick.state = BrickState::Rushing { speed: 300.0 };
        assert_eq!(brick.advance(&env), Some(BrickSignal::GameOver));
    }

    #[test]
    fn test_dead_brick_short_circuits() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(100.0);
        brick.health = 0.0;
        assert_eq!(brick.advance(&env), Some(BrickSignal::Died));
        assert_eq!(brick.rect.y, 100.0);
    }

    #[test]
    fn test_frozen_brick_holds_position() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(100.0);
        brick.apply_status(StatusKind::Freeze, 10, 0.0);
        brick.advance(&env);
        assert_eq!(brick.rect.y, 100.0);
    }

    #[test]
    fn test_ghost_exits_quietly() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(env.danger_line_y - 30.0);
        brick.ghost = true;
        assert_eq!(brick.advance(&env), Some(BrickSignal::QuietExit));
        assert!(brick.marked_for_removal);
    }

    #[test]
    fn test_boss_summons_on_arrival_then_cycles() {
        let tuning = Tuning {
            summon_threshold: 3,
            telegraph_ticks: 2,
            ..Tuning::default()
        };
        let env = env(&tuning);
        let mut boss = Brick::boss(1, Rect::new(200.0, tuning.boss_rest_y - 0.5, 226.0, 60.0), 900.0);
        assert_eq!(boss.advance(&env), Some(BrickSignal::Summon));
        assert_eq!(boss.state, BrickState::Active);
        assert_eq!(boss.rect.y, tuning.boss_rest_y);

        // Armored: nothing accumulates
        boss.boss = Some(BossState {
            armor: vec![5],
            ..BossState::default()
        });
        for _ in 0..10 {
            assert_eq!(boss.advance(&env), None);
        }

        // Armor gone: count to the threshold, telegraph, then summon
        boss.boss.as_mut().unwrap().armor.clear();
        assert_eq!(boss.advance(&env), None);
        assert_eq!(boss.advance(&env), None);
        assert_eq!(boss.advance(&env), Some(BrickSignal::Telegraph));
        assert_eq!(boss.advance(&env), None);
        assert_eq!(boss.advance(&env), Some(BrickSignal::Summon));
    }

    #[test]
    fn test_knockback_drift_is_damped_and_clamped() {
        let tuning = Tuning::default();
        let env = env(&tuning);
        let mut brick = brick_at(100.0);
        brick.rect.x = env.bounds.left + 1.0;
        brick.vel = glam::Vec2::new(-600.0, 0.0);
        brick.advance(&env);
        assert_eq!(brick.rect.x, env.bounds.left);
        assert!((brick.vel.x + 540.0).abs() < 1e-3);
    }
}
