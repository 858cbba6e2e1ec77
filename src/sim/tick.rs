//! Fixed timestep simulation tick
//!
//! Core game loop that advances the world deterministically. Bricks move
//! first, then every ball resolves its sweep against that stable layout in
//! id order, then the spawner runs and queued effect spawns join the world.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use rand::Rng;

use super::collision::ArenaBounds;
use super::lifecycle::{BrickSignal, LifecycleEnv};
use super::projectile::{StepEnv, step_ball};
use super::spawner::SpawnEnv;
use super::state::{Brick, GameEvent, GamePhase, reap_dead, refresh_boss_armor};
use super::world::World;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Player position reported by the host
    pub owner_pos: Option<Vec2>,
    /// Launch angle in radians; straight up when unset
    pub aim: Option<f32>,
    /// Launch a ball if none is in flight
    pub shoot: bool,
    /// Pause toggle
    pub pause: bool,
    /// Arena bounds after a host resize
    pub bounds: Option<ArenaBounds>,
}

/// Advance the world by one timestep and report what happened
pub fn tick(world: &mut World, input: &TickInput, dt: f32) -> Vec<GameEvent> {
    let mut events = Vec::new();

    // Handle pause toggle
    if input.pause {
        world.phase = match world.phase {
            GamePhase::Playing => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Playing,
            GamePhase::GameOver => GamePhase::GameOver,
        };
        log::info!("Phase is now {:?}", world.phase);
    }

    // Don't tick if paused or game over
    if world.phase != GamePhase::Playing {
        return events;
    }
    if !dt.is_finite() || dt <= 0.0 {
        log::trace!("Skipping tick with dt {dt}");
        return events;
    }
    let dt = dt.min(world.tuning.max_dt);

    if let Some(bounds) = input.bounds {
        world.resize(bounds);
    }
    if let Some(pos) = input.owner_pos {
        world.player.pos = pos;
    }
    world.time_ticks += 1;

    if (input.shoot || world.tuning.auto_shoot) && world.player_balls_in_flight() == 0 {
        let ball = world.launch_ball(input.aim.unwrap_or(-FRAC_PI_2));
        events.push(GameEvent::BallLaunched { ball });
    }

    decay_statuses(&mut world.bricks, dt, &mut events);
    let game_over = advance_bricks(world, dt, &mut events);
    refresh_boss_armor(&mut world.bricks);

    // Balls resolve against the post-transition layout in id order
    world.normalize_order();
    step_balls(world, dt, &mut events);

    {
        let mut env = SpawnEnv {
            dt,
            level: world.progress.level,
            bounds: world.bounds,
            tuning: &world.tuning,
            ids: &mut world.ids,
            rng: &mut world.rng,
            events: &mut events,
        };
        world.spawner.update(&mut world.bricks, &mut env);
    }
    world.apply_spawns();

    apply_consequences(world, &mut events);
    world.remove_marked();

    if game_over || world.player.health <= 0.0 {
        world.phase = GamePhase::GameOver;
        events.push(GameEvent::GameOver);
        log::info!(
            "Game over after {} ticks at level {}",
            world.time_ticks,
            world.progress.level
        );
    }

    events
}

/// Run damage over time and expire status tags
fn decay_statuses(bricks: &mut [Brick], dt: f32, events: &mut Vec<GameEvent>) {
    for brick in bricks.iter_mut() {
        if !brick.is_live() || brick.status.is_empty() {
            continue;
        }
        let outcome = brick.status.decay(dt);
        if outcome.damage > 0.0 {
            brick.take_true_damage(outcome.damage);
        }
        if outcome.max_health_loss > 0.0 {
            brick.max_health = (brick.max_health - outcome.max_health_loss).max(0.0);
            brick.health = brick.health.min(brick.max_health);
        }
    }
    reap_dead(bricks, events);
}

/// Move every brick through its state machine. Returns true when a boss
/// minion broke through.
fn advance_bricks(world: &mut World, dt: f32, events: &mut Vec<GameEvent>) -> bool {
    let env = LifecycleEnv::new(dt, world.progress.level, world.bounds, &world.tuning);
    let mut game_over = false;
    let mut summons = Vec::new();

    for brick in world.bricks.iter_mut() {
        let Some(signal) = brick.advance(&env) else {
            continue;
        };
        match signal {
            BrickSignal::Died => events.push(GameEvent::destroyed(brick)),
            BrickSignal::DamagePlayer(amount) => {
                world.player.health = (world.player.health - amount).max(0.0);
                log::info!("Brick {} broke through for {amount}", brick.id);
                events.push(GameEvent::PlayerDamaged { amount });
            }
            BrickSignal::GameOver => game_over = true,
            BrickSignal::Summon => summons.push(brick.id),
            BrickSignal::Telegraph => events.push(GameEvent::BossTelegraph { brick: brick.id }),
            BrickSignal::QuietExit => log::trace!("Decoy {} vanished", brick.id),
        }
    }

    for boss in summons {
        let mut spawn_env = SpawnEnv {
            dt,
            level: world.progress.level,
            bounds: world.bounds,
            tuning: &world.tuning,
            ids: &mut world.ids,
            rng: &mut world.rng,
            events: &mut *events,
        };
        world.spawner.summon_armor(boss, &mut world.bricks, &mut spawn_env);
    }
    game_over
}

fn step_balls(world: &mut World, dt: f32, events: &mut Vec<GameEvent>) {
    let World {
        balls,
        bricks,
        player,
        tuning,
        registry,
        rng,
        spawns,
        bounds,
        ..
    } = world;

    for ball in balls.iter_mut() {
        let mut env = StepEnv {
            dt,
            bounds: *bounds,
            owner_pos: (ball.owner == player.id).then_some(player.pos),
            tuning: &*tuning,
            registry: &*registry,
            rng: &mut *rng,
            spawns: &mut *spawns,
            events: &mut *events,
        };
        step_ball(ball, bricks, &mut env);
    }
}

/// Kills, loot, XP and healing reported during this tick
fn apply_consequences(world: &mut World, events: &mut Vec<GameEvent>) {
    let mut followups = Vec::new();
    let mut healed = 0.0;

    for event in events.iter() {
        match *event {
            GameEvent::BrickDestroyed {
                pos,
                max_health,
                boss,
                ..
            } => {
                world.progress.kills += 1;
                world.progress.xp += if boss {
                    world.tuning.boss_xp
                } else {
                    (max_health / 10.0).ceil().max(0.0) as u32
                };
                if world.rng.random::<f64>() < world.tuning.loot_chance {
                    followups.push(GameEvent::LootDropped { pos });
                }
                if boss {
                    log::info!("Level {} complete", world.progress.level);
                    followups.push(GameEvent::LevelComplete {
                        level: world.progress.level,
                    });
                }
            }
            GameEvent::OwnerHealed { owner, amount } if owner == world.player.id => {
                healed += amount;
            }
            _ => {}
        }
    }

    if healed > 0.0 {
        world.player.health = (world.player.health + healed).min(world.player.max_health);
    }

    let progress = &mut world.progress;
    loop {
        let needed = world.tuning.xp_to_next(progress.level);
        if needed == 0 || progress.xp < needed {
            break;
        }
        progress.xp -= needed;
        progress.level += 1;
        log::info!("Reached level {}", progress.level);
        followups.push(GameEvent::LevelUp {
            level: progress.level,
        });
    }

    events.extend(followups);
}
