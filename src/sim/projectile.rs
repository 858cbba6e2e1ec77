//! Swept projectile step
//!
//! Each ball consumes its frame displacement in substeps. A substep finds
//! the earliest contact among live bricks, the side and top walls, and the
//! floor, advances to it, and resolves it. Contact damage is gated by the
//! ball's hit cooldown, boss armor and brick locks, in that order.

use glam::Vec2;
use rand_pcg::Pcg32;

use super::collision::{
    ArenaBounds, floor_crossing, reflect_velocity, sweep_with_fallback, wall_contact,
};
use super::effects::{EffectContext, EffectOverrides, EffectRegistry, SpawnQueue};
use super::state::{Ball, Brick, GameEvent, reap_dead};
use super::uniform;
use crate::{Tuning, heading, rotate};

/// Hit flash applied to a brick on a damaging contact
const CONTACT_FLASH: u32 = 6;
/// Share of direct hit damage passed along a tether
const TETHER_SHARE: f32 = 0.25;

/// Shared inputs for every ball stepped this tick
pub struct StepEnv<'a> {
    pub dt: f32,
    pub bounds: ArenaBounds,
    /// Where returning balls head; `None` removes them
    pub owner_pos: Option<Vec2>,
    pub tuning: &'a Tuning,
    pub registry: &'a EffectRegistry,
    pub rng: &'a mut Pcg32,
    pub spawns: &'a mut SpawnQueue,
    pub events: &'a mut Vec<GameEvent>,
}

impl StepEnv<'_> {
    fn run_effects(
        &mut self,
        bricks: &mut [Brick],
        overrides: EffectOverrides,
        f: impl FnOnce(&EffectRegistry, &mut EffectContext<'_>),
    ) {
        let registry = self.registry;
        let mut ctx = EffectContext {
            bricks,
            spawns: &mut *self.spawns,
            rng: &mut *self.rng,
            events: &mut *self.events,
            overrides,
        };
        f(registry, &mut ctx);
    }
}

/// The earliest thing a substep runs into
#[derive(Debug, Clone, Copy)]
struct Contact {
    t: f32,
    normal: Vec2,
    /// Index of the struck brick, `None` for walls
    brick: Option<usize>,
}

/// Advance one ball through a full tick
pub fn step_ball(ball: &mut Ball, bricks: &mut [Brick], env: &mut StepEnv<'_>) {
    if ball.marked_for_removal {
        return;
    }
    ball.hit_cooldown = ball.hit_cooldown.saturating_sub(1);

    if !ball.effects.is_empty() {
        let names = ball.effects.clone();
        let dt = env.dt;
        env.run_effects(bricks, ball.overrides, |registry, ctx| {
            registry.apply_on_update(&names, ball, dt, ctx);
        });
        reap_dead(bricks, env.events);
        if ball.marked_for_removal {
            return;
        }
    }

    if ball.returning {
        step_returning(ball, env);
        return;
    }

    let tuning = env.tuning;
    let mut remaining = 1.0_f32;
    let mut substeps = 0;
    while remaining > tuning.min_remaining {
        if substeps == tuning.max_substeps {
            log::trace!("Ball {} hit the substep limit with {remaining} left", ball.id);
            break;
        }
        substeps += 1;

        let disp = ball.vel * env.dt * remaining;
        release_passing(ball, bricks, tuning.separation);

        let mut earliest = earliest_brick(ball, bricks, disp);
        if let Some(wall) = wall_contact(ball.pos, disp, ball.radius, &env.bounds)
            && earliest.is_none_or(|c| wall.t < c.t)
        {
            earliest = Some(Contact {
                t: wall.t,
                normal: wall.normal,
                brick: None,
            });
        }

        if let Some(t) = floor_crossing(ball.pos, disp, ball.radius, env.bounds.height)
            && earliest.is_none_or(|c| t < c.t)
        {
            ball.pos += disp * t;
            ball.vel.y = -ball.vel.y.abs() * tuning.floor_bounce_factor;
            ball.angle = heading(ball.vel);
            ball.returning = true;
            ball.passing = None;
            log::debug!("Ball {} reached the floor, returning", ball.id);
            return;
        }

        let Some(contact) = earliest else {
            ball.pos += disp;
            break;
        };

        ball.pos += disp * contact.t;
        remaining -= (contact.t * remaining).max(tuning.min_progress);
        resolve_contact(ball, bricks, contact, env);
        if ball.marked_for_removal {
            return;
        }
    }

    cull_escaped(ball, &env.bounds);
}

/// Fly straight back to the owner at the return speed
fn step_returning(ball: &mut Ball, env: &StepEnv<'_>) {
    let Some(owner) = env.owner_pos else {
        ball.marked_for_removal = true;
        return;
    };
    let tuning = env.tuning;
    let offset = owner - ball.pos;
    let distance = offset.length();
    if distance <= tuning.capture_radius {
        ball.marked_for_removal = true;
        return;
    }

    let dir = offset / distance;
    let step = (tuning.return_speed * env.dt).min(distance);
    ball.pos += dir * step;
    ball.vel = dir * tuning.return_speed;
    ball.angle = heading(ball.vel);
    if distance - step <= tuning.capture_radius {
        ball.marked_for_removal = true;
    }
}

/// Stop ignoring a pierced brick once the ball has left it
fn release_passing(ball: &mut Ball, bricks: &[Brick], margin: f32) {
    let Some(id) = ball.passing else {
        return;
    };
    let margin = margin.max(1e-3);
    let still_inside = bricks.iter().any(|b| {
        b.id == id && b.is_live() && b.rect.expand(margin).overlaps_circle(ball.pos, ball.radius)
    });
    if !still_inside {
        ball.passing = None;
    }
}

fn earliest_brick(ball: &Ball, bricks: &[Brick], disp: Vec2) -> Option<Contact> {
    let mut earliest: Option<Contact> = None;
    for (i, brick) in bricks.iter().enumerate() {
        if !brick.is_live() || ball.passing == Some(brick.id) {
            continue;
        }
        if let Some(hit) = sweep_with_fallback(ball.pos, disp, ball.radius, &brick.rect)
            && earliest.is_none_or(|c| hit.t < c.t)
        {
            earliest = Some(Contact {
                t: hit.t,
                normal: hit.normal,
                brick: Some(i),
            });
        }
    }
    earliest
}

fn resolve_contact(ball: &mut Ball, bricks: &mut [Brick], contact: Contact, env: &mut StepEnv<'_>) {
    let incoming = ball.vel;
    ball.impact_vel = incoming;
    if ball.vel.dot(contact.normal) < 0.0 {
        ball.vel = reflect_velocity(ball.vel, contact.normal);
    }

    ball.pass_through = false;
    if let Some(index) = contact.brick {
        hit_brick(ball, bricks, index, env);
        if ball.marked_for_removal {
            return;
        }
        if ball.pass_through {
            ball.pass_through = false;
            ball.vel = incoming;
            ball.passing = Some(bricks[index].id);
            return;
        }
    }

    let jitter = env.tuning.bounce_jitter;
    ball.vel = rotate(ball.vel, uniform(env.rng, -jitter, jitter));
    ball.renormalize(contact.normal);
    ball.pos += contact.normal * env.tuning.separation;

    if !ball.effects.is_empty() {
        let names = ball.effects.clone();
        env.run_effects(bricks, ball.overrides, |registry, ctx| {
            registry.apply_on_bounce(&names, ball, contact.normal, ctx);
        });
        reap_dead(bricks, env.events);
    }
}

/// Apply one contact's gameplay to the struck brick
fn hit_brick(ball: &mut Ball, bricks: &mut [Brick], index: usize, env: &mut StepEnv<'_>) {
    if ball.hit_cooldown > 0 {
        return;
    }
    ball.hit_cooldown = env.tuning.hit_cooldown_ticks;

    let brick = &mut bricks[index];
    if brick.is_immune() {
        log::debug!("Boss {} absorbed ball {}", brick.id, ball.id);
        env.events.push(GameEvent::ContactAbsorbed {
            brick: brick.id,
            ball: ball.id,
        });
        return;
    }
    if let Some(lock) = brick.lock.as_mut()
        && !lock.unlocked
    {
        if lock.opens_for(ball) {
            lock.unlocked = true;
            log::debug!("Brick {} unlocked by ball {}", brick.id, ball.id);
            env.events.push(GameEvent::BrickUnlocked {
                brick: brick.id,
                ball: ball.id,
            });
        }
        return;
    }

    let damage = brick.take_damage(ball.base_damage());
    brick.flash(CONTACT_FLASH);
    let brick_id = brick.id;
    let tether = brick.tether;
    env.events.push(GameEvent::BrickHit {
        brick: brick_id,
        ball: ball.id,
        damage,
    });
    log::debug!("Ball {} hit brick {} for {damage}", ball.id, brick_id);

    if let Some(partner_id) = tether
        && let Some(partner) = bricks.iter_mut().find(|b| b.id == partner_id && b.is_live())
    {
        partner.take_damage(damage * TETHER_SHARE);
    }

    if !ball.effects.is_empty() {
        let names = ball.effects.clone();
        env.run_effects(bricks, ball.overrides, |registry, ctx| {
            registry.apply_on_hit(&names, ball, index, ctx);
        });
    }
    reap_dead(bricks, env.events);
}

/// Safety net: drop a ball that ended up entirely outside the arena
fn cull_escaped(ball: &mut Ball, bounds: &ArenaBounds) {
    let r = ball.radius;
    let p = ball.pos;
    if p.x < bounds.left - r || p.x > bounds.right + r || p.y < -r || p.y > bounds.height + r {
        log::debug!("Ball {} escaped the arena at {p}", ball.id);
        ball.marked_for_removal = true;
    }
}
