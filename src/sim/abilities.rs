//! Built-in effect kinds
//!
//! Forces and speeds from the frame-based tables are converted to px/s
//! (x60). Distances between bricks are centre to centre.

use std::f32::consts::{PI, TAU};

use anyhow::Context;
use glam::Vec2;
use rand::Rng;

use super::collision::Rect;
use super::effects::{BrickSpawn, Effect, EffectContext, ProjectileSpawn};
use super::state::{Ball, GameEvent, Orbit};
use super::status::StatusKind;
use crate::{angle_to_dir, heading};

/// Frames per second the legacy force values were tuned at
const FRAME_RATE: f32 = 60.0;
/// Speed cap for Momentum and HyperBounce
const MAX_BALL_SPEED: f32 = 1200.0;

macro_rules! effect_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every built-in effect, keyed by its catalogue name
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EffectKind {
            $($variant),*
        }

        impl EffectKind {
            pub const ALL: &'static [EffectKind] = &[$(EffectKind::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(EffectKind::$variant => $name),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(EffectKind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

effect_kinds! {
    Damage => "Damage",
    Burn => "Burn",
    Freeze => "Freeze",
    Shock => "Shock",
    Poison => "Poison",
    Slow => "Slow",
    Heal => "Heal",
    Knockback => "Knockback",
    Pierce => "Pierce",
    AreaOfEffect => "areaOfEffect",
    Collision => "Collision",
    Duration => "Duration",
    CritChance => "CritChance",
    CritMultiplier => "CritMultiplier",
    Chain => "Chain",
    Ricochet => "Ricochet",
    Split => "Split",
    Shield => "Shield",
    ArmorBreak => "ArmorBreak",
    Stun => "Stun",
    Confuse => "Confuse",
    Weaken => "Weaken",
    Corrupt => "Corrupt",
    Gravity => "Gravity",
    Magnetize => "Magnetize",
    Reflect => "Reflect",
    ReboundBoost => "ReboundBoost",
    ImpactForce => "ImpactForce",
    Frag => "Frag",
    Shatter => "Shatter",
    Bleed => "Bleed",
    Irradiate => "Irradiate",
    Echo => "Echo",
    Overload => "Overload",
    Charge => "Charge",
    Impulse => "Impulse",
    Windburst => "Windburst",
    Quake => "Quake",
    Barrier => "Barrier",
    Focus => "Focus",
    Momentum => "Momentum",
    Amplify => "Amplify",
    Scatter => "Scatter",
    Orbit => "Orbit",
    Clone => "Clone",
    Spore => "Spore",
    Frenzy => "Frenzy",
    StaticField => "StaticField",
    Entropy => "Entropy",
    Gloom => "Gloom",
    Rend => "Rend",
    Pulse => "Pulse",
    Flare => "Flare",
    Nova => "Nova",
    Cascade => "Cascade",
    Tether => "Tether",
    Mirage => "Mirage",
    Spectral => "Spectral",
    Blight => "Blight",
    Flicker => "Flicker",
    ChainPull => "ChainPull",
    Detonate => "Detonate",
    Breach => "Breach",
    Volley => "Volley",
    Burst => "Burst",
    Frostbite => "Frostbite",
    Incinerate => "Incinerate",
    ToxinCloud => "ToxinCloud",
    HyperBounce => "HyperBounce",
    Crush => "Crush",
    Disrupt => "Disrupt",
    Drain => "Drain",
    EchoHit => "EchoHit",
}

impl EffectKind {
    pub fn spawns_projectiles(self) -> bool {
        matches!(
            self,
            EffectKind::Split | EffectKind::Scatter | EffectKind::Volley | EffectKind::Clone
        )
    }
}

/// Damage every live brick within `range` of `center`
fn damage_area(
    ctx: &mut EffectContext<'_>,
    center: Vec2,
    range: f32,
    exclude: Option<usize>,
    amount: f32,
    flash: u32,
) -> anyhow::Result<()> {
    for i in ctx.bricks_near(center, range, exclude) {
        ctx.damage(i, amount, flash)?;
    }
    Ok(())
}

/// Push live bricks within `range` along the offset from `center`.
/// A negative `force` pulls them in.
fn push_area(ctx: &mut EffectContext<'_>, center: Vec2, range: f32, exclude: Option<usize>, force: f32) {
    for i in ctx.bricks_near(center, range, exclude) {
        let brick = &mut ctx.bricks[i];
        if let Some(dir) = (brick.center() - center).try_normalize() {
            brick.vel += dir * force;
        }
    }
}

fn spread(rng: &mut impl Rng, width: f32) -> f32 {
    (rng.random::<f32>() - 0.5) * width
}

impl EffectKind {
    fn hit(self, ball: &mut Ball, target: usize, ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        let o = ctx.overrides;
        let base = o.damage.unwrap_or_else(|| ball.base_damage());
        let center = ctx.target(target)?.center();

        match self {
            EffectKind::Damage => {
                ctx.damage(target, base, 6)?;
            }
            EffectKind::Burn => {
                ctx.damage(target, (base * 0.5).round(), 8)?;
                ctx.target(target)?
                    .apply_status(StatusKind::Burn, o.ticks(120), o.dps.unwrap_or(2.0));
            }
            EffectKind::Freeze => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Freeze, o.ticks(60), 0.0);
                brick.flash(6);
            }
            EffectKind::Shock => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Shock, o.ticks(30), 0.0);
                damage_area(
                    ctx,
                    center,
                    o.range.unwrap_or(120.0),
                    Some(target),
                    o.splash.unwrap_or(6.0),
                    6,
                )?;
            }
            EffectKind::Poison => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Poison, o.ticks(90), o.dps.unwrap_or(1.0));
                brick.flash(6);
            }
            EffectKind::Slow => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Slow, o.ticks(60), o.factor.unwrap_or(0.5));
                brick.flash(6);
            }
            EffectKind::Heal => {
                let brick = ctx.target(target)?;
                brick.heal(o.amount.unwrap_or(10.0));
                brick.flash(4);
            }
            EffectKind::Knockback => {
                let brick = ctx.target(target)?;
                brick.vel += ball.impact_vel * o.force.unwrap_or(0.25);
                brick.flash(6);
            }
            EffectKind::Pierce => {
                if ball.pierces_left > 0 {
                    ball.pierces_left -= 1;
                    ball.pass_through = true;
                }
            }
            EffectKind::AreaOfEffect => {
                damage_area(ctx, center, o.radius.unwrap_or(80.0), None, base, 6)?;
            }
            EffectKind::Collision => {
                let brick = ctx.target(target)?;
                brick.vel += ball.impact_vel * 0.1;
                brick.flash(6);
            }
            EffectKind::Duration | EffectKind::CritMultiplier => {}
            EffectKind::CritChance => {
                let chance = o.chance.unwrap_or(ball.stats.crit_chance);
                if ctx.rng.random::<f32>() < chance {
                    let mult = o.mult.unwrap_or(ball.stats.crit_multiplier);
                    ctx.target(target)?.take_damage(base * (mult - 1.0));
                }
            }
            EffectKind::Chain => {
                let range = o.range.unwrap_or(120.0);
                let amount = o.damage.unwrap_or_else(|| (ball.base_damage() * 0.6).round());
                let links = o.count_or(2);
                for i in ctx.bricks_near(center, range, Some(target)).into_iter().take(links) {
                    ctx.damage(i, amount, 6)?;
                }
            }
            EffectKind::Ricochet => {
                if let Some((i, _)) = ctx.nearest(ball.pos, &[target])
                    && let Some(dir) = (ctx.bricks[i].center() - ball.pos).try_normalize()
                {
                    ball.vel = dir * ball.speed;
                }
            }
            EffectKind::Split => {
                for _ in 0..o.count_or(2) {
                    let angle = ctx.rng.random::<f32>() * TAU;
                    ctx.spawns.spawn_projectile(ProjectileSpawn::child_of(ball, angle));
                }
                ball.marked_for_removal = true;
            }
            EffectKind::Shield => {
                let brick = ctx.target(target)?;
                brick.shield = (brick.shield - o.amount.unwrap_or(5.0)).max(0.0);
                brick.flash(6);
            }
            EffectKind::ArmorBreak | EffectKind::Rend => {
                let brick = ctx.target(target)?;
                brick.armor = (brick.armor - o.amount.unwrap_or(2.0)).max(0.0);
                brick.flash(8);
            }
            EffectKind::Stun => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Stun, o.ticks(40), 0.0);
                brick.flash(8);
            }
            EffectKind::Confuse => {
                ctx.target(target)?
                    .apply_status(StatusKind::Confuse, o.ticks(80), 0.0);
            }
            EffectKind::Weaken => {
                ctx.target(target)?
                    .apply_status(StatusKind::Weaken, o.ticks(90), o.factor.unwrap_or(1.3));
            }
            EffectKind::Corrupt => {
                ctx.target(target)?
                    .apply_status(StatusKind::Corrupt, o.ticks(150), o.amount.unwrap_or(6.0));
            }
            EffectKind::Gravity => {
                let force = o.force.unwrap_or(0.4) * FRAME_RATE;
                push_area(ctx, center, o.range.unwrap_or(250.0), Some(target), -force);
            }
            EffectKind::Magnetize => {
                if let Some(dir) = (center - ball.pos).try_normalize() {
                    ball.vel += dir * o.strength.unwrap_or(0.2) * FRAME_RATE;
                }
            }
            EffectKind::Reflect => {
                ball.vel *= o.mult.unwrap_or(-1.2);
            }
            EffectKind::ReboundBoost => {
                let strength = o.strength.unwrap_or(2.0) * FRAME_RATE;
                let jolt = Vec2::new(spread(ctx.rng, strength), spread(ctx.rng, strength));
                ball.vel += jolt;
            }
            EffectKind::ImpactForce => {
                ctx.target(target)?.vel += ball.impact_vel * o.force.unwrap_or(0.5);
            }
            EffectKind::Impulse => {
                ctx.target(target)?.vel += ball.impact_vel * 0.2;
            }
            EffectKind::Frag => {
                let source = ctx.target(target)?.clone();
                let size = Vec2::new(
                    (source.rect.w * 0.4).max(8.0),
                    (source.rect.h * 0.4).max(8.0),
                );
                let health = (source.health * 0.25).round().max(1.0);
                for _ in 0..o.count_or(3) {
                    let x = source.rect.x + ctx.rng.random::<f32>() * source.rect.w - source.rect.w / 2.0;
                    let y = source.rect.y + ctx.rng.random::<f32>() * source.rect.h - source.rect.h / 2.0;
                    ctx.spawns.spawn_brick(BrickSpawn {
                        rect: Rect::new(x, y, size.x, size.y),
                        health,
                        color: source.color.clone(),
                        ghost: false,
                    });
                }
            }
            EffectKind::Spore => {
                let source = ctx.target(target)?.clone();
                let size = Vec2::new(
                    (source.rect.w * 0.4).max(6.0),
                    (source.rect.h * 0.4).max(6.0),
                );
                let health = (source.health * 0.3).round().max(1.0);
                for _ in 0..o.count_or(3) {
                    let x = source.rect.x + spread(ctx.rng, 20.0);
                    let y = source.rect.y + spread(ctx.rng, 20.0);
                    ctx.spawns.spawn_brick(BrickSpawn {
                        rect: Rect::new(x, y, size.x, size.y),
                        health,
                        color: source.color.clone(),
                        ghost: false,
                    });
                }
            }
            EffectKind::Mirage => {
                let rect = ctx.target(target)?.rect;
                ctx.spawns.spawn_brick(BrickSpawn {
                    rect,
                    health: 1.0,
                    color: "rgba(180,180,255,0.45)".to_string(),
                    ghost: true,
                });
            }
            EffectKind::Shatter => {
                let brick = ctx.target(target)?;
                if brick.health < brick.max_health * 0.2 {
                    brick.take_damage(o.bonus.unwrap_or(30.0));
                }
            }
            EffectKind::Bleed => {
                ctx.target(target)?
                    .apply_status(StatusKind::Bleed, o.ticks(90), o.dps.unwrap_or(2.0));
            }
            EffectKind::Irradiate => {
                ctx.target(target)?
                    .apply_status(StatusKind::Irradiate, o.ticks(120), o.dps.unwrap_or(1.0));
            }
            EffectKind::Echo => {
                let amount = o.damage.unwrap_or_else(|| (ball.base_damage() * 0.4).round());
                damage_area(ctx, center, o.range.unwrap_or(110.0), Some(target), amount, 6)?;
            }
            EffectKind::Overload => {
                ctx.target(target)?
                    .apply_status(StatusKind::Vulnerable, o.ticks(45), o.mult.unwrap_or(1.5));
            }
            EffectKind::Charge => {
                ctx.target(target)?
                    .apply_status(StatusKind::Charge, o.ticks(40), 0.0);
            }
            EffectKind::Windburst => {
                let force = o.force.unwrap_or(2.0) * FRAME_RATE;
                push_area(ctx, center, o.range.unwrap_or(120.0), None, force);
            }
            EffectKind::Quake => {
                let amount = o.damage.unwrap_or(8.0);
                damage_area(ctx, center, o.range.unwrap_or(180.0), None, amount, 8)?;
            }
            EffectKind::Barrier => {
                let brick = ctx.target(target)?;
                if brick.shield <= 0.0 {
                    brick.shield = o.strength.unwrap_or(10.0);
                }
                brick.flash(6);
            }
            EffectKind::Focus => {
                let ticks = o.time.map_or(40, |t| t.max(0.0).round() as u32);
                ctx.target(target)?.apply_status(StatusKind::Focus, ticks, 0.0);
            }
            EffectKind::Momentum => {
                let bonus = o.bonus.unwrap_or(0.3) * FRAME_RATE;
                ball.speed = (ball.speed + bonus).min(MAX_BALL_SPEED);
            }
            EffectKind::Amplify => {
                ctx.damage(target, o.amount.unwrap_or(6.0), 6)?;
            }
            EffectKind::Scatter => {
                let facing = heading(ball.vel);
                for _ in 0..o.count_or(5) {
                    let angle = facing + spread(ctx.rng, PI);
                    ctx.spawns.spawn_projectile(ProjectileSpawn::child_of(ball, angle));
                }
                ball.marked_for_removal = true;
            }
            EffectKind::Orbit => {
                let ticks = o.time.map_or(60, |t| t.max(0.0).round() as u32);
                ball.orbit = Some(Orbit {
                    target: ctx.target(target)?.id,
                    ticks,
                });
            }
            EffectKind::Clone => {
                let angle = ctx.rng.random::<f32>() * TAU;
                ctx.spawns.spawn_projectile(ProjectileSpawn::child_of(ball, angle));
            }
            EffectKind::Frenzy => {
                ball.frenzy += o.count_or(1) as u32;
            }
            EffectKind::StaticField => {
                ctx.target(target)?.apply_status(
                    StatusKind::Static,
                    o.ticks(60),
                    o.strength.unwrap_or(1.0),
                );
            }
            EffectKind::Entropy => {
                let others: Vec<EffectKind> = EffectKind::ALL
                    .iter()
                    .copied()
                    .filter(|k| *k != EffectKind::Entropy)
                    .collect();
                let pick = others[ctx.rng.random_range(0..others.len())];
                log::debug!("Entropy rolled {}", pick.name());
                pick.hit(ball, target, ctx)?;
            }
            EffectKind::Gloom => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Slow, o.ticks(50), o.factor.unwrap_or(0.6));
                brick.apply_status(StatusKind::Blind, o.ticks(40), 0.0);
            }
            EffectKind::Pulse => {
                let range = o.range.unwrap_or(120.0);
                let force = o.force.unwrap_or(2.0) * FRAME_RATE;
                let amount = o.damage.unwrap_or(4.0);
                for i in ctx.bricks_near(center, range, None) {
                    let brick = &mut ctx.bricks[i];
                    let offset = brick.center() - center;
                    let falloff = 1.0 - offset.length() / range;
                    if let Some(dir) = offset.try_normalize() {
                        brick.vel += dir * force * falloff;
                    }
                    brick.take_damage(amount);
                    brick.flash(6);
                }
            }
            EffectKind::Flare => {
                ctx.damage(target, o.damage.unwrap_or(10.0), 10)?;
            }
            EffectKind::Nova => {
                let amount = o.damage.unwrap_or(12.0);
                damage_area(ctx, center, o.range.unwrap_or(160.0), None, amount, 8)?;
            }
            EffectKind::Cascade => {
                let max_jump = o.range.unwrap_or(150.0);
                let amount = o.damage.unwrap_or(8.0);
                let mut visited = vec![target];
                let mut from = center;
                for _ in 0..o.steps.map_or(3, |s| s.max(0.0).round() as usize) {
                    let Some((next, distance)) = ctx.nearest(from, &visited) else {
                        break;
                    };
                    if distance > max_jump {
                        break;
                    }
                    ctx.damage(next, amount, 6)?;
                    from = ctx.bricks[next].center();
                    visited.push(next);
                }
            }
            EffectKind::Tether => {
                if let Some((partner, _)) = ctx.nearest(center, &[target]) {
                    let target_id = ctx.target(target)?.id;
                    let partner_id = ctx.bricks[partner].id;
                    ctx.bricks[partner].tether = Some(target_id);
                    ctx.target(target)?.tether = Some(partner_id);
                }
            }
            EffectKind::Spectral => {
                ctx.target(target)?.take_damage(base);
                ball.pass_through = true;
            }
            EffectKind::Blight => {
                let brick = ctx.target(target)?;
                brick.apply_status(StatusKind::Poison, o.ticks(80), o.dps.unwrap_or(1.0));
                brick.apply_status(StatusKind::Weaken, o.ticks(80), o.factor.unwrap_or(1.2));
            }
            EffectKind::Flicker => {
                let range = o.range.unwrap_or(30.0);
                let dx = spread(ctx.rng, range);
                let dy = spread(ctx.rng, range);
                // Applied by the next lifecycle step
                ctx.target(target)?.pending_offset += Vec2::new(dx, dy);
            }
            EffectKind::ChainPull => {
                let force = o.force.unwrap_or(0.6) * FRAME_RATE;
                push_area(ctx, center, o.range.unwrap_or(140.0), Some(target), -force);
            }
            EffectKind::Detonate => {
                ctx.damage(target, o.damage.unwrap_or(20.0), 10)?;
                let splash = o.splash.unwrap_or(10.0);
                damage_area(ctx, center, o.radius.unwrap_or(200.0), Some(target), splash, 10)?;
            }
            EffectKind::Breach => {
                ctx.target(target)?.take_true_damage(base);
            }
            EffectKind::Volley => {
                let facing = heading(ball.vel);
                let width = o.range.unwrap_or(PI / 3.0);
                for _ in 0..o.count_or(5) {
                    let angle = facing + spread(ctx.rng, width);
                    ctx.spawns.spawn_projectile(ProjectileSpawn::child_of(ball, angle));
                }
                ball.marked_for_removal = true;
            }
            EffectKind::Burst => {
                let amount = o.damage.unwrap_or(6.0);
                damage_area(ctx, center, o.range.unwrap_or(100.0), None, amount, 6)?;
            }
            EffectKind::Frostbite => {
                let brick = ctx.target(target)?;
                brick.take_true_damage(o.damage.unwrap_or(5.0));
                brick.apply_status(StatusKind::Freeze, o.ticks(30), 0.0);
                brick.apply_status(StatusKind::Slow, o.ticks(30) * 3, o.factor.unwrap_or(0.5));
                brick.flash(6);
            }
            EffectKind::Incinerate => {
                ctx.damage(target, o.damage.unwrap_or(5.0), 8)?;
                ctx.target(target)?
                    .apply_status(StatusKind::Burn, o.ticks(90), o.dps.unwrap_or(6.0));
            }
            EffectKind::ToxinCloud => {
                let ticks = o.ticks(90);
                let dps = o.dps.unwrap_or(1.0);
                for i in ctx.bricks_near(center, o.range.unwrap_or(100.0), None) {
                    ctx.bricks[i].apply_status(StatusKind::Poison, ticks, dps);
                }
            }
            EffectKind::HyperBounce => {}
            EffectKind::Crush => {
                ctx.target(target)?.take_damage(o.damage.unwrap_or(15.0));
            }
            EffectKind::Disrupt => {
                ctx.target(target)?.flash(8);
            }
            EffectKind::Drain => {
                let amount = o.amount.unwrap_or(5.0);
                ctx.target(target)?.take_damage(amount);
                ctx.events.push(GameEvent::OwnerHealed {
                    owner: ball.owner,
                    amount: (amount * 0.5).round(),
                });
            }
            EffectKind::EchoHit => {
                ctx.target(target)?.take_damage(o.damage.unwrap_or(4.0));
            }
        }
        Ok(())
    }
}

impl Effect for EffectKind {
    fn on_hit(&self, ball: &mut Ball, target: usize, ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        self.hit(ball, target, ctx)
    }

    fn on_update(&self, ball: &mut Ball, dt: f32, ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        if *self != EffectKind::Orbit {
            return Ok(());
        }
        let Some(orbit) = ball.orbit.as_mut() else {
            return Ok(());
        };
        let anchor = ctx
            .bricks
            .iter()
            .find(|b| b.id == orbit.target && b.is_live())
            .map(|b| b.center());
        let Some(anchor) = anchor.filter(|_| orbit.ticks > 0) else {
            ball.orbit = None;
            return Ok(());
        };
        orbit.ticks -= 1;

        // Bend the heading toward the tangent around the anchor
        let to_anchor = (anchor - ball.pos)
            .try_normalize()
            .context("ball sits on its orbit anchor")?;
        let tangent = if to_anchor.perp().dot(ball.vel) >= 0.0 {
            to_anchor.perp()
        } else {
            -to_anchor.perp()
        };
        let blend = (dt * 4.0).clamp(0.0, 1.0);
        let dir = ball.vel.normalize_or_zero().lerp(tangent, blend);
        ball.vel = dir.normalize_or(tangent) * ball.speed;
        Ok(())
    }

    fn on_bounce(&self, ball: &mut Ball, _normal: Vec2, ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        if *self == EffectKind::HyperBounce {
            let mult = ctx.overrides.mult.unwrap_or(1.05);
            ball.speed = (ball.speed * mult).min(MAX_BALL_SPEED);
            ball.vel = ball.vel.normalize_or(angle_to_dir(ball.angle)) * ball.speed;
        }
        Ok(())
    }
}
