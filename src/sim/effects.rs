//! Effect registry: named behaviors attached to balls
//!
//! A ball carries effect names as data. At each hit, tick and bounce the
//! simulator asks the registry to run the matching handlers. Unknown names
//! are skipped, and a handler that fails is logged and treated as a no-op
//! so one bad effect never stalls the frame.

use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::abilities::EffectKind;
use super::collision::Rect;
use super::state::{Ball, BallStats, Brick, GameEvent, OwnerId};

/// Per-ball numeric overrides. A present value beats both the handler's
/// default and the ball's own stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectOverrides {
    pub damage: Option<f32>,
    pub radius: Option<f32>,
    pub range: Option<f32>,
    /// Status duration in ticks
    pub duration: Option<f32>,
    pub dps: Option<f32>,
    pub factor: Option<f32>,
    pub force: Option<f32>,
    pub amount: Option<f32>,
    pub count: Option<f32>,
    pub chance: Option<f32>,
    pub mult: Option<f32>,
    pub splash: Option<f32>,
    pub strength: Option<f32>,
    pub bonus: Option<f32>,
    pub time: Option<f32>,
    pub steps: Option<f32>,
}

impl EffectOverrides {
    /// Status duration in whole ticks, falling back to `default`
    pub fn ticks(&self, default: u32) -> u32 {
        self.duration.map_or(default, |d| d.max(0.0).round() as u32)
    }

    pub fn count_or(&self, default: usize) -> usize {
        self.count.map_or(default, |c| c.max(0.0).round() as usize)
    }
}

/// A projectile requested by an effect, created after the tick's ball pass
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub owner: OwnerId,
    pub pos: Vec2,
    pub angle: f32,
    pub speed: f32,
    pub radius: f32,
    pub stats: BallStats,
    pub effects: Vec<String>,
    pub overrides: EffectOverrides,
    pub tags: Vec<String>,
    pub visual: String,
    pub ability: String,
}

impl ProjectileSpawn {
    /// A child of `parent` heading along `angle`. Children never inherit
    /// projectile-spawning effects.
    pub fn child_of(parent: &Ball, angle: f32) -> Self {
        Self {
            owner: parent.owner,
            pos: parent.pos,
            angle,
            speed: parent.speed,
            radius: parent.radius,
            stats: parent.stats,
            effects: parent
                .effects
                .iter()
                .filter(|name| !EffectKind::from_name(name).is_some_and(EffectKind::spawns_projectiles))
                .cloned()
                .collect(),
            overrides: parent.overrides,
            tags: parent.tags.clone(),
            visual: parent.visual.clone(),
            ability: parent.ability.clone(),
        }
    }
}

/// A brick requested by an effect (fragments, spores, decoys)
#[derive(Debug, Clone, PartialEq)]
pub struct BrickSpawn {
    pub rect: Rect,
    pub health: f32,
    pub color: String,
    pub ghost: bool,
}

/// Spawn requests collected during a tick
#[derive(Debug, Default)]
pub struct SpawnQueue {
    pub projectiles: Vec<ProjectileSpawn>,
    pub bricks: Vec<BrickSpawn>,
}

impl SpawnQueue {
    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) {
        self.projectiles.push(spawn);
    }

    pub fn spawn_brick(&mut self, spawn: BrickSpawn) {
        self.bricks.push(spawn);
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty() && self.bricks.is_empty()
    }
}

/// Everything a handler may touch besides the ball itself
pub struct EffectContext<'a> {
    pub bricks: &'a mut [Brick],
    pub spawns: &'a mut SpawnQueue,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
    pub overrides: EffectOverrides,
}

impl EffectContext<'_> {
    pub fn target(&mut self, index: usize) -> anyhow::Result<&mut Brick> {
        let len = self.bricks.len();
        self.bricks
            .get_mut(index)
            .with_context(|| format!("target index {index} out of range ({len} bricks)"))
    }

    /// Indices of live bricks whose centre lies strictly within `range` of `center`
    pub fn bricks_near(&self, center: Vec2, range: f32, exclude: Option<usize>) -> Vec<usize> {
        self.bricks
            .iter()
            .enumerate()
            .filter(|(i, b)| Some(*i) != exclude && b.is_live())
            .filter(|(_, b)| b.center().distance(center) < range)
            .map(|(i, _)| i)
            .collect()
    }

    /// Closest live brick to `from`, skipping `exclude`
    pub fn nearest(&self, from: Vec2, exclude: &[usize]) -> Option<(usize, f32)> {
        self.bricks
            .iter()
            .enumerate()
            .filter(|(i, b)| !exclude.contains(i) && b.is_live())
            .map(|(i, b)| (i, b.center().distance(from)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Mitigated damage plus a hit flash
    pub fn damage(&mut self, index: usize, amount: f32, flash: u32) -> anyhow::Result<f32> {
        let brick = self.target(index)?;
        let dealt = brick.take_damage(amount);
        brick.flash(flash);
        Ok(dealt)
    }
}

/// Hooks an effect may implement. Unimplemented hooks are no-ops.
pub trait Effect {
    fn on_hit(&self, _ball: &mut Ball, _target: usize, _ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_update(&self, _ball: &mut Ball, _dt: f32, _ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_bounce(&self, _ball: &mut Ball, _normal: Vec2, _ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Name to behavior lookup, built once at startup
pub struct EffectRegistry {
    effects: HashMap<String, Box<dyn Effect>>,
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EffectRegistry").field("effects", &names).finish()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EffectRegistry {
    pub fn empty() -> Self {
        Self {
            effects: HashMap::new(),
        }
    }

    /// Registry holding every built-in effect kind
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in EffectKind::ALL {
            registry.register(kind.name(), Box::new(*kind));
        }
        registry
    }

    /// Add or replace a handler
    pub fn register(&mut self, name: impl Into<String>, effect: Box<dyn Effect>) {
        self.effects.insert(name.into(), effect);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Effect> {
        self.effects.get(name).map(|e| e.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn apply_on_hit(&self, names: &[String], ball: &mut Ball, target: usize, ctx: &mut EffectContext<'_>) {
        for name in names {
            if let Some(effect) = self.get(name)
                && let Err(err) = effect.on_hit(ball, target, ctx)
            {
                log::warn!("Effect {name} failed on hit: {err:#}");
            }
        }
    }

    pub fn apply_on_update(&self, names: &[String], ball: &mut Ball, dt: f32, ctx: &mut EffectContext<'_>) {
        for name in names {
            if let Some(effect) = self.get(name)
                && let Err(err) = effect.on_update(ball, dt, ctx)
            {
                log::warn!("Effect {name} failed on update: {err:#}");
            }
        }
    }

    pub fn apply_on_bounce(&self, names: &[String], ball: &mut Ball, normal: Vec2, ctx: &mut EffectContext<'_>) {
        for name in names {
            if let Some(effect) = self.get(name)
                && let Err(err) = effect.on_bounce(ball, normal, ctx)
            {
                log::warn!("Effect {name} failed on bounce: {err:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct Failing;

    impl Effect for Failing {
        fn on_hit(&self, _ball: &mut Ball, _target: usize, _ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
            anyhow::bail!("malformed effect")
        }
    }

    struct Tally(f32);

    impl Effect for Tally {
        fn on_hit(&self, _ball: &mut Ball, target: usize, ctx: &mut EffectContext<'_>) -> anyhow::Result<()> {
            ctx.target(target)?.health -= self.0;
            Ok(())
        }
    }

    fn fixture() -> (Ball, Vec<Brick>, SpawnQueue, Pcg32, Vec<GameEvent>) {
        let ball = Ball::new(1, OwnerId(0), Vec2::new(50.0, 50.0), 0.0, 420.0, 8.0);
        let bricks = vec![Brick::new(10, Rect::new(0.0, 0.0, 70.0, 30.0), 100.0, "c")];
        (ball, bricks, SpawnQueue::default(), Pcg32::seed_from_u64(7), Vec::new())
    }

    #[test]
    fn test_unknown_and_failing_effects_are_skipped() {
        let (mut ball, mut bricks, mut spawns, mut rng, mut events) = fixture();
        let mut registry = EffectRegistry::empty();
        registry.register("Broken", Box::new(Failing));
        registry.register("Tally", Box::new(Tally(5.0)));
        let names: Vec<String> = ["Nope", "Broken", "Tally"].iter().map(|s| s.to_string()).collect();
        let mut ctx = EffectContext {
            bricks: &mut bricks,
            spawns: &mut spawns,
            rng: &mut rng,
            events: &mut events,
            overrides: EffectOverrides::default(),
        };
        registry.apply_on_hit(&names, &mut ball, 0, &mut ctx);
        assert_eq!(bricks[0].health, 95.0);
    }

    #[test]
    fn test_repeated_name_runs_twice() {
        let (mut ball, mut bricks, mut spawns, mut rng, mut events) = fixture();
        let mut registry = EffectRegistry::empty();
        registry.register("Tally", Box::new(Tally(5.0)));
        let names = vec!["Tally".to_string(), "Tally".to_string()];
        let mut ctx = EffectContext {
            bricks: &mut bricks,
            spawns: &mut spawns,
            rng: &mut rng,
            events: &mut events,
            overrides: EffectOverrides::default(),
        };
        registry.apply_on_hit(&names, &mut ball, 0, &mut ctx);
        assert_eq!(bricks[0].health, 90.0);
    }

    #[test]
    fn test_bad_target_index_is_contained() {
        let (mut ball, mut bricks, mut spawns, mut rng, mut events) = fixture();
        let mut registry = EffectRegistry::empty();
        registry.register("Tally", Box::new(Tally(5.0)));
        let mut ctx = EffectContext {
            bricks: &mut bricks,
            spawns: &mut spawns,
            rng: &mut rng,
            events: &mut events,
            overrides: EffectOverrides::default(),
        };
        registry.apply_on_hit(&["Tally".to_string()], &mut ball, 5, &mut ctx);
        assert_eq!(bricks[0].health, 100.0);
    }

    #[test]
    fn test_child_drops_spawning_effects() {
        let (ball, ..) = fixture();
        let ball = ball.with_effects(["Burn", "Split", "Pierce", "Volley"]);
        let child = ProjectileSpawn::child_of(&ball, 1.0);
        assert_eq!(child.effects, vec!["Burn".to_string(), "Pierce".to_string()]);
        assert_eq!(child.owner, ball.owner);
    }

    #[test]
    fn test_builtin_registry_has_catalogue() {
        let registry = EffectRegistry::builtin();
        for name in ["Burn", "areaOfEffect", "Pierce", "EchoHit", "Duration"] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert!(!registry.contains("burn"));
    }

    #[test]
    fn test_override_ticks() {
        let overrides = EffectOverrides {
            duration: Some(90.4),
            ..Default::default()
        };
        assert_eq!(overrides.ticks(10), 90);
        assert_eq!(EffectOverrides::default().ticks(10), 10);
    }
}
