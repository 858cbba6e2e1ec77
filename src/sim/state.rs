//! Entities and events of the simulation
//!
//! Balls and bricks are plain data; behavior lives in `projectile`,
//! `lifecycle` and the effect modules.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::effects::EffectOverrides;
use super::status::{StatusEffects, StatusKind};
use crate::heading;

pub type EntityId = u32;

/// Who a ball returns to. Resolved through the world, never a live pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u32);

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended
    GameOver,
}

/// Monotonic entity id source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIds {
    next: EntityId,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Combat numbers a ball carries into each hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallStats {
    pub damage: i32,
    pub knockback: f32,
    pub pierce: i32,
    #[serde(default)]
    pub crit_chance: f32,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f32,
}

fn default_crit_multiplier() -> f32 {
    2.0
}

impl Default for BallStats {
    fn default() -> Self {
        Self {
            damage: 25,
            knockback: 5.0,
            pierce: 1,
            crit_chance: 0.0,
            crit_multiplier: default_crit_multiplier(),
        }
    }
}

/// Ball circling a brick after an Orbit hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub target: EntityId,
    pub ticks: u32,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: EntityId,
    pub owner: OwnerId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Velocity at the moment of the current contact, before reflection
    #[serde(skip)]
    pub impact_vel: Vec2,
    pub radius: f32,
    /// Speed every bounce is renormalized to
    pub speed: f32,
    /// Facing, kept in sync with velocity
    pub angle: f32,
    pub stats: BallStats,
    /// Effect names, resolved through the registry at each event
    pub effects: Vec<String>,
    #[serde(default)]
    pub overrides: EffectOverrides,
    /// Keys this ball carries for locked bricks
    #[serde(default)]
    pub tags: Vec<String>,
    /// Opaque to the core (gradient, sprite, ...)
    #[serde(default)]
    pub visual: String,
    #[serde(default)]
    pub ability: String,
    /// Ticks before this ball may deal damage again
    pub hit_cooldown: u32,
    /// Flying straight back to the owner
    pub returning: bool,
    pub marked_for_removal: bool,
    pub pierces_left: i32,
    /// Set by an effect to skip reflection for the current contact
    #[serde(skip)]
    pub pass_through: bool,
    /// Brick currently being pierced, ignored until the ball leaves it
    #[serde(default)]
    pub passing: Option<EntityId>,
    #[serde(default)]
    pub frenzy: u32,
    #[serde(default)]
    pub orbit: Option<Orbit>,
}

impl Ball {
    pub fn new(id: EntityId, owner: OwnerId, pos: Vec2, angle: f32, speed: f32, radius: f32) -> Self {
        let stats = BallStats::default();
        Self {
            id,
            owner,
            pos,
            vel: crate::angle_to_dir(angle) * speed,
            impact_vel: Vec2::ZERO,
            radius,
            speed,
            angle,
            stats,
            effects: Vec::new(),
            overrides: EffectOverrides::default(),
            tags: Vec::new(),
            visual: String::new(),
            ability: String::new(),
            hit_cooldown: 0,
            returning: false,
            marked_for_removal: false,
            pierces_left: stats.pierce,
            pass_through: false,
            passing: None,
            frenzy: 0,
            orbit: None,
        }
    }

    pub fn with_stats(mut self, stats: BallStats) -> Self {
        self.stats = stats;
        self.pierces_left = stats.pierce;
        self
    }

    pub fn with_effects<I, S>(mut self, effects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.effects = effects.into_iter().map(Into::into).collect();
        self
    }

    /// Damage dealt by a plain contact, including Frenzy stacks
    pub fn base_damage(&self) -> f32 {
        self.stats.damage as f32 * (1.0 + 0.1 * self.frenzy as f32)
    }

    /// Scale velocity back to `speed`. A degenerate velocity takes the
    /// fallback direction instead.
    pub fn renormalize(&mut self, fallback: Vec2) {
        let dir = self
            .vel
            .try_normalize()
            .or_else(|| fallback.try_normalize())
            .unwrap_or(Vec2::NEG_Y);
        self.vel = dir * self.speed;
        self.angle = heading(self.vel);
    }
}

/// Lifecycle state of a brick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BrickState {
    /// Falling at the base speed
    Normal,
    /// Backing up before a rush
    Charging { remaining: u32 },
    /// Diving for the bottom edge
    Rushing { speed: f32 },
    /// Boss entering the arena
    Dropping,
    /// Boss in place, cycling armor
    Active,
}

/// Boss bookkeeping: live armor companions and the re-summon cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BossState {
    /// Ids of companion bricks still alive
    pub armor: Vec<EntityId>,
    /// Ticks spent unarmored since the last batch fell
    pub summon_cooldown: u32,
    /// Ticks left before a telegraphed batch spawns
    pub telegraph: Option<u32>,
}

/// Brick that needs a qualifying first contact before it can be damaged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    /// Tag the ball must carry; `None` opens for any ball
    pub tag: Option<String>,
    pub unlocked: bool,
}

impl Lock {
    pub fn opens_for(&self, ball: &Ball) -> bool {
        self.tag.as_ref().is_none_or(|tag| ball.tags.contains(tag))
    }
}

/// A brick entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub id: EntityId,
    pub rect: Rect,
    pub health: f32,
    pub max_health: f32,
    /// Visual tag, opaque to the core
    pub color: String,
    pub state: BrickState,
    pub marked_for_removal: bool,
    /// Knockback drift, damped every tick
    #[serde(default)]
    pub vel: Vec2,
    /// Displacement waiting for the next lifecycle step
    #[serde(default)]
    pub pending_offset: Vec2,
    #[serde(default)]
    pub status: StatusEffects,
    /// Absorbs damage before health
    #[serde(default)]
    pub shield: f32,
    /// Flat reduction per hit
    #[serde(default)]
    pub armor: f32,
    #[serde(default)]
    pub hit_flash: u32,
    #[serde(default)]
    pub tether: Option<EntityId>,
    /// Decoy: never charges or rushes
    #[serde(default)]
    pub ghost: bool,
    /// Boss that summoned this brick
    #[serde(default)]
    pub summoner: Option<EntityId>,
    #[serde(default)]
    pub lock: Option<Lock>,
    #[serde(default)]
    pub boss: Option<BossState>,
}

impl Brick {
    pub fn new(id: EntityId, rect: Rect, health: f32, color: impl Into<String>) -> Self {
        Self {
            id,
            rect,
            health,
            max_health: health,
            color: color.into(),
            state: BrickState::Normal,
            marked_for_removal: false,
            vel: Vec2::ZERO,
            pending_offset: Vec2::ZERO,
            status: StatusEffects::default(),
            shield: 0.0,
            armor: 0.0,
            hit_flash: 0,
            tether: None,
            ghost: false,
            summoner: None,
            lock: None,
            boss: None,
        }
    }

    /// A boss brick, dropping in from above
    pub fn boss(id: EntityId, rect: Rect, health: f32) -> Self {
        let mut brick = Self::new(id, rect, health, "boss");
        brick.state = BrickState::Dropping;
        brick.boss = Some(BossState::default());
        brick
    }

    /// Lock the brick. Waves roll untagged locks; hosts building their own
    /// layouts may key a lock to a ball tag.
    pub fn with_lock(mut self, tag: Option<String>) -> Self {
        self.lock = Some(Lock {
            tag,
            unlocked: false,
        });
        self
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        !self.marked_for_removal
    }

    pub fn is_boss(&self) -> bool {
        self.boss.is_some()
    }

    /// Bosses shrug off damage while any armor companion lives
    pub fn is_immune(&self) -> bool {
        self.boss.as_ref().is_some_and(|b| !b.armor.is_empty())
    }

    pub fn is_locked(&self) -> bool {
        self.lock.as_ref().is_some_and(|l| !l.unlocked)
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0 && !self.is_immune()
    }

    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    /// Apply a hit through armor, shield and damage statuses.
    /// Returns the health actually lost.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 || self.is_immune() {
            return 0.0;
        }
        let mut remaining = (amount * self.status.damage_multiplier() - self.armor).max(0.0);
        if self.shield > 0.0 {
            let absorbed = self.shield.min(remaining);
            self.shield -= absorbed;
            remaining -= absorbed;
        }
        self.health -= remaining;
        remaining
    }

    /// Damage that ignores armor, shield and multipliers (still blocked by boss armor)
    pub fn take_true_damage(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 || self.is_immune() {
            return 0.0;
        }
        self.health -= amount;
        amount
    }

    pub fn heal(&mut self, amount: f32) {
        self.health += amount.max(0.0);
    }

    pub fn flash(&mut self, ticks: u32) {
        self.hit_flash = self.hit_flash.max(ticks);
    }

    pub fn apply_status(&mut self, kind: StatusKind, ticks: u32, magnitude: f32) {
        self.status.apply(kind, ticks, magnitude);
    }
}

/// Things that happened during a tick, for the host to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    BallLaunched { ball: EntityId },
    BrickHit { brick: EntityId, ball: EntityId, damage: f32 },
    BrickUnlocked { brick: EntityId, ball: EntityId },
    /// Armored boss took the contact without damage
    ContactAbsorbed { brick: EntityId, ball: EntityId },
    BrickDestroyed { brick: EntityId, pos: Vec2, max_health: f32, boss: bool },
    LootDropped { pos: Vec2 },
    PlayerDamaged { amount: f32 },
    OwnerHealed { owner: OwnerId, amount: f32 },
    GameOver,
    WaveSpawned { count: usize },
    BossSpawned { brick: EntityId },
    BossTelegraph { brick: EntityId },
    ArmorSummoned { boss: EntityId, count: usize },
    LevelUp { level: u32 },
    LevelComplete { level: u32 },
}

impl GameEvent {
    pub fn destroyed(brick: &Brick) -> Self {
        GameEvent::BrickDestroyed {
            brick: brick.id,
            pos: brick.center(),
            max_health: brick.max_health,
            boss: brick.is_boss(),
        }
    }
}

/// Mark every dead brick for removal and report it. Bosses whose armor
/// just fell lose their immunity in the same pass.
pub fn reap_dead(bricks: &mut [Brick], events: &mut Vec<GameEvent>) {
    let mut any = false;
    for brick in bricks.iter_mut() {
        if brick.is_live() && brick.is_dead() {
            brick.marked_for_removal = true;
            events.push(GameEvent::destroyed(brick));
            log::debug!("Brick {} destroyed", brick.id);
            any = true;
        }
    }
    if any {
        refresh_boss_armor(bricks);
        // A boss freed by this pass may already be below zero
        for brick in bricks.iter_mut() {
            if brick.is_live() && brick.is_boss() && brick.is_dead() {
                brick.marked_for_removal = true;
                events.push(GameEvent::destroyed(brick));
            }
        }
    }
}

/// Drop armor ids whose bricks are gone
pub fn refresh_boss_armor(bricks: &mut [Brick]) {
    let live: Vec<EntityId> = bricks
        .iter()
        .filter(|b| b.is_live() && b.summoner.is_some())
        .map(|b| b.id)
        .collect();
    for brick in bricks.iter_mut() {
        if let Some(boss) = brick.boss.as_mut() {
            boss.armor.retain(|id| live.contains(id));
        }
    }
}
