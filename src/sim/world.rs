//! The world aggregate: every piece of mutable simulation state

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::collision::ArenaBounds;
use super::effects::{BrickSpawn, EffectRegistry, ProjectileSpawn, SpawnQueue};
use super::spawner::Spawner;
use super::state::{Ball, Brick, EntityId, EntityIds, GamePhase, OwnerId};
use crate::{BallKind, Tuning};

/// Distance of the launcher above the bottom edge
const PLAYER_INSET: f32 = 80.0;

/// The launcher balls return to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: OwnerId,
    pub pos: Vec2,
    pub health: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Progress {
    pub level: u32,
    pub xp: u32,
    pub kills: u32,
}

#[derive(Debug)]
pub struct World {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub registry: EffectRegistry,
    /// Kind launched by the player
    pub loadout: BallKind,
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub bounds: ArenaBounds,
    pub player: Player,
    pub progress: Progress,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    /// Active bricks (sorted by id for determinism)
    pub bricks: Vec<Brick>,
    pub spawner: Spawner,
    pub ids: EntityIds,
    /// Effect spawn requests waiting for the end of the ball pass
    pub spawns: SpawnQueue,
}

/// Serializable view handed to hosts
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub bounds: ArenaBounds,
    pub player: &'a Player,
    pub progress: &'a Progress,
    pub boss: Option<EntityId>,
    pub balls: &'a [Ball],
    pub bricks: &'a [Brick],
}

impl World {
    pub fn new(seed: u64, tuning: Tuning, bounds: ArenaBounds) -> Self {
        let player = Player {
            id: OwnerId(0),
            pos: Self::home_position(&bounds),
            health: tuning.player_max_health,
            max_health: tuning.player_max_health,
        };
        log::info!("New world with seed {seed}");
        Self {
            seed,
            spawner: Spawner::new(&tuning),
            tuning,
            registry: EffectRegistry::builtin(),
            loadout: BallKind::default(),
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Playing,
            time_ticks: 0,
            bounds,
            player,
            progress: Progress {
                level: 1,
                ..Progress::default()
            },
            balls: Vec::new(),
            bricks: Vec::new(),
            ids: EntityIds::default(),
            spawns: SpawnQueue::default(),
        }
    }

    /// World sized from a canvas, with the player centred near the bottom
    pub fn with_canvas(seed: u64, tuning: Tuning, width: f32, height: f32) -> Self {
        let bounds = ArenaBounds::from_canvas(width, height, &tuning);
        Self::new(seed, tuning, bounds)
    }

    pub fn home_position(bounds: &ArenaBounds) -> Vec2 {
        Vec2::new(
            (bounds.left + bounds.right) * 0.5,
            (bounds.height - PLAYER_INSET).max(0.0),
        )
    }

    pub fn set_loadout(&mut self, kind: BallKind) {
        log::info!("Loadout set to {}", kind.name);
        self.loadout = kind;
    }

    /// New arena size; the player keeps its height offset from the floor
    pub fn resize(&mut self, bounds: ArenaBounds) {
        self.bounds = bounds;
        self.player.pos = Self::home_position(&bounds);
    }

    /// Position returning balls fly to, resolved by owner id
    pub fn owner_position(&self, owner: OwnerId) -> Option<Vec2> {
        (owner == self.player.id).then_some(self.player.pos)
    }

    /// Launch a loadout ball from the player toward `angle`
    pub fn launch_ball(&mut self, angle: f32) -> EntityId {
        let id = self.ids.next_id();
        let kind = &self.loadout;
        let mut ball = Ball::new(
            id,
            self.player.id,
            self.player.pos,
            angle,
            self.tuning.ball_speed,
            self.tuning.ball_radius,
        )
        .with_stats(kind.ball_stats())
        .with_effects(kind.effect_names());
        ball.overrides = kind.overrides();
        ball.tags = kind.tags.clone();
        ball.visual = kind.gradient.clone();
        ball.ability = kind.ability.clone();
        self.balls.push(ball);
        log::debug!("Launched ball {id} at {angle:.3} rad");
        id
    }

    /// Balls the player launched that are still in play
    pub fn player_balls_in_flight(&self) -> usize {
        self.balls
            .iter()
            .filter(|b| b.owner == self.player.id && !b.marked_for_removal)
            .count()
    }

    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> EntityId {
        let id = self.ids.next_id();
        let mut ball = Ball::new(id, spawn.owner, spawn.pos, spawn.angle, spawn.speed, spawn.radius)
            .with_stats(spawn.stats)
            .with_effects(spawn.effects);
        ball.overrides = spawn.overrides;
        ball.tags = spawn.tags;
        ball.visual = spawn.visual;
        ball.ability = spawn.ability;
        // Children start clear of the brick their parent just struck
        ball.hit_cooldown = self.tuning.hit_cooldown_ticks;
        self.balls.push(ball);
        id
    }

    pub fn spawn_brick(&mut self, spawn: BrickSpawn) -> EntityId {
        let id = self.ids.next_id();
        let mut brick = Brick::new(id, spawn.rect, spawn.health, spawn.color);
        brick.ghost = spawn.ghost;
        self.bricks.push(brick);
        id
    }

    /// Turn queued effect spawns into entities
    pub fn apply_spawns(&mut self) {
        let queued = std::mem::take(&mut self.spawns);
        for spawn in queued.projectiles {
            self.spawn_projectile(spawn);
        }
        for spawn in queued.bricks {
            self.spawn_brick(spawn);
        }
    }

    /// Drop removed entities
    pub fn remove_marked(&mut self) {
        self.balls.retain(|b| !b.marked_for_removal);
        self.bricks.retain(|b| !b.marked_for_removal);
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.bricks.sort_by_key(|b| b.id);
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            time_ticks: self.time_ticks,
            phase: self.phase,
            bounds: self.bounds,
            player: &self.player,
            progress: &self.progress,
            boss: self.spawner.boss,
            balls: &self.balls,
            bricks: &self.bricks,
        }
    }
}
