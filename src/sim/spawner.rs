//! Brick waves and boss scheduling

use rand::Rng;
use rand::seq::index;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{ArenaBounds, Rect};
use super::state::{Brick, EntityId, EntityIds, GameEvent};
use super::uniform;
use crate::Tuning;

/// Color tag for boss armor companions
const ARMOR_COLOR: &str = "hsl(350, 55%, 45%)";

/// World pieces the spawner reads and appends to
pub struct SpawnEnv<'a> {
    pub dt: f32,
    pub level: u32,
    pub bounds: ArenaBounds,
    pub tuning: &'a Tuning,
    pub ids: &'a mut EntityIds,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
}

/// Timers for normal waves and the boss encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spawner {
    /// Milliseconds accumulated toward the next wave
    pub wave_timer_ms: f32,
    /// Ticks spent without a boss
    pub boss_timer: u32,
    /// Boss currently in play
    pub boss: Option<EntityId>,
    /// Ticks after a boss kill before the boss timer resumes
    pub grace: u32,
}

impl Spawner {
    /// A fresh spawner fires its first wave on the first update
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            wave_timer_ms: tuning.wave_interval_ms,
            boss_timer: 0,
            boss: None,
            grace: 0,
        }
    }

    pub fn boss_active(&self) -> bool {
        self.boss.is_some()
    }

    /// Advance timers, spawning a wave or a boss when due
    pub fn update(&mut self, bricks: &mut Vec<Brick>, env: &mut SpawnEnv<'_>) {
        if let Some(id) = self.boss {
            if bricks.iter().any(|b| b.id == id && b.is_live()) {
                // Waves stay suspended for the whole encounter
                return;
            }
            self.on_boss_defeated(env.tuning);
        }

        if self.grace > 0 {
            self.grace -= 1;
        } else {
            self.boss_timer += 1;
            if self.boss_timer >= env.tuning.boss_threshold_at(env.level) {
                self.spawn_boss(bricks, env);
                return;
            }
        }

        self.wave_timer_ms += env.dt * 1000.0;
        if self.wave_timer_ms >= env.tuning.wave_interval_ms {
            self.wave_timer_ms -= env.tuning.wave_interval_ms;
            self.spawn_wave(bricks, env);
        }
    }

    /// Drop one brick into each of a few distinct, randomly chosen columns
    pub fn spawn_wave(&mut self, bricks: &mut Vec<Brick>, env: &mut SpawnEnv<'_>) -> usize {
        let tuning = env.tuning;
        let count = env
            .rng
            .random_range(tuning.min_wave_size..=tuning.max_wave_size)
            .min(tuning.columns);
        let mut columns = index::sample(env.rng, tuning.columns, count).into_vec();
        columns.sort_unstable();

        for column in &columns {
            let x = env.bounds.column_x(*column, tuning);
            let hue = uniform(env.rng, tuning.hue_min, tuning.hue_max);
            let lightness = uniform(env.rng, tuning.lightness_min, tuning.lightness_max);
            let health = uniform(env.rng, tuning.min_brick_health, tuning.max_brick_health);
            let rect = Rect::new(x, -tuning.brick_height, tuning.brick_width, tuning.brick_height);
            let color = format!("hsl({hue:.1}, 40%, {lightness:.1}%)");
            let mut brick = Brick::new(env.ids.next_id(), rect, health, color);
            if env.rng.random::<f64>() < tuning.lock_chance {
                brick = brick.with_lock(None);
            }
            bricks.push(brick);
        }

        log::info!("Wave of {} bricks in columns {columns:?}", columns.len());
        env.events.push(GameEvent::WaveSpawned {
            count: columns.len(),
        });
        columns.len()
    }

    /// Boss spanning the centre columns, dropping in from above
    pub fn spawn_boss(&mut self, bricks: &mut Vec<Brick>, env: &mut SpawnEnv<'_>) -> EntityId {
        let tuning = env.tuning;
        let span = tuning.boss_columns.min(tuning.columns);
        let first = (tuning.columns - span) / 2;
        let width = span as f32 * tuning.brick_width + (span as f32 - 1.0) * tuning.column_spacing;
        let rect = Rect::new(
            env.bounds.column_x(first, tuning),
            -tuning.boss_height,
            width,
            tuning.boss_height,
        );

        let id = env.ids.next_id();
        let health = tuning.boss_health_at(env.level);
        bricks.push(Brick::boss(id, rect, health));
        self.boss = Some(id);
        self.boss_timer = 0;

        log::info!("Boss {id} spawned at level {} with {health} health", env.level);
        env.events.push(GameEvent::BossSpawned { brick: id });
        id
    }

    /// Spawn a fresh armor batch for `boss_id` and make the boss immune
    pub fn summon_armor(&mut self, boss_id: EntityId, bricks: &mut Vec<Brick>, env: &mut SpawnEnv<'_>) {
        let tuning = env.tuning;
        let count = tuning.armor_batch.min(tuning.columns);
        let mut columns = index::sample(env.rng, tuning.columns, count).into_vec();
        columns.sort_unstable();

        let mut armor = Vec::with_capacity(count);
        for column in columns {
            let rect = Rect::new(
                env.bounds.column_x(column, tuning),
                -tuning.brick_height,
                tuning.brick_width,
                tuning.brick_height,
            );
            let id = env.ids.next_id();
            let mut brick = Brick::new(id, rect, tuning.armor_health, ARMOR_COLOR);
            brick.summoner = Some(boss_id);
            bricks.push(brick);
            armor.push(id);
        }

        if let Some(boss) = bricks
            .iter_mut()
            .find(|b| b.id == boss_id)
            .and_then(|b| b.boss.as_mut())
        {
            boss.armor = armor;
            boss.summon_cooldown = 0;
            boss.telegraph = None;
        }

        log::info!("Boss {boss_id} summoned {count} armor bricks");
        env.events.push(GameEvent::ArmorSummoned {
            boss: boss_id,
            count,
        });
    }

    /// Resume waves and start the post-boss grace period
    pub fn on_boss_defeated(&mut self, tuning: &Tuning) {
        if let Some(id) = self.boss.take() {
            log::info!("Boss {id} defeated");
        }
        self.grace = tuning.boss_grace_ticks;
        self.boss_timer = 0;
        self.wave_timer_ms = tuning.wave_interval_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use rand::SeedableRng;

    struct Fixture {
        tuning: Tuning,
        ids: EntityIds,
        rng: Pcg32,
        events: Vec<GameEvent>,
        bounds: ArenaBounds,
    }

    impl Fixture {
        fn new(tuning: Tuning, seed: u64) -> Self {
            let bounds = ArenaBounds::from_canvas(800.0, 600.0, &tuning);
            Self {
                tuning,
                ids: EntityIds::default(),
                rng: Pcg32::seed_from_u64(seed),
                events: Vec::new(),
                bounds,
            }
        }

        fn env(&mut self) -> SpawnEnv<'_> {
            SpawnEnv {
                dt: SIM_DT,
                level: 1,
                bounds: self.bounds,
                tuning: &self.tuning,
                ids: &mut self.ids,
                rng: &mut self.rng,
                events: &mut self.events,
            }
        }
    }

    #[test]
    fn test_wave_uses_distinct_columns() {
        let mut fx = Fixture::new(Tuning::default(), 42);
        let mut spawner = Spawner::new(&fx.tuning);
        for _ in 0..50 {
            let mut bricks = Vec::new();
            let count = spawner.spawn_wave(&mut bricks, &mut fx.env());
            assert!((1..=3).contains(&count));
            let mut xs: Vec<i32> = bricks.iter().map(|b| b.rect.x.round() as i32).collect();
            xs.dedup();
            assert_eq!(xs.len(), count);
            for b in &bricks {
                assert!((40.0..100.0).contains(&b.health));
                assert_eq!(b.rect.y, -fx.tuning.brick_height);
                assert!(b.color.starts_with("hsl("));
            }
        }
    }

    #[test]
    fn test_lock_chance_rolls_locked_bricks() {
        let locked = Tuning {
            lock_chance: 1.0,
            ..Tuning::default()
        };
        let mut fx = Fixture::new(locked, 3);
        let mut spawner = Spawner::new(&fx.tuning);
        let mut bricks = Vec::new();
        spawner.spawn_wave(&mut bricks, &mut fx.env());
        assert!(bricks.iter().all(|b| b.is_locked()));
        assert!(bricks.iter().all(|b| b.lock.as_ref().is_some_and(|l| l.tag.is_none())));

        let open = Tuning {
            lock_chance: 0.0,
            ..Tuning::default()
        };
        let mut fx = Fixture::new(open, 3);
        let mut bricks = Vec::new();
        spawner.spawn_wave(&mut bricks, &mut fx.env());
        assert!(bricks.iter().all(|b| !b.is_locked()));
    }

    #[test]
    fn test_first_update_spawns_a_wave() {
        let mut fx = Fixture::new(Tuning::default(), 1);
        let mut spawner = Spawner::new(&fx.tuning);
        let mut bricks = Vec::new();
        spawner.update(&mut bricks, &mut fx.env());
        assert!(!bricks.is_empty());
        let before = bricks.len();
        spawner.update(&mut bricks, &mut fx.env());
        assert_eq!(bricks.len(), before);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let layout = |seed| {
            let mut fx = Fixture::new(Tuning::default(), seed);
            let mut spawner = Spawner::new(&fx.tuning);
            let mut bricks = Vec::new();
            for _ in 0..5 {
                spawner.spawn_wave(&mut bricks, &mut fx.env());
            }
            bricks
                .iter()
                .map(|b| (b.rect.x, b.health, b.color.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(77), layout(77));
    }

    #[test]
    fn test_boss_suspends_waves_until_defeated() {
        let tuning = Tuning {
            boss_base_threshold: 3,
            boss_min_threshold: 1,
            ..Tuning::default()
        };
        let mut fx = Fixture::new(tuning, 5);
        let mut spawner = Spawner::new(&fx.tuning);
        let mut bricks = Vec::new();

        for _ in 0..3 {
            spawner.update(&mut bricks, &mut fx.env());
        }
        let boss_id = spawner.boss.expect("boss due after three ticks");
        let count = bricks.len();
        for _ in 0..500 {
            spawner.update(&mut bricks, &mut fx.env());
        }
        assert_eq!(bricks.len(), count);

        bricks.iter_mut().find(|b| b.id == boss_id).unwrap().marked_for_removal = true;
        spawner.update(&mut bricks, &mut fx.env());
        assert!(!spawner.boss_active());
        assert_eq!(spawner.grace, fx.tuning.boss_grace_ticks - 1);
        assert!(bricks.len() > count);
    }

    #[test]
    fn test_summon_arms_boss() {
        let mut fx = Fixture::new(Tuning::default(), 9);
        let mut spawner = Spawner::new(&fx.tuning);
        let mut bricks = Vec::new();
        let boss_id = spawner.spawn_boss(&mut bricks, &mut fx.env());
        spawner.summon_armor(boss_id, &mut bricks, &mut fx.env());

        let boss = bricks.iter().find(|b| b.id == boss_id).unwrap();
        assert!(boss.is_immune());
        assert_eq!(boss.boss.as_ref().unwrap().armor.len(), fx.tuning.armor_batch);
        assert!(
            bricks
                .iter()
                .filter(|b| b.id != boss_id)
                .all(|b| b.summoner == Some(boss_id))
        );
    }
}
