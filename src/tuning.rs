//! Game balance knobs
//!
//! Every field has a default, so a tuning file only needs to name what it
//! changes. Frame-counted values are in 60 Hz ticks, speeds in px/s.

use std::path::Path;

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Brick grid ===
    pub brick_width: f32,
    pub brick_height: f32,
    pub columns: usize,
    pub column_spacing: f32,
    /// Milliseconds between normal waves
    pub wave_interval_ms: f32,
    pub min_wave_size: usize,
    pub max_wave_size: usize,
    pub min_brick_health: f32,
    pub max_brick_health: f32,
    pub hue_min: f32,
    pub hue_max: f32,
    pub lightness_min: f32,
    pub lightness_max: f32,
    /// Chance a wave brick arrives locked and needs one opening hit
    pub lock_chance: f64,

    // === Brick lifecycle ===
    pub fall_speed: f32,
    /// Fall speed gain per level above 1 (multiplicative)
    pub fall_speed_per_level: f32,
    /// Danger line as a fraction of arena height
    pub danger_line: f32,
    pub charge_ticks: u32,
    pub charge_rise_speed: f32,
    pub rush_acceleration: f32,
    pub rush_damage: f32,

    // === Ball ===
    pub ball_radius: f32,
    pub ball_speed: f32,
    pub return_speed: f32,
    pub capture_radius: f32,
    /// Vertical speed kept when a ball hits the floor and turns back
    pub floor_bounce_factor: f32,
    pub hit_cooldown_ticks: u32,
    /// Max random rotation applied to each bounce (radians)
    pub bounce_jitter: f32,
    pub separation: f32,
    /// Relaunch automatically whenever no player ball is in flight
    pub auto_shoot: bool,

    // === Boss ===
    pub boss_base_threshold: u32,
    pub boss_threshold_per_level: u32,
    pub boss_min_threshold: u32,
    pub boss_grace_ticks: u32,
    pub boss_base_health: f32,
    pub boss_health_per_level: f32,
    pub boss_columns: usize,
    pub boss_height: f32,
    pub boss_drop_speed: f32,
    pub boss_rest_y: f32,
    pub armor_batch: usize,
    pub armor_health: f32,
    pub summon_threshold: u32,
    pub telegraph_ticks: u32,

    // === Progression ===
    pub boss_xp: u32,
    pub xp_per_level: u32,
    pub loot_chance: f64,
    pub player_max_health: f32,

    // === Simulation ===
    pub max_dt: f32,
    pub max_substeps: u32,
    pub min_progress: f32,
    pub min_remaining: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            brick_width: 70.0,
            brick_height: 30.0,
            columns: 8,
            column_spacing: 8.0,
            wave_interval_ms: 1400.0,
            min_wave_size: 1,
            max_wave_size: 3,
            min_brick_health: 40.0,
            max_brick_health: 100.0,
            hue_min: 265.0,
            hue_max: 285.0,
            lightness_min: 45.0,
            lightness_max: 53.0,
            lock_chance: 0.08,

            fall_speed: 36.0,
            fall_speed_per_level: 0.05,
            danger_line: 0.75,
            charge_ticks: 90,
            charge_rise_speed: 24.0,
            rush_acceleration: 1500.0,
            rush_damage: 10.0,

            ball_radius: 8.0,
            ball_speed: 420.0,
            return_speed: 780.0,
            capture_radius: 10.0,
            floor_bounce_factor: 0.8,
            hit_cooldown_ticks: 2,
            bounce_jitter: 0.05,
            separation: 0.5,
            auto_shoot: false,

            boss_base_threshold: 3600,
            boss_threshold_per_level: 300,
            boss_min_threshold: 1200,
            boss_grace_ticks: 600,
            boss_base_health: 800.0,
            boss_health_per_level: 200.0,
            boss_columns: 3,
            boss_height: 60.0,
            boss_drop_speed: 60.0,
            boss_rest_y: 70.0,
            armor_batch: 4,
            armor_health: 60.0,
            summon_threshold: 360,
            telegraph_ticks: 45,

            boss_xp: 250,
            xp_per_level: 100,
            loot_chance: 0.1,
            player_max_health: 100.0,

            max_dt: 1.0 / 20.0,
            max_substeps: 32,
            min_progress: 1e-3,
            min_remaining: 1e-6,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON tuning document
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let tuning: Tuning = serde_json::from_str(json).context("malformed tuning JSON")?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tuning file {}", path.display()))?;
        let tuning = Self::from_json(&json)
            .with_context(|| format!("invalid tuning file {}", path.display()))?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.columns > 0, "columns must be positive");
        ensure!(
            self.min_wave_size >= 1 && self.min_wave_size <= self.max_wave_size,
            "wave size range {}..={} is empty",
            self.min_wave_size,
            self.max_wave_size
        );
        ensure!(
            self.max_wave_size <= self.columns,
            "max_wave_size {} exceeds column count {}",
            self.max_wave_size,
            self.columns
        );
        ensure!(
            self.boss_columns >= 1 && self.boss_columns <= self.columns,
            "boss_columns must fit the grid"
        );
        ensure!(
            self.min_brick_health > 0.0 && self.min_brick_health < self.max_brick_health,
            "brick health range must be positive and non-empty"
        );
        ensure!(
            self.ball_speed > 0.0 && self.return_speed > 0.0,
            "ball speeds must be positive"
        );
        ensure!(self.ball_radius > 0.0, "ball_radius must be positive");
        ensure!(
            (0.0..=0.5).contains(&self.bounce_jitter),
            "bounce_jitter must be within [0, 0.5] radians"
        );
        ensure!(
            self.danger_line > 0.0 && self.danger_line < 1.0,
            "danger_line is a fraction of arena height"
        );
        ensure!(self.max_dt > 0.0, "max_dt must be positive");
        ensure!(self.max_substeps > 0, "max_substeps must be positive");
        ensure!(
            self.min_progress > 0.0 && self.min_progress < 1.0,
            "min_progress must be within (0, 1)"
        );
        ensure!(
            (0.0..=1.0).contains(&self.loot_chance),
            "loot_chance is a probability"
        );
        ensure!(
            (0.0..=1.0).contains(&self.lock_chance),
            "lock_chance is a probability"
        );
        Ok(())
    }

    /// Brick fall speed at a given progression level
    pub fn fall_speed_at(&self, level: u32) -> f32 {
        self.fall_speed * (1.0 + self.fall_speed_per_level * level.saturating_sub(1) as f32)
    }

    /// Ticks without a boss before one is summoned
    pub fn boss_threshold_at(&self, level: u32) -> u32 {
        self.boss_base_threshold
            .saturating_sub(self.boss_threshold_per_level * level.saturating_sub(1))
            .max(self.boss_min_threshold)
    }

    pub fn boss_health_at(&self, level: u32) -> f32 {
        self.boss_base_health + self.boss_health_per_level * level as f32
    }

    /// XP needed to go from `level` to `level + 1`
    pub fn xp_to_next(&self, level: u32) -> u32 {
        self.xp_per_level * level.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "columns": 10, "auto_shoot": true }"#).unwrap();
        assert_eq!(tuning.columns, 10);
        assert!(tuning.auto_shoot);
        assert_eq!(tuning.brick_width, Tuning::default().brick_width);
    }

    #[test]
    fn test_invalid_wave_range_rejected() {
        let err = Tuning::from_json(r#"{ "min_wave_size": 4, "max_wave_size": 2 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("wave size"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(Tuning::from_json("{ columns: }").is_err());
    }

    #[test]
    fn test_boss_threshold_floors() {
        let tuning = Tuning::default();
        assert_eq!(tuning.boss_threshold_at(1), 3600);
        assert_eq!(tuning.boss_threshold_at(3), 3000);
        assert_eq!(tuning.boss_threshold_at(50), tuning.boss_min_threshold);
    }

    #[test]
    fn test_fall_speed_scales_with_level() {
        let tuning = Tuning::default();
        assert_eq!(tuning.fall_speed_at(1), tuning.fall_speed);
        assert!(tuning.fall_speed_at(5) > tuning.fall_speed_at(2));
    }
}
