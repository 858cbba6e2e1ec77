//! Ball kinds the player can launch
//!
//! The built-in table ships as JSON inside the crate. Each kind lists
//! explicit effects plus element flags; `effect_names` folds both into the
//! list a launched ball carries.

use std::path::Path;

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};

use crate::sim::{BallStats, EffectOverrides};

const BUILTIN_BALLS: &str = include_str!("../assets/balls.json");

/// Raw stat block of a catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KindStats {
    pub damage: i32,
    pub burn: bool,
    pub freeze: bool,
    pub shock: bool,
    pub poison: bool,
    pub slow: bool,
    pub heal: bool,
    pub knockback: f32,
    pub pierce: i32,
    pub area_effect: bool,
    /// Status duration in seconds
    pub duration: f32,
}

impl Default for KindStats {
    fn default() -> Self {
        Self {
            damage: 25,
            burn: false,
            freeze: false,
            shock: false,
            poison: false,
            slow: false,
            heal: false,
            knockback: 5.0,
            pierce: 1,
            area_effect: false,
            duration: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallKind {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ability: String,
    /// Visual tag handed to the renderer untouched
    #[serde(default)]
    pub gradient: String,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub stats: KindStats,
}

impl Default for BallKind {
    fn default() -> Self {
        Self {
            name: "StarterBall".to_string(),
            description: "A simple, balanced orb.".to_string(),
            ability: "Bounce".to_string(),
            gradient: String::new(),
            effects: Vec::new(),
            tags: Vec::new(),
            stats: KindStats::default(),
        }
    }
}

impl BallKind {
    /// Explicit effects followed by one effect per element flag
    pub fn effect_names(&self) -> Vec<String> {
        let s = &self.stats;
        let flags = [
            (s.burn, "Burn"),
            (s.freeze, "Freeze"),
            (s.shock, "Shock"),
            (s.poison, "Poison"),
            (s.slow, "Slow"),
            (s.heal, "Heal"),
            (s.area_effect, "areaOfEffect"),
            (s.knockback > 0.0, "Knockback"),
        ];
        self.effects
            .iter()
            .cloned()
            .chain(
                flags
                    .into_iter()
                    .filter(|(on, _)| *on)
                    .map(|(_, name)| name.to_string()),
            )
            .collect()
    }

    pub fn overrides(&self) -> EffectOverrides {
        EffectOverrides {
            duration: Some(self.stats.duration * crate::consts::TICKS_PER_SECOND),
            force: (self.stats.knockback > 0.0).then_some(self.stats.knockback / 20.0),
            ..EffectOverrides::default()
        }
    }

    pub fn ball_stats(&self) -> BallStats {
        BallStats {
            damage: self.stats.damage,
            knockback: self.stats.knockback,
            pierce: self.stats.pierce,
            ..BallStats::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    kinds: Vec<BallKind>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The table shipped with the crate
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_BALLS).unwrap_or_else(|err| {
            log::warn!("Built-in ball table unreadable ({err:#}), using the starter ball only");
            Self {
                kinds: vec![BallKind::default()],
            }
        })
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let kinds: Vec<BallKind> = serde_json::from_str(json).context("malformed ball table")?;
        ensure!(!kinds.is_empty(), "ball table is empty");
        Ok(Self { kinds })
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ball table {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid ball table {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&BallKind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    pub fn kinds(&self) -> &[BallKind] {
        &self.kinds
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(|k| k.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_parses() {
        let catalog = Catalog::from_json(BUILTIN_BALLS).unwrap();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, ["StarterBall", "TerraBall", "AetherBall", "GaleBall"]);
    }

    #[test]
    fn test_effect_names_expand_flags() {
        let catalog = Catalog::builtin();
        let terra = catalog.get("TerraBall").unwrap();
        assert_eq!(terra.effect_names(), ["Quake", "Slow", "areaOfEffect", "Knockback"]);

        let aether = catalog.get("AetherBall").unwrap();
        assert_eq!(aether.effect_names(), ["Drain", "Heal", "areaOfEffect"]);
    }

    #[test]
    fn test_overrides_follow_stats() {
        let catalog = Catalog::builtin();
        let gale = catalog.get("GaleBall").unwrap();
        let overrides = gale.overrides();
        assert_eq!(overrides.force, Some(1.0));
        assert_eq!(overrides.duration, Some(240.0));
        assert_eq!(gale.ball_stats().damage, 30);

        let aether = catalog.get("AetherBall").unwrap();
        assert_eq!(aether.overrides().force, None);
    }

    #[test]
    fn test_every_catalog_effect_is_registered() {
        let registry = crate::sim::EffectRegistry::builtin();
        for kind in Catalog::builtin().kinds() {
            for name in kind.effect_names() {
                assert!(registry.contains(&name), "{} uses unknown effect {name}", kind.name);
            }
        }
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(Catalog::from_json("[]").is_err());
    }
}
