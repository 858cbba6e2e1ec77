//! Timed status tags on bricks (burn, freeze, slow, ...)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Burn,
    Poison,
    Bleed,
    Irradiate,
    Freeze,
    Stun,
    Slow,
    Weaken,
    Vulnerable,
    Shock,
    Confuse,
    Corrupt,
    Charge,
    Static,
    Blind,
    Focus,
}

impl StatusKind {
    /// Statuses whose magnitude is damage per second
    pub fn is_damage_over_time(self) -> bool {
        matches!(
            self,
            StatusKind::Burn | StatusKind::Poison | StatusKind::Bleed | StatusKind::Irradiate
        )
    }
}

/// One active tag: ticks left plus a kind-specific magnitude
/// (dps, speed factor, damage multiplier, ...)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub remaining_ticks: u32,
    pub magnitude: f32,
}

/// What a decay pass did to the owning brick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecayOutcome {
    pub damage: f32,
    pub max_health_loss: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    active: BTreeMap<StatusKind, Status>,
}

impl StatusEffects {
    /// Apply a tag. Reapplying a kind replaces it outright.
    pub fn apply(&mut self, kind: StatusKind, remaining_ticks: u32, magnitude: f32) {
        if remaining_ticks == 0 {
            return;
        }
        self.active.insert(
            kind,
            Status {
                remaining_ticks,
                magnitude,
            },
        );
    }

    pub fn get(&self, kind: StatusKind) -> Option<&Status> {
        self.active.get(&kind)
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.active.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatusKind, &Status)> {
        self.active.iter().map(|(k, s)| (*k, s))
    }

    /// Frozen and stunned bricks neither move nor advance their timers
    pub fn is_immobilized(&self) -> bool {
        self.has(StatusKind::Freeze) || self.has(StatusKind::Stun)
    }

    /// Movement speed factor from Slow (1.0 when not slowed)
    pub fn speed_factor(&self) -> f32 {
        self.get(StatusKind::Slow)
            .map_or(1.0, |s| s.magnitude.clamp(0.0, 1.0))
    }

    /// Incoming damage multiplier from Weaken and Vulnerable
    pub fn damage_multiplier(&self) -> f32 {
        [StatusKind::Weaken, StatusKind::Vulnerable]
            .iter()
            .filter_map(|k| self.get(*k))
            .map(|s| s.magnitude.max(0.0))
            .product()
    }

    /// Advance every tag by one tick, accumulating damage over time and
    /// dropping tags that run out
    pub fn decay(&mut self, dt: f32) -> DecayOutcome {
        let mut outcome = DecayOutcome::default();
        for (kind, status) in self.active.iter_mut() {
            if kind.is_damage_over_time() {
                outcome.damage += status.magnitude * dt;
            } else if *kind == StatusKind::Corrupt {
                outcome.max_health_loss += status.magnitude * dt;
            }
            status.remaining_ticks = status.remaining_ticks.saturating_sub(1);
        }
        self.active.retain(|_, s| s.remaining_ticks > 0);
        outcome
    }
}
