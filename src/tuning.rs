//! Data-driven game balance
//!
//! Every constant the simulation reads lives here so a host can ship a
//! JSON override without rebuilding. Missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::entity::EntityKind;

/// Errors raised while loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{kind:?} spawner: {reason}")]
    Spawner { kind: EntityKind, reason: String },
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Inclusive `[min, max]` range used for random sampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Degenerate span that always samples `value`
    pub const fn fixed(value: f32) -> Self {
        Self { min: value, max: value }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// How spawned entities travel down the tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionStyle {
    /// Straight down the travel axis
    Axis,
    /// Toward a random point on the out-of-bounds plane
    Seek,
}

/// Per-kind configuration for an entity lifecycle manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerConfig {
    pub kind: EntityKind,
    /// Maximum live entities
    pub capacity: usize,
    /// Seconds between spawns
    pub spawn_interval: f32,
    /// Seconds after the scene is ready before the first spawn
    pub initial_delay: f32,
    /// Units per second
    pub speed: Span,
    /// Diameter
    pub size: Span,
    /// Seconds before forced removal
    pub lifetime: Span,
    pub motion: MotionStyle,
}

impl SpawnerConfig {
    /// Defaults for a kind
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Germ => Self {
                kind,
                capacity: 8,
                spawn_interval: 2.0,
                initial_delay: 1.5,
                speed: Span::new(0.5, 1.5),
                size: Span::new(1.0, 1.5),
                lifetime: Span::new(12.0, 20.0),
                motion: MotionStyle::Seek,
            },
            EntityKind::Dust => Self {
                kind,
                capacity: 6,
                spawn_interval: 3.0,
                initial_delay: 1.5,
                speed: Span::new(0.5, 1.5),
                size: Span::new(0.7, 1.1),
                lifetime: Span::new(12.0, 20.0),
                motion: MotionStyle::Seek,
            },
            EntityKind::Knowledge => {
                let speed = 13.0;
                // A bit more than the time needed to cross the whole tunnel
                let travel = (OUT_OF_BOUNDS_Z - SPAWN_Z) / speed * 1.2;
                Self {
                    kind,
                    capacity: 7,
                    spawn_interval: 5.0,
                    initial_delay: 2.0,
                    speed: Span::fixed(speed),
                    size: Span::fixed(1.5),
                    lifetime: Span::fixed(travel),
                    motion: MotionStyle::Axis,
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        let fail = |reason: &str| {
            Err(TuningError::Spawner {
                kind: self.kind,
                reason: reason.to_string(),
            })
        };
        if self.capacity == 0 {
            return fail("capacity must be at least 1");
        }
        if !(self.spawn_interval.is_finite() && self.spawn_interval > 0.0) {
            return fail("spawn_interval must be positive");
        }
        if !(self.initial_delay.is_finite() && self.initial_delay >= 0.0) {
            return fail("initial_delay must be non-negative");
        }
        if !self.speed.is_valid() || self.speed.min < 0.0 {
            return fail("speed range must be ordered and non-negative");
        }
        if !self.size.is_valid() || self.size.min <= 0.0 {
            return fail("size range must be ordered and positive");
        }
        if !self.lifetime.is_valid() || self.lifetime.min <= 0.0 {
            return fail("lifetime range must be ordered and positive");
        }
        Ok(())
    }
}

/// Tunnel geometry shared by every spawner
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelGeometry {
    pub radius: f32,
    pub wall_margin: f32,
    /// Far end where entities appear
    pub spawn_z: f32,
    /// Entities at or past this Z are removed
    pub out_of_bounds_z: f32,
    /// Player at or past this Z (toward -Z) has finished
    pub finish_line_z: f32,
}

impl Default for TunnelGeometry {
    fn default() -> Self {
        Self {
            radius: TUNNEL_RADIUS,
            wall_margin: WALL_MARGIN,
            spawn_z: SPAWN_Z,
            out_of_bounds_z: OUT_OF_BOUNDS_Z,
            finish_line_z: FINISH_LINE_Z,
        }
    }
}

impl TunnelGeometry {
    /// Radius of the disk spawns are sampled from
    pub fn spawn_radius(&self) -> f32 {
        (self.radius - self.wall_margin).max(0.0)
    }
}

/// Complete balance table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub tunnel: TunnelGeometry,
    /// Hazard-A
    pub germs: SpawnerConfig,
    /// Hazard-B
    pub dust: SpawnerConfig,
    /// Collectibles
    pub knowledge: SpawnerConfig,

    pub player_radius: f32,
    pub initial_lives: u32,
    pub collision_cooldown_ms: u32,
    /// Re-test discrete misses with the swept solver
    pub continuous_collision: bool,
    pub invincibility_secs: f32,
    pub win_threshold: usize,
    /// Show the instructions screen on the first session
    pub show_instructions: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tunnel: TunnelGeometry::default(),
            germs: SpawnerConfig::for_kind(EntityKind::Germ),
            dust: SpawnerConfig::for_kind(EntityKind::Dust),
            knowledge: SpawnerConfig::for_kind(EntityKind::Knowledge),

            player_radius: PLAYER_RADIUS,
            initial_lives: INITIAL_LIVES,
            collision_cooldown_ms: COLLISION_COOLDOWN_MS,
            continuous_collision: false,
            invincibility_secs: INVINCIBILITY_SECS,
            win_threshold: WIN_THRESHOLD,
            show_instructions: true,
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Spawner config for a kind
    pub fn spawner(&self, kind: EntityKind) -> &SpawnerConfig {
        match kind {
            EntityKind::Germ => &self.germs,
            EntityKind::Dust => &self.dust,
            EntityKind::Knowledge => &self.knowledge,
        }
    }

    /// Cooldown in seconds
    pub fn collision_cooldown_secs(&self) -> f64 {
        self.collision_cooldown_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        for kind in EntityKind::ALL {
            let config = self.spawner(kind);
            if config.kind != kind {
                return Err(TuningError::Spawner {
                    kind,
                    reason: format!("slot holds a {:?} config", config.kind),
                });
            }
            config.validate()?;
        }

        let t = &self.tunnel;
        if !(t.radius.is_finite() && t.radius > 0.0) {
            return Err(invalid("tunnel.radius", "must be positive"));
        }
        if !(t.wall_margin.is_finite() && t.wall_margin >= 0.0 && t.wall_margin < t.radius) {
            return Err(invalid("tunnel.wall_margin", "must be in [0, radius)"));
        }
        if !(t.spawn_z.is_finite()
            && t.out_of_bounds_z.is_finite()
            && t.spawn_z < t.out_of_bounds_z)
        {
            return Err(invalid("tunnel.spawn_z", "must be finite and below out_of_bounds_z"));
        }
        if !t.finish_line_z.is_finite() {
            return Err(invalid("tunnel.finish_line_z", "must be finite"));
        }
        if !(self.player_radius.is_finite() && self.player_radius > 0.0) {
            return Err(invalid("player_radius", "must be positive"));
        }
        if self.initial_lives == 0 {
            return Err(invalid("initial_lives", "must be at least 1"));
        }
        if !(self.invincibility_secs.is_finite() && self.invincibility_secs >= 0.0) {
            return Err(invalid("invincibility_secs", "must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> TuningError {
    TuningError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn test_knowledge_lifetime_outlasts_travel() {
        let config = SpawnerConfig::for_kind(EntityKind::Knowledge);
        let travel = (OUT_OF_BOUNDS_Z - SPAWN_Z) / config.speed.min;
        assert!(config.lifetime.min > travel);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "initial_lives": 5, "win_threshold": 2 }"#).unwrap();
        assert_eq!(tuning.initial_lives, 5);
        assert_eq!(tuning.win_threshold, 2);
        assert_eq!(tuning.germs.capacity, 8);
        assert_eq!(tuning.collision_cooldown_ms, 500);
    }

    #[test]
    fn test_json_round_trip_keeps_spawner_overrides() {
        let mut tuning = Tuning::default();
        tuning.dust.capacity = 2;
        tuning.dust.motion = MotionStyle::Axis;
        let json = tuning.to_json().unwrap();
        let loaded = Tuning::from_json(&json).unwrap();
        assert_eq!(loaded.dust.capacity, 2);
        assert_eq!(loaded.dust.motion, MotionStyle::Axis);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut tuning = Tuning::default();
        tuning.germs.capacity = 0;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::Spawner {
                kind: EntityKind::Germ,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut tuning = Tuning::default();
        tuning.knowledge.size = Span::new(2.0, 1.0);
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_rejects_mismatched_slot() {
        let mut tuning = Tuning::default();
        tuning.dust = SpawnerConfig::for_kind(EntityKind::Germ);
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_lives() {
        let json = r#"{ "initial_lives": 0 }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(TuningError::Invalid {
                field: "initial_lives",
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(TuningError::Parse(_))
        ));
    }
}
