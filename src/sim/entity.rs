//! Spawnable tunnel entities
//!
//! Entities are validated once when built, so the per-tick systems can work
//! on plain typed data.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::is_finite_vec;

/// Entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Hazard-A
    Germ,
    /// Hazard-B
    Dust,
    /// Collectible that opens a quiz
    Knowledge,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Germ, EntityKind::Dust, EntityKind::Knowledge];

    /// Hazards in collision priority order
    pub const HAZARDS: [EntityKind; 2] = [EntityKind::Germ, EntityKind::Dust];

    pub fn is_hazard(self) -> bool {
        !matches!(self, EntityKind::Knowledge)
    }

    /// Prefix used for generated ids
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Germ => "germ",
            EntityKind::Dust => "dust",
            EntityKind::Knowledge => "ko",
        }
    }
}

/// Rejected entity parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("entity position is not finite")]
    Position,
    #[error("entity target is not finite")]
    Target,
    #[error("entity speed must be finite and non-negative, got {0}")]
    Speed(f32),
    #[error("entity size must be finite and positive, got {0}")]
    Size(f32),
    #[error("entity lifetime must be finite and positive, got {0}")]
    Lifetime(f32),
}

/// Movement rule for an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Advance along +Z at `speed` units per second
    Axis { speed: f32 },
    /// Step toward `target` at `speed` units per second
    Seek { target: Vec3, speed: f32 },
}

impl Motion {
    pub fn speed(&self) -> f32 {
        match *self {
            Motion::Axis { speed } | Motion::Seek { speed, .. } => speed,
        }
    }
}

/// A hazard or collectible moving down the tunnel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub position: Vec3,
    pub motion: Motion,
    /// Diameter
    pub size: f32,
    /// Seconds since spawn
    pub time_alive: f32,
    pub max_lifetime: f32,
}

impl Entity {
    pub fn new(
        id: String,
        kind: EntityKind,
        position: Vec3,
        motion: Motion,
        size: f32,
        max_lifetime: f32,
    ) -> Result<Self, EntityError> {
        if !is_finite_vec(position) {
            return Err(EntityError::Position);
        }
        let speed = motion.speed();
        if !(speed.is_finite() && speed >= 0.0) {
            return Err(EntityError::Speed(speed));
        }
        if let Motion::Seek { target, .. } = motion {
            if !is_finite_vec(target) {
                return Err(EntityError::Target);
            }
        }
        if !(size.is_finite() && size > 0.0) {
            return Err(EntityError::Size(size));
        }
        if !(max_lifetime.is_finite() && max_lifetime > 0.0) {
            return Err(EntityError::Lifetime(max_lifetime));
        }
        Ok(Self {
            id,
            kind,
            position,
            motion,
            size,
            time_alive: 0.0,
            max_lifetime,
        })
    }

    /// Collision radius
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }

    /// Instantaneous velocity implied by the motion rule
    pub fn velocity(&self) -> Vec3 {
        match self.motion {
            Motion::Axis { speed } => Vec3::Z * speed,
            Motion::Seek { target, speed } => (target - self.position).normalize_or_zero() * speed,
        }
    }

    /// Advance position and age by `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        match self.motion {
            Motion::Axis { speed } => {
                self.position.z += speed * dt;
            }
            Motion::Seek { target, speed } => {
                let to_target = target - self.position;
                let dist = to_target.length();
                let step = speed * dt;
                if step >= dist {
                    self.position = target;
                } else {
                    self.position += to_target / dist * step;
                }
            }
        }
        self.time_alive += dt;
    }

    pub fn is_expired(&self) -> bool {
        self.time_alive >= self.max_lifetime
    }

    /// Checked before any per-entity work
    pub fn is_well_formed(&self) -> bool {
        is_finite_vec(self.position) && self.size.is_finite() && self.size > 0.0
    }
}
