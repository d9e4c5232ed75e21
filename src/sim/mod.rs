//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (oldest entity first, hazards before collectibles)
//! - No rendering or platform dependencies

pub mod ccd;
pub mod collision;
pub mod controller;
pub mod entity;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod timers;

pub use ccd::{MovingSphere, contact_positions, first_hit_time, solve, will_collide};
pub use collision::{CollisionDetector, CollisionEvent};
pub use controller::SessionError;
pub use entity::{Entity, EntityError, EntityKind, Motion};
pub use spawner::{Readiness, Spawner};
pub use state::{DamageSource, GameEvent, GamePhase, GameSession, PlayerState, ScoreData};
pub use tick::{TickInput, tick};
pub use timers::{Scheduler, TaskId, TimerAction};
