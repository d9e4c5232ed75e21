//! Player-vs-entity collision detection
//!
//! Runs once per `Playing` tick. Hazards are scanned in priority order
//! (germs, then dust; oldest first inside each collection) and the first
//! contact wins. Collectibles are only checked when no hazard was hit. Any
//! reported event starts a single global cooldown shared by every kind, so
//! at most one event comes out per tick and near-simultaneous contacts
//! collapse into one.

use serde::{Deserialize, Serialize};

use super::ccd::{MovingSphere, first_hit_time};
use super::entity::{Entity, EntityKind};
use super::state::PlayerState;
use crate::is_finite_vec;

/// A contact worth reporting to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionEvent {
    /// Player touched a hazard
    Hazard { kind: EntityKind, id: String },
    /// Player touched a collectible
    Collected { id: String },
}

impl CollisionEvent {
    pub fn id(&self) -> &str {
        match self {
            CollisionEvent::Hazard { id, .. } | CollisionEvent::Collected { id } => id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            CollisionEvent::Hazard { kind, .. } => *kind,
            CollisionEvent::Collected { .. } => EntityKind::Knowledge,
        }
    }
}

/// Discrete sphere-overlap detector with a global cooldown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionDetector {
    /// Seconds between reported events
    cooldown: f64,
    /// Clock time of the last reported event
    last_report_at: Option<f64>,
    /// Re-test discrete misses with the swept solver over the last tick
    continuous: bool,
}

impl CollisionDetector {
    pub fn new(cooldown_secs: f64, continuous: bool) -> Self {
        Self {
            cooldown: cooldown_secs.max(0.0),
            last_report_at: None,
            continuous,
        }
    }

    pub fn reset(&mut self) {
        self.last_report_at = None;
    }

    pub fn last_report_at(&self) -> Option<f64> {
        self.last_report_at
    }

    pub fn in_cooldown(&self, now: f64) -> bool {
        self.last_report_at.is_some_and(|last| now - last < self.cooldown)
    }

    /// Test the player against every entity and report at most one contact
    ///
    /// `hazards` must be given in priority order. `dt` is the length of the
    /// tick just simulated (only used in continuous mode).
    pub fn detect(
        &mut self,
        player: &PlayerState,
        hazards: &[&[Entity]],
        collectibles: &[Entity],
        now: f64,
        dt: f32,
    ) -> Option<CollisionEvent> {
        if self.in_cooldown(now) {
            return None;
        }
        if !is_finite_vec(player.position) {
            log::warn!("Skipping collision check: player position {:?}", player.position);
            return None;
        }

        let sweep = self.continuous.then_some(dt);

        let hit = hazards
            .iter()
            .flat_map(|list| list.iter())
            .find(|e| touches(player, e, sweep))
            .map(|e| CollisionEvent::Hazard {
                kind: e.kind,
                id: e.id.clone(),
            })
            .or_else(|| {
                collectibles
                    .iter()
                    .find(|e| touches(player, e, sweep))
                    .map(|e| CollisionEvent::Collected { id: e.id.clone() })
            })?;

        log::info!("Collision: {:?} at t={:.3}", hit, now);
        self.last_report_at = Some(now);
        Some(hit)
    }
}

/// Overlap test, optionally backed by a swept test over the last `dt`
fn touches(player: &PlayerState, entity: &Entity, sweep: Option<f32>) -> bool {
    if !entity.is_well_formed() {
        log::warn!("Skipping malformed entity {} in collision check", entity.id);
        return false;
    }

    let combined = player.radius + entity.radius();
    if player.position.distance(entity.position) < combined {
        return true;
    }

    let Some(dt) = sweep.filter(|dt| *dt > 0.0) else {
        return false;
    };
    // Rewind both spheres to the start of the tick and sweep forward
    let entity_vel = entity.velocity();
    let a = MovingSphere::new(
        player.position - player.velocity * dt,
        player.velocity,
        player.radius,
    );
    let b = MovingSphere::new(entity.position - entity_vel * dt, entity_vel, entity.radius());
    first_hit_time(&a, &b, dt).is_some()
}
