//! Fixed timestep simulation tick
//!
//! Advances one session deterministically: clock and timers first, then
//! (only while `Playing`) player sampling, spawners, collision and the
//! finish line.

use glam::Vec3;

use super::entity::EntityKind;
use super::state::{GameEvent, GamePhase, GameSession};
use super::timers::TimerAction;
use crate::is_finite_vec;

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Player position from the input collaborator; `None` keeps the last one
    pub player_position: Option<Vec3>,
}

/// Advance the session by one timestep and return what happened
pub fn tick(session: &mut GameSession, input: &TickInput, dt: f32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if !(dt.is_finite() && dt >= 0.0) {
        log::warn!("Ignoring tick with bad dt {}", dt);
        return events;
    }

    session.clock += dt as f64;

    // Timers fire in every phase
    for action in session.scheduler.poll(session.clock, session.session_id) {
        match action {
            TimerAction::SpawnerReady(kind) => session.spawner_mut(kind).mark_ready(),
            TimerAction::InvincibilityExpired => session.expire_invincibility(&mut events),
        }
    }

    // Everything below is frozen outside Playing
    if session.phase != GamePhase::Playing {
        return events;
    }
    session.elapsed_time += dt;

    // Sample player
    if let Some(position) = input.player_position {
        if is_finite_vec(position) {
            session.player.velocity = if dt > 0.0 {
                (position - session.player.position) / dt
            } else {
                Vec3::ZERO
            };
            session.player.position = position;
        } else {
            log::warn!("Ignoring non-finite player position {:?}", position);
        }
    }

    // Move, expire, spawn
    for kind in EntityKind::ALL {
        session.spawner_mut(kind).update(dt);
    }

    // Collide
    let hit = session.detector.detect(
        &session.player,
        &[session.germs.entities(), session.dust.entities()],
        session.knowledge.entities(),
        session.clock,
        dt,
    );
    if let Some(hit) = hit {
        session.apply_collision(hit, &mut events);
    }

    session.check_finish_line(&mut events);
    events
}
