//! Tunnel Run - entity simulation and collision core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (time-of-impact solver, collision
//!   detection, entity lifecycle, game state controller)
//! - `questions`: Quiz question bank (loading, selection, grading)
//! - `tuning`: Data-driven game balance
//!
//! Rendering, audio, UI and raw input live in the host. They read the
//! session each tick and feed it player positions and quiz answers.

pub mod questions;
pub mod sim;
pub mod tuning;

pub use questions::{AnswerSubmission, Question, QuestionBank, QuestionError};
pub use tuning::{Tuning, TuningError};

use glam::Vec3;
use rand::Rng;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Tunnel geometry. Entities travel toward +Z, the player toward -Z.
    pub const TUNNEL_RADIUS: f32 = 6.0;
    pub const SPAWN_Z: f32 = -140.0;
    pub const OUT_OF_BOUNDS_Z: f32 = 160.0;
    /// Keeps spawns away from the tunnel wall
    pub const WALL_MARGIN: f32 = 1.5;
    /// Player reaching this Z ends the run
    pub const FINISH_LINE_Z: f32 = -140.0;

    /// Player sphere
    pub const PLAYER_RADIUS: f32 = 0.5;
    pub const INITIAL_LIVES: u32 = 3;

    /// Minimum gap between reported collisions (shared by all kinds)
    pub const COLLISION_COOLDOWN_MS: u32 = 500;
    /// Invincibility granted by a correct answer
    pub const INVINCIBILITY_SECS: f32 = 2.0;
    /// Unique correct answers needed to win at the finish line
    pub const WIN_THRESHOLD: usize = 5;
}

/// Sample a point uniformly inside a disk of the given radius, in the XY plane
#[inline]
pub fn random_in_disk<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> (f32, f32) {
    use std::f32::consts::TAU;
    let radius = radius.max(0.0);
    let angle = rng.random::<f32>() * TAU;
    // sqrt of a uniform sample gives uniform density per unit area
    let r = radius * rng.random::<f32>().sqrt();
    (r * angle.cos(), r * angle.sin())
}

/// True when every component is finite
#[inline]
pub fn is_finite_vec(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
