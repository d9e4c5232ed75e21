//! Game session state and core simulation types
//!
//! A single `GameSession` holds everything one run needs. It is passed by
//! `&mut` into the tick and the controller; collaborators only read it.

use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::CollisionDetector;
use super::entity::{Entity, EntityKind};
use super::spawner::Spawner;
use super::timers::{Scheduler, TaskId};
use crate::questions::{QuestionBank, QuestionError};
use crate::tuning::{Tuning, TuningError};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for assets and question data
    Loading,
    /// Instructions screen (first session only)
    Instructions,
    /// Active gameplay
    Playing,
    /// Quiz open, simulation frozen
    QuestionPaused,
    /// Run lost
    GameOver,
    /// Run won
    Won,
}

impl GamePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Won)
    }
}

/// The player's sphere
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    /// Sampled from the input collaborator every tick
    pub position: Vec3,
    /// Derived from consecutive position samples
    pub velocity: Vec3,
    pub radius: f32,
    pub is_invincible: bool,
    /// Session clock time the current invincibility ends
    pub invincibility_expires_at: Option<f64>,
    pub lives: u32,
}

impl PlayerState {
    pub fn new(position: Vec3, radius: f32, lives: u32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
            is_invincible: false,
            invincibility_expires_at: None,
            lives,
        }
    }

    /// Lose one life. Returns the remaining count.
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }
}

/// End-of-run summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreData {
    /// Seconds spent playing
    pub time: f32,
    /// Unique questions answered correctly
    pub questions: usize,
    pub lives: u32,
}

/// Why a life was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    Hazard(EntityKind),
    WrongAnswer,
    QuestionDismissed,
}

/// Things that happened during a tick or controller call, for the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { from: GamePhase, to: GamePhase },
    /// Hazard contact that cost a life
    HazardHit { kind: EntityKind, id: String },
    /// Hazard contact absorbed by invincibility
    HazardDeflected { kind: EntityKind, id: String },
    LifeLost { source: DamageSource, remaining: u32 },
    /// Collectible picked up
    Collected { id: String },
    /// Collectible consumed without a quiz (no question data)
    QuizUnavailable { id: String },
    /// Open the quiz for this question
    QuestionPrompted {
        question_id: String,
        prompt: String,
        options: Vec<String>,
    },
    AnswerResolved { question_id: String, correct: bool },
    InvincibilityStarted { until: f64 },
    InvincibilityEnded,
    Won(ScoreData),
    GameOver(ScoreData),
}

/// One running session
#[derive(Debug)]
pub struct GameSession {
    pub(crate) tuning: Tuning,
    pub(crate) seed: u64,
    pub(crate) phase: GamePhase,
    pub(crate) session_id: u32,
    /// Wall-clock seconds, advances in every phase
    pub(crate) clock: f64,
    /// Seconds spent in `Playing`
    pub(crate) elapsed_time: f32,
    pub(crate) player: PlayerState,
    pub(crate) unique_answered_ids: HashSet<String>,

    pub(crate) germs: Spawner,
    pub(crate) dust: Spawner,
    pub(crate) knowledge: Spawner,
    pub(crate) detector: CollisionDetector,
    pub(crate) scheduler: Scheduler,
    pub(crate) invincibility_task: Option<TaskId>,

    pub(crate) assets_loaded: bool,
    pub(crate) questions_resolved: bool,
    pub(crate) questions: Option<QuestionBank>,
    pub(crate) question_error: Option<QuestionError>,
    pub(crate) instructions_requested: bool,
    pub(crate) instructions_shown: bool,
    /// Spawner readiness tasks scheduled for this session
    pub(crate) scene_ready: bool,
    pub(crate) pending_question: Option<String>,
    /// Finish line already evaluated this session
    pub(crate) finished: bool,
    pub(crate) score: Option<ScoreData>,
}

impl GameSession {
    /// Start a session in `Loading`. Fails on invalid tuning.
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self, TuningError> {
        tuning.validate()?;
        let session_id = 1;
        let tunnel = tuning.tunnel;
        let player = PlayerState::new(
            Vec3::new(0.0, 0.0, tunnel.out_of_bounds_z),
            tuning.player_radius,
            tuning.initial_lives,
        );
        Ok(Self {
            germs: Spawner::new(tuning.germs.clone(), tunnel, seed, session_id)?,
            dust: Spawner::new(tuning.dust.clone(), tunnel, seed, session_id)?,
            knowledge: Spawner::new(tuning.knowledge.clone(), tunnel, seed, session_id)?,
            detector: CollisionDetector::new(
                tuning.collision_cooldown_secs(),
                tuning.continuous_collision,
            ),
            scheduler: Scheduler::new(),
            invincibility_task: None,
            seed,
            phase: GamePhase::Loading,
            session_id,
            clock: 0.0,
            elapsed_time: 0.0,
            player,
            unique_answered_ids: HashSet::new(),
            assets_loaded: false,
            questions_resolved: false,
            questions: None,
            question_error: None,
            instructions_requested: tuning.show_instructions,
            instructions_shown: false,
            scene_ready: false,
            pending_question: None,
            finished: false,
            score: None,
            tuning,
        })
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn lives(&self) -> u32 {
        self.player.lives
    }

    pub fn is_invincible(&self) -> bool {
        self.player.is_invincible
    }

    pub fn unique_answered_ids(&self) -> &HashSet<String> {
        &self.unique_answered_ids
    }

    /// Correct answers still needed to win
    pub fn answers_remaining(&self) -> usize {
        self.tuning
            .win_threshold
            .saturating_sub(self.unique_answered_ids.len())
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.pending_question.as_deref()
    }

    /// Set when question data failed to load
    pub fn question_error(&self) -> Option<&QuestionError> {
        self.question_error.as_ref()
    }

    pub fn questions(&self) -> Option<&QuestionBank> {
        self.questions.as_ref()
    }

    /// Final score once the run has ended
    pub fn score(&self) -> Option<ScoreData> {
        self.score
    }

    /// Number of timers still pending
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    pub fn spawner(&self, kind: EntityKind) -> &Spawner {
        match kind {
            EntityKind::Germ => &self.germs,
            EntityKind::Dust => &self.dust,
            EntityKind::Knowledge => &self.knowledge,
        }
    }

    pub(crate) fn spawner_mut(&mut self, kind: EntityKind) -> &mut Spawner {
        match kind {
            EntityKind::Germ => &mut self.germs,
            EntityKind::Dust => &mut self.dust,
            EntityKind::Knowledge => &mut self.knowledge,
        }
    }

    /// All live entities, hazards first in priority order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.germs
            .entities()
            .iter()
            .chain(self.dust.entities())
            .chain(self.knowledge.entities())
    }

    pub(crate) fn score_data(&self) -> ScoreData {
        ScoreData {
            time: self.elapsed_time,
            questions: self.unique_answered_ids.len(),
            lives: self.player.lives,
        }
    }
}
