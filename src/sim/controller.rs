//! Phase transitions and host-facing session commands
//!
//! Everything that moves a `GameSession` between phases lives here. Commands
//! from the host (load completion, instructions, quiz answers, restart) are
//! methods returning the events they produced; the tick calls the
//! crate-private hooks for collisions, timers and the finish line.

use thiserror::Error;

use super::collision::CollisionEvent;
use super::entity::EntityKind;
use super::state::{DamageSource, GameEvent, GamePhase, GameSession, PlayerState};
use super::timers::TimerAction;
use crate::questions::{AnswerSubmission, QuestionBank, QuestionError};

/// Rejected host command. The session is left untouched.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: GamePhase,
    },
    #[error("no question is pending")]
    NoPendingQuestion,
    #[error("answer for `{got}` but `{expected}` is pending")]
    QuestionMismatch { expected: String, got: String },
    #[error(transparent)]
    Question(#[from] QuestionError),
}

impl GameSession {
    /// Host finished loading models and textures
    pub fn assets_loaded(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.assets_loaded {
            log::debug!("Assets already loaded");
            return events;
        }
        self.assets_loaded = true;
        self.try_finish_loading(&mut events);
        events
    }

    /// Host finished loading question data, successfully or not
    ///
    /// A failure is kept for `question_error()`. The run still starts: hazards
    /// keep damaging, collectibles no longer open a quiz.
    pub fn questions_loaded(
        &mut self,
        result: Result<QuestionBank, QuestionError>,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.questions_resolved {
            log::warn!("Question data already resolved, ignoring second load");
            return events;
        }
        self.questions_resolved = true;
        match result {
            Ok(bank) => self.questions = Some(bank),
            Err(err) => {
                log::error!("Question data unavailable: {}", err);
                self.question_error = Some(err);
            }
        }
        self.try_finish_loading(&mut events);
        events
    }

    /// Close the instructions screen and start playing
    pub fn dismiss_instructions(&mut self) -> Result<Vec<GameEvent>, SessionError> {
        self.expect_phase(GamePhase::Instructions, "dismiss instructions")?;
        let mut events = Vec::new();
        self.instructions_shown = true;
        self.set_phase(GamePhase::Loading, &mut events);
        self.try_finish_loading(&mut events);
        Ok(events)
    }

    /// Answer from the quiz collaborator for the pending question
    pub fn resolve_answer(
        &mut self,
        question_id: &str,
        submission: AnswerSubmission,
    ) -> Result<Vec<GameEvent>, SessionError> {
        let pending = self.check_pending(question_id, "answer a question")?;
        let bank = self.questions.as_mut().ok_or(SessionError::NoPendingQuestion)?;
        // Grading errors leave the question open
        let correct = bank.grade(&pending, &submission)?;

        let mut events = Vec::new();
        self.pending_question = None;
        log::info!("Question {} answered, correct={}", pending, correct);
        events.push(GameEvent::AnswerResolved {
            question_id: pending.clone(),
            correct,
        });

        if correct {
            self.unique_answered_ids.insert(pending);
            self.grant_invincibility(&mut events);
            self.set_phase(GamePhase::Playing, &mut events);
        } else if self.damage(DamageSource::WrongAnswer, &mut events) {
            self.set_phase(GamePhase::Playing, &mut events);
        }
        Ok(events)
    }

    /// Quiz closed without an answer. Costs a life like a wrong answer.
    pub fn dismiss_question(&mut self) -> Result<Vec<GameEvent>, SessionError> {
        let pending = self
            .pending_question
            .clone()
            .ok_or(SessionError::NoPendingQuestion)?;
        self.expect_phase(GamePhase::QuestionPaused, "dismiss a question")?;

        let mut events = Vec::new();
        self.pending_question = None;
        if let Some(bank) = self.questions.as_mut() {
            bank.record(&pending, false);
        }
        log::info!("Question {} dismissed", pending);
        events.push(GameEvent::AnswerResolved {
            question_id: pending,
            correct: false,
        });
        if self.damage(DamageSource::QuestionDismissed, &mut events) {
            self.set_phase(GamePhase::Playing, &mut events);
        }
        Ok(events)
    }

    /// Start a fresh run after a win or loss
    pub fn restart(&mut self) -> Result<Vec<GameEvent>, SessionError> {
        if !self.phase.is_terminal() {
            return Err(SessionError::WrongPhase {
                action: "restart",
                phase: self.phase,
            });
        }
        let mut events = Vec::new();

        self.scheduler.cancel_all();
        self.invincibility_task = None;
        self.session_id += 1;
        for kind in EntityKind::ALL {
            let session_id = self.session_id;
            self.spawner_mut(kind).reset(session_id);
        }
        self.detector.reset();
        self.player = PlayerState::new(
            glam::Vec3::new(0.0, 0.0, self.tuning.tunnel.out_of_bounds_z),
            self.tuning.player_radius,
            self.tuning.initial_lives,
        );
        self.unique_answered_ids.clear();
        self.elapsed_time = 0.0;
        self.pending_question = None;
        self.finished = false;
        self.score = None;
        self.scene_ready = false;
        log::info!("Restarting as session {}", self.session_id);

        self.set_phase(GamePhase::Loading, &mut events);
        self.try_finish_loading(&mut events);
        Ok(events)
    }

    /// Cancel outstanding timers and drop live entities
    pub fn teardown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.invincibility_task = None;
        for kind in EntityKind::ALL {
            let session_id = self.session_id;
            self.spawner_mut(kind).reset(session_id);
        }
        log::info!("Session {} torn down ({} timers cancelled)", self.session_id, cancelled);
    }

    fn expect_phase(&self, phase: GamePhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn check_pending(
        &self,
        question_id: &str,
        action: &'static str,
    ) -> Result<String, SessionError> {
        let pending = self
            .pending_question
            .as_deref()
            .ok_or(SessionError::NoPendingQuestion)?;
        self.expect_phase(GamePhase::QuestionPaused, action)?;
        if pending != question_id {
            return Err(SessionError::QuestionMismatch {
                expected: pending.to_string(),
                got: question_id.to_string(),
            });
        }
        Ok(pending.to_string())
    }

    fn set_phase(&mut self, to: GamePhase, events: &mut Vec<GameEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        log::info!("Phase {:?} -> {:?} (session {})", from, to, self.session_id);
        self.phase = to;
        events.push(GameEvent::PhaseChanged { from, to });
    }

    fn try_finish_loading(&mut self, events: &mut Vec<GameEvent>) {
        if self.phase != GamePhase::Loading || !self.assets_loaded || !self.questions_resolved {
            return;
        }
        if self.instructions_requested && !self.instructions_shown {
            self.set_phase(GamePhase::Instructions, events);
        } else {
            self.enter_playing(events);
        }
    }

    fn enter_playing(&mut self, events: &mut Vec<GameEvent>) {
        if !self.scene_ready {
            for kind in EntityKind::ALL {
                let fire_at = self.clock + self.tuning.spawner(kind).initial_delay as f64;
                self.scheduler
                    .schedule(self.session_id, fire_at, TimerAction::SpawnerReady(kind));
            }
            self.scene_ready = true;
        }
        self.set_phase(GamePhase::Playing, events);
    }

    /// Take one life. Returns false if that ended the run.
    fn damage(&mut self, source: DamageSource, events: &mut Vec<GameEvent>) -> bool {
        let remaining = self.player.lose_life();
        log::info!("Life lost ({:?}), {} remaining", source, remaining);
        events.push(GameEvent::LifeLost { source, remaining });
        if remaining == 0 {
            self.end_run(GamePhase::GameOver, events);
            return false;
        }
        true
    }

    pub(crate) fn grant_invincibility(&mut self, events: &mut Vec<GameEvent>) {
        if let Some(task) = self.invincibility_task.take() {
            self.scheduler.cancel(task);
        }
        let until = self.clock + self.tuning.invincibility_secs as f64;
        self.invincibility_task = Some(self.scheduler.schedule(
            self.session_id,
            until,
            TimerAction::InvincibilityExpired,
        ));
        self.player.is_invincible = true;
        self.player.invincibility_expires_at = Some(until);
        events.push(GameEvent::InvincibilityStarted { until });
    }

    pub(crate) fn expire_invincibility(&mut self, events: &mut Vec<GameEvent>) {
        self.invincibility_task = None;
        self.player.invincibility_expires_at = None;
        if self.player.is_invincible {
            self.player.is_invincible = false;
            events.push(GameEvent::InvincibilityEnded);
        }
    }

    fn end_run(&mut self, phase: GamePhase, events: &mut Vec<GameEvent>) {
        let score = self.score_data();
        self.score = Some(score);
        self.pending_question = None;
        self.set_phase(phase, events);
        events.push(match phase {
            GamePhase::Won => GameEvent::Won(score),
            _ => GameEvent::GameOver(score),
        });
    }

    /// React to a contact reported by the detector
    pub(crate) fn apply_collision(&mut self, hit: CollisionEvent, events: &mut Vec<GameEvent>) {
        if self.spawner_mut(hit.kind()).remove(hit.id()).is_none() {
            log::warn!("Collision with {} but it is no longer live", hit.id());
        }
        match hit {
            CollisionEvent::Hazard { kind, id } => {
                if self.player.is_invincible {
                    events.push(GameEvent::HazardDeflected { kind, id });
                } else {
                    events.push(GameEvent::HazardHit { kind, id });
                    self.damage(DamageSource::Hazard(kind), events);
                }
            }
            CollisionEvent::Collected { id } => {
                events.push(GameEvent::Collected { id: id.clone() });
                self.open_question(id, events);
            }
        }
    }

    fn open_question(&mut self, collected_id: String, events: &mut Vec<GameEvent>) {
        let prompt = self.questions.as_mut().and_then(|bank| {
            bank.select(&self.unique_answered_ids, self.clock)
                .map(|q| (q.id.clone(), q.text.clone(), q.option_texts()))
        });
        let Some((question_id, prompt, options)) = prompt else {
            log::warn!("No question available for {}, skipping quiz", collected_id);
            events.push(GameEvent::QuizUnavailable { id: collected_id });
            return;
        };
        log::info!("Prompting question {}", question_id);
        self.pending_question = Some(question_id.clone());
        self.set_phase(GamePhase::QuestionPaused, events);
        events.push(GameEvent::QuestionPrompted {
            question_id,
            prompt,
            options,
        });
    }

    /// Evaluate the end of the tunnel once per session
    pub(crate) fn check_finish_line(&mut self, events: &mut Vec<GameEvent>) {
        if self.finished
            || self.phase != GamePhase::Playing
            || self.player.position.z > self.tuning.tunnel.finish_line_z
        {
            return;
        }
        self.finished = true;
        let won = self.player.is_alive()
            && self.unique_answered_ids.len() >= self.tuning.win_threshold;
        log::info!(
            "Finish line reached: lives={} answered={} won={}",
            self.player.lives,
            self.unique_answered_ids.len(),
            won
        );
        self.end_run(if won { GamePhase::Won } else { GamePhase::GameOver }, events);
    }
}
