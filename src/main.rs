//! Tunnel Run headless host
//!
//! Drives one session the way a browser frame loop would: jittery frame
//! times feed a fixed-timestep accumulator, a scripted pilot flies the player
//! down the tunnel and a stub quiz answers the prompts.
//!
//! Usage: `tunnel-run [tuning.json] [questions.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::{Vec2, Vec3};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use tunnel_run::consts::*;
    use tunnel_run::sim::{Entity, EntityKind, GameEvent, GamePhase, GameSession, TickInput, tick};
    use tunnel_run::{AnswerSubmission, QuestionBank, Tuning};

    const BUILTIN_QUESTIONS: &str = include_str!("../data/questions.json");

    /// Pilot forward speed toward -Z (units/s)
    const CRUISE_SPEED: f32 = 4.0;
    /// Pilot sideways speed (units/s)
    const STEER_SPEED: f32 = 6.0;
    /// Hazards closer than this ahead get dodged
    const DODGE_RANGE: f32 = 15.0;
    /// Chance the stub quiz answers correctly
    const ANSWER_ACCURACY: f64 = 0.8;
    /// Hard stop for the frame loop (ten minutes at 60 fps)
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    /// Host state around one session
    struct Game {
        session: GameSession,
        accumulator: f32,
        input: TickInput,
        rng: Pcg32,
    }

    impl Game {
        fn new(session: GameSession, seed: u64) -> Self {
            Self {
                session,
                accumulator: 0.0,
                input: TickInput::default(),
                rng: Pcg32::seed_from_u64(seed.wrapping_add(1)),
            }
        }

        /// Run simulation ticks for one frame
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.steer();
                let events = tick(&mut self.session, &self.input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;
                self.handle_events(events);
            }
        }

        /// Chase the nearest collectible ahead, otherwise sidestep hazards
        fn steer(&mut self) {
            if self.session.phase() != GamePhase::Playing {
                return;
            }
            let player = self.session.player().position;
            let ahead = |e: &&Entity| e.position.z < player.z;

            let collectible = self
                .session
                .spawner(EntityKind::Knowledge)
                .entities()
                .iter()
                .filter(ahead)
                .max_by(|a, b| a.position.z.total_cmp(&b.position.z));

            let current = player.truncate();
            let goal = match collectible {
                Some(e) => e.position.truncate(),
                None => EntityKind::HAZARDS
                    .iter()
                    .flat_map(|kind| self.session.spawner(*kind).entities())
                    .filter(ahead)
                    .filter(|e| player.z - e.position.z < DODGE_RANGE)
                    .min_by(|a, b| {
                        a.position
                            .distance(player)
                            .total_cmp(&b.position.distance(player))
                    })
                    .map(|e| {
                        let away = (current - e.position.truncate()).normalize_or(Vec2::X);
                        current + away * 3.0
                    })
                    .unwrap_or(current),
            };

            let radius = self.session.tuning().tunnel.spawn_radius();
            let next = (current + (goal - current).clamp_length_max(STEER_SPEED * SIM_DT))
                .clamp_length_max(radius);
            self.input.player_position =
                Some(Vec3::new(next.x, next.y, player.z - CRUISE_SPEED * SIM_DT));
        }

        fn handle_events(&mut self, events: Vec<GameEvent>) {
            for event in events {
                match event {
                    GameEvent::QuestionPrompted {
                        question_id,
                        prompt,
                        options,
                    } => {
                        log::info!("Quiz: {} {:?}", prompt, options);
                        self.answer(&question_id);
                    }
                    GameEvent::HazardHit { kind, id } => {
                        log::info!("Hit by {:?} {}", kind, id);
                    }
                    GameEvent::QuizUnavailable { id } => {
                        log::warn!("Collected {} but no quiz is available", id);
                    }
                    other => log::debug!("{:?}", other),
                }
            }
        }

        /// Stub quiz collaborator
        fn answer(&mut self, question_id: &str) {
            let knows = self.rng.random_bool(ANSWER_ACCURACY);
            let submission = self
                .session
                .questions()
                .and_then(|bank| bank.get(question_id))
                .map(|question| {
                    let wrong = question.options.iter().position(|o| !o.is_correct);
                    match (knows, question.correct_option_index(), wrong) {
                        (true, Some(index), _) | (false, _, Some(index)) => {
                            AnswerSubmission::Option(index)
                        }
                        (true, None, _) => AnswerSubmission::FreeText(
                            question.accepted_answers.first().cloned().unwrap_or_default(),
                        ),
                        (false, _, None) => AnswerSubmission::FreeText("no idea".to_string()),
                    }
                });

            let result = match submission {
                Some(submission) => self.session.resolve_answer(question_id, submission),
                None => self.session.dismiss_question(),
            };
            match result {
                Ok(events) => self.handle_events(events),
                Err(err) => log::warn!("Quiz answer rejected: {}", err),
            }
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let mut args = std::env::args().skip(1);
        let tuning = match args.next() {
            Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?)?,
            None => Tuning::default(),
        };
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        log::info!("Tunnel Run (headless) starting with seed {}", seed);

        let questions = match args.next() {
            Some(path) => QuestionBank::load(path, seed),
            None => QuestionBank::from_json(BUILTIN_QUESTIONS, seed),
        };

        let mut game = Game::new(GameSession::new(tuning, seed)?, seed);
        let events = game.session.assets_loaded();
        game.handle_events(events);
        let events = game.session.questions_loaded(questions);
        game.handle_events(events);
        if game.session.phase() == GamePhase::Instructions {
            let events = game.session.dismiss_instructions()?;
            game.handle_events(events);
        }

        let mut frames = 0;
        while !game.session.phase().is_terminal() && frames < MAX_FRAMES {
            // Browser-like frame jitter
            let frame_dt = game.rng.random_range(1.0 / 75.0..1.0 / 30.0);
            game.update(frame_dt);
            frames += 1;
        }

        match (game.session.phase(), game.session.score()) {
            (phase, Some(score)) => println!(
                "{:?}: {:.1}s, {} questions, {} lives left",
                phase, score.time, score.questions, score.lives
            ),
            (phase, None) => println!("Stopped after {} frames in {:?}", frames, phase),
        }
        game.session.teardown();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser host embeds the library directly
}
