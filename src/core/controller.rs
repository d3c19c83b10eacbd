//! Session controller: transient client state plus the three polling loops,
//! expressed as a synchronous state machine that emits [`Effect`]s.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::api::{
    AgentType, AiMoveQuery, AiMoveResponse, Color, GameMode, GameState, MoveRequest,
    MoveResponse, NewGameRequest, StartTrainingRequest, TrainingStatus, BOARD_SIZE,
};
use crate::core::command::{Command, Effect, LoopKind, Origin, Outgoing, Reply, Request, Response};
use crate::core::evaluation::{self, Advance, EvaluationConfig, EvaluationRun, Pending};
use crate::core::training::{self, LogLevel, TrainingConfig, TrainingRun};
use crate::error::ApiError;

pub const MIN_AI_DELAY: Duration = Duration::from_millis(100);
pub const MAX_AI_DELAY: Duration = Duration::from_millis(5000);
const AI_DELAY_STEP: Duration = Duration::from_millis(100);

/// Knobs the controller starts with; normally built from the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sequence_length: usize,
    pub ai_delay: Duration,
    pub agent: AgentType,
    pub evaluation: EvaluationConfig,
    pub training: TrainingConfig,
    pub training_poll: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sequence_length: 3,
            ai_delay: Duration::from_millis(1000),
            agent: AgentType::None,
            evaluation: EvaluationConfig::default(),
            training: TrainingConfig::default(),
            training_poll: training::DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug)]
pub struct Controller {
    settings: Settings,
    game: Option<GameState>,
    revision: u64,
    epoch: u64,
    selected_color: Color,
    cursor: usize,
    agent: AgentType,
    ai_enabled: bool,
    ai_delay: Duration,
    learning: bool,
    debug: bool,
    mode: GameMode,
    message: String,
    autoplay: bool,
    evaluation: Option<EvaluationRun>,
    training: TrainingRun,
}

impl Controller {
    pub fn new(settings: Settings) -> Self {
        let ai_delay = settings.ai_delay.clamp(MIN_AI_DELAY, MAX_AI_DELAY);
        let agent = settings.agent;
        Self {
            settings,
            game: None,
            revision: 0,
            epoch: 0,
            selected_color: Color::Red,
            cursor: 0,
            agent,
            ai_enabled: agent != AgentType::None,
            ai_delay,
            learning: false,
            debug: false,
            mode: GameMode::Normal,
            message: String::new(),
            autoplay: false,
            evaluation: None,
            training: TrainingRun::default(),
        }
    }

    // ---- read side -------------------------------------------------------

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Bumped exactly once per applied snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn selected_color(&self) -> Color {
        self.selected_color
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn agent(&self) -> AgentType {
        self.agent
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    pub fn ai_delay(&self) -> Duration {
        self.ai_delay
    }

    pub fn learning(&self) -> bool {
        self.learning
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn autoplay_active(&self) -> bool {
        self.autoplay
    }

    pub fn evaluation(&self) -> Option<&EvaluationRun> {
        self.evaluation.as_ref()
    }

    pub fn evaluation_running(&self) -> bool {
        self.evaluation.as_ref().is_some_and(EvaluationRun::is_running)
    }

    pub fn training(&self) -> &TrainingRun {
        &self.training
    }

    pub fn game_over(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.game_over)
    }

    /// Whether the AI key is usable right now.
    pub fn ai_move_enabled(&self) -> bool {
        self.ai_enabled && self.game.as_ref().is_some_and(|g| !g.game_over)
    }

    /// Target sequence is shown in debug mode or once the game is over.
    pub fn reveal_target(&self) -> bool {
        self.debug || self.game_over()
    }

    // ---- commands --------------------------------------------------------

    pub fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        let mut fx = Vec::new();
        match command {
            Command::NewGame => {
                if self.evaluation_running() {
                    self.stop_evaluation(&mut fx);
                } else {
                    self.new_game(&mut fx);
                }
            }
            Command::SelectColor(color) => self.selected_color = color,
            Command::MoveCursor(delta) => {
                let next = self.cursor as isize + delta;
                self.cursor = next.rem_euclid(BOARD_SIZE as isize) as usize;
            }
            Command::DropAtCursor => self.make_move(self.selected_color, self.cursor, &mut fx),
            Command::Drop(column) => {
                if column < BOARD_SIZE {
                    self.cursor = column;
                    self.make_move(self.selected_color, column, &mut fx);
                }
            }
            Command::ToggleAutoplay => self.toggle_autoplay(&mut fx),
            Command::CycleAgent => self.set_agent(self.agent.next(), &mut fx),
            Command::SetAiDelay(delay) => self.set_ai_delay(delay, &mut fx),
            Command::Faster => self.set_ai_delay(self.ai_delay.saturating_sub(AI_DELAY_STEP), &mut fx),
            Command::Slower => self.set_ai_delay(self.ai_delay + AI_DELAY_STEP, &mut fx),
            Command::ToggleLearning => self.learning = !self.learning,
            Command::ToggleDebug => self.debug = !self.debug,
            Command::SetMode(mode) => self.set_mode(mode, &mut fx),
            Command::CycleMode => self.set_mode(self.mode.next(), &mut fx),
            Command::StartEvaluation => self.start_evaluation(&mut fx),
            Command::StopEvaluation => self.stop_evaluation(&mut fx),
            Command::StartTraining => self.start_training(&mut fx),
            Command::StopTraining => self.halt_training(true, &mut fx),
            Command::Stop => match self.mode {
                GameMode::Eval => self.stop_evaluation(&mut fx),
                GameMode::Train => self.halt_training(true, &mut fx),
                GameMode::Normal => self.stop_autoplay(&mut fx),
            },
            Command::SaveModel => self.send(Origin::User, Request::SaveModel, &mut fx),
            Command::Quit => {}
        }
        fx
    }

    fn send(&self, origin: Origin, request: Request, fx: &mut Vec<Effect>) {
        fx.push(Effect::Send(Outgoing {
            origin,
            epoch: self.epoch,
            request,
        }));
    }

    /// Every new-game request opens a new epoch; replies for older epochs are stale.
    fn send_new_game(&mut self, origin: Origin, req: NewGameRequest, fx: &mut Vec<Effect>) {
        self.epoch += 1;
        self.send(origin, Request::NewGame(req), fx);
    }

    fn new_game(&mut self, fx: &mut Vec<Effect>) {
        self.stop_autoplay(fx);
        let req = NewGameRequest {
            sequence_length: self.settings.sequence_length,
            ai_type: self.agent,
            learning_mode: self.learning,
            debug_mode: self.debug,
            game_mode: self.mode,
        };
        self.send_new_game(Origin::User, req, fx);
    }

    fn make_move(&mut self, color: Color, column: usize, fx: &mut Vec<Effect>) {
        if self.game.is_none() || self.game_over() || self.evaluation_running() {
            return;
        }
        self.stop_autoplay(fx);
        let req = MoveRequest {
            color,
            column,
            debug_mode: self.debug,
        };
        self.send(Origin::User, Request::MakeMove(req), fx);
    }

    fn toggle_autoplay(&mut self, fx: &mut Vec<Effect>) {
        if self.game.is_none() || self.game_over() || self.evaluation_running() {
            return;
        }
        if !self.ai_enabled {
            self.message = "No AI selected. Pick an agent type first.".into();
            return;
        }
        if self.autoplay {
            self.stop_autoplay(fx);
            self.message = "AI autoplay stopped.".into();
        } else {
            self.start_autoplay(fx);
            self.message = "AI autoplay started.".into();
        }
    }

    fn start_autoplay(&mut self, fx: &mut Vec<Effect>) {
        fx.push(Effect::Disarm(LoopKind::Autoplay));
        self.autoplay = false;
        if !self.ai_move_enabled() {
            return;
        }
        self.autoplay = true;
        fx.push(Effect::Arm {
            kind: LoopKind::Autoplay,
            after: self.ai_delay,
        });
        info!(delay_ms = self.ai_delay.as_millis() as u64, agent = ?self.agent, "autoplay started");
    }

    fn stop_autoplay(&mut self, fx: &mut Vec<Effect>) {
        if self.autoplay {
            self.autoplay = false;
            fx.push(Effect::Disarm(LoopKind::Autoplay));
            info!("autoplay stopped");
        }
    }

    fn set_agent(&mut self, agent: AgentType, fx: &mut Vec<Effect>) {
        self.agent = agent;
        self.ai_enabled = agent != AgentType::None;
        self.stop_autoplay(fx);
        self.message = if self.ai_enabled {
            format!("AI set to {}. Press 'a' to let it play.", agent.label())
        } else {
            "AI disabled.".into()
        };
    }

    fn set_ai_delay(&mut self, delay: Duration, fx: &mut Vec<Effect>) {
        self.ai_delay = delay.clamp(MIN_AI_DELAY, MAX_AI_DELAY);
        if self.autoplay {
            self.stop_autoplay(fx);
            self.start_autoplay(fx);
        }
    }

    fn set_mode(&mut self, mode: GameMode, fx: &mut Vec<Effect>) {
        let previous = self.mode;
        self.mode = mode;
        // must happen before any request below goes out
        self.stop_autoplay(fx);
        self.end_evaluation(fx);

        match mode {
            GameMode::Eval => {
                if self.agent == AgentType::None {
                    self.agent = AgentType::Rule;
                    self.ai_enabled = true;
                }
                self.message = "Evaluation mode: press 'e' to benchmark the selected agents.".into();
            }
            GameMode::Train => {
                self.agent = self.settings.training.agent;
                self.ai_enabled = true;
                self.learning = true;
                self.message = "Training mode: press 's' to train the agent on the server.".into();
            }
            GameMode::Normal => {
                self.message = "Normal mode: press 'a' to start or stop AI autoplay.".into();
            }
        }

        if previous != mode {
            self.new_game(fx);
        }
    }

    // ---- evaluation loop -------------------------------------------------

    fn start_evaluation(&mut self, fx: &mut Vec<Effect>) {
        if self.evaluation_running() {
            return;
        }
        if self.mode != GameMode::Eval {
            self.message = "Switch to evaluation mode ('m') first.".into();
            return;
        }
        let Some(run) = EvaluationRun::start(self.settings.evaluation.clone()) else {
            self.message = "Select at least one agent to evaluate.".into();
            return;
        };
        self.stop_autoplay(fx);
        self.message = format!(
            "Evaluating {} agent(s), {} game(s) each...",
            run.agents().len(),
            run.config().games_per_agent
        );
        info!(
            agents = run.agents().len(),
            games_per_agent = run.config().games_per_agent,
            "evaluation started"
        );
        self.evaluation = Some(run);
        self.start_evaluation_game(fx);
    }

    fn start_evaluation_game(&mut self, fx: &mut Vec<Effect>) {
        let Some(run) = self.evaluation.as_ref() else {
            return;
        };
        let req = NewGameRequest {
            sequence_length: run.config().sequence_length,
            ai_type: run.current().agent,
            learning_mode: false,
            debug_mode: true,
            game_mode: GameMode::Eval,
        };
        self.send_new_game(Origin::Evaluation, req, fx);
    }

    /// Records a finished game or asks for the next AI move.
    fn evaluation_step(&mut self, fx: &mut Vec<Effect>) {
        let Some(state) = self.game.as_ref() else {
            return;
        };
        let Some(run) = self.evaluation.as_mut().filter(|r| r.is_running()) else {
            return;
        };

        if !state.game_over {
            self.send(
                Origin::Evaluation,
                Request::AiMove(AiMoveQuery {
                    debug_mode: true,
                    evaluation_mode: true,
                }),
                fx,
            );
            return;
        }

        let index = run.current_index();
        let agent = run.current().agent;
        let advance = run.record(state);
        if let Some(record) = run.agents().get(index) {
            debug!(
                agent = ?agent,
                won = state.winner,
                turns = state.turn(),
                win_rate = record.win_rate(),
                "evaluation game recorded"
            );
            self.message = format!(
                "Evaluating {} ({}/{} games done)",
                agent.label(),
                record.completed_games,
                run.config().games_per_agent
            );
        }

        match advance {
            Advance::SameAgent | Advance::NextAgent => {
                run.set_pending(Pending::NextGame);
                fx.push(Effect::Arm {
                    kind: LoopKind::Evaluation,
                    after: evaluation::GAME_GAP,
                });
            }
            Advance::Finished => {
                let completed = run.completed_games();
                info!(games = completed, "evaluation finished");
                self.message = format!("Evaluation complete: {completed} games played.");
                self.stop_evaluation(fx);
            }
        }
    }

    fn stop_evaluation(&mut self, fx: &mut Vec<Effect>) {
        if self.end_evaluation(fx) {
            self.new_game(fx);
        }
    }

    /// Clears the running flag and timer, keeping the aggregates for display.
    fn end_evaluation(&mut self, fx: &mut Vec<Effect>) -> bool {
        let Some(run) = self.evaluation.as_mut().filter(|r| r.is_running()) else {
            return false;
        };
        run.stop();
        fx.push(Effect::Disarm(LoopKind::Evaluation));

        if run.agents().len() > 1 && run.completed_games() > 0 {
            if let Some(best) = run.best() {
                self.message = format!(
                    "{} performed best with a {:.1}% win rate.",
                    best.agent.label(),
                    best.win_rate() * 100.0
                );
            }
        }
        true
    }

    // ---- training loop ---------------------------------------------------

    fn start_training(&mut self, fx: &mut Vec<Effect>) {
        if self.training.is_running() {
            return;
        }
        if self.mode != GameMode::Train {
            self.message = "Switch to training mode ('m') first.".into();
            return;
        }
        let mut config = self.settings.training.clone();
        if self.agent.is_learning() {
            config.agent = self.agent;
        }
        let req = StartTrainingRequest {
            num_games: config.episodes,
            sequence_length: config.sequence_length,
            agent_type: config.agent,
        };
        self.message = format!("Starting training: {} games...", config.episodes);
        info!(episodes = config.episodes, agent = ?config.agent, "training requested");
        self.training.begin(config.clone());
        self.training.log.push(
            LogLevel::Success,
            format!(
                "Starting training: {} games, sequence length {}, agent {}",
                config.episodes,
                config.sequence_length,
                config.agent.label()
            ),
        );
        self.send(Origin::Training, Request::StartTraining(req), fx);
    }

    /// Stops polling. `request_stop` asks the server to halt as well; otherwise a
    /// fresh normal game is started right away.
    fn halt_training(&mut self, request_stop: bool, fx: &mut Vec<Effect>) {
        fx.push(Effect::Disarm(LoopKind::Training));
        if !self.training.end() {
            return;
        }
        if request_stop {
            self.training.log.push(LogLevel::Warning, "Requesting training stop...");
            self.send(Origin::Training, Request::StopTraining, fx);
        } else {
            self.new_game(fx);
        }
    }

    fn arm_training_poll(&self, fx: &mut Vec<Effect>) {
        fx.push(Effect::Arm {
            kind: LoopKind::Training,
            after: self.settings.training_poll,
        });
    }

    // ---- timers ----------------------------------------------------------

    pub fn handle_timer(&mut self, kind: LoopKind) -> Vec<Effect> {
        let mut fx = Vec::new();
        match kind {
            LoopKind::Autoplay => {
                if !self.autoplay {
                    return fx;
                }
                if self.ai_move_enabled() {
                    let query = AiMoveQuery {
                        debug_mode: self.debug,
                        evaluation_mode: false,
                    };
                    self.send(Origin::Autoplay, Request::AiMove(query), &mut fx);
                    fx.push(Effect::Arm {
                        kind: LoopKind::Autoplay,
                        after: self.ai_delay,
                    });
                } else {
                    self.stop_autoplay(&mut fx);
                }
            }
            LoopKind::Evaluation => {
                let Some(pending) = self
                    .evaluation
                    .as_ref()
                    .filter(|r| r.is_running())
                    .map(EvaluationRun::pending)
                else {
                    return fx;
                };
                match pending {
                    Pending::Step => self.evaluation_step(&mut fx),
                    Pending::NextGame => self.start_evaluation_game(&mut fx),
                }
            }
            LoopKind::Training => {
                if self.training.is_running() {
                    self.send(Origin::Training, Request::TrainingStatus, &mut fx);
                    self.arm_training_poll(&mut fx);
                }
            }
        }
        fx
    }

    // ---- responses -------------------------------------------------------

    pub fn handle_response(&mut self, response: Response) -> Vec<Effect> {
        let mut fx = Vec::new();
        let Response { origin, epoch, reply } = response;
        let stale = epoch != self.epoch;

        match reply {
            Reply::NewGame(result) => {
                if stale {
                    debug!(epoch, current = self.epoch, "dropping stale new_game reply");
                } else {
                    self.on_new_game(origin, result.map(|r| r.game_state), &mut fx);
                }
            }
            Reply::Move(result) => {
                if stale {
                    debug!(epoch, current = self.epoch, "dropping stale move reply");
                } else {
                    self.on_move(result);
                }
            }
            Reply::AiMove(result) => {
                if stale {
                    debug!(epoch, current = self.epoch, "dropping stale ai_move reply");
                } else {
                    self.on_ai_move(origin, result, &mut fx);
                }
            }
            Reply::TrainingStarted(result) => self.on_training_started(result, &mut fx),
            Reply::TrainingStatus(result) => self.on_training_status(result, &mut fx),
            Reply::TrainingStopped(result) => self.on_training_stopped(result, &mut fx),
            Reply::ModelSaved(result) => match result {
                Ok(ack) if ack.success => self.message = "Model saved.".into(),
                Ok(ack) => self.message = format!("Saving the model failed: {}", ack.message),
                Err(e) => {
                    error!(error = %e, "save_model failed");
                    self.message = "Error while saving the model.".into();
                }
            },
        }
        fx
    }

    fn apply(&mut self, state: GameState) {
        self.game = Some(state);
        self.revision += 1;
    }

    fn on_new_game(&mut self, origin: Origin, result: Result<GameState, ApiError>, fx: &mut Vec<Effect>) {
        if origin == Origin::Evaluation {
            if !self.evaluation_running() {
                return;
            }
            match result {
                Ok(state) => {
                    self.apply(state);
                    self.evaluation_step(fx);
                }
                Err(e) => {
                    error!(error = %e, "evaluation game could not start");
                    self.message = "Error while starting an evaluation game.".into();
                    self.stop_evaluation(fx);
                }
            }
            return;
        }

        match result {
            Ok(state) => {
                info!(
                    turn = state.turn(),
                    max_turns = state.turn_limit(),
                    sequence_length = state.sequence_length,
                    "new game"
                );
                self.apply(state);
                self.message = "New game started. Pick a color and a column!".into();
            }
            Err(e) => {
                error!(error = %e, "new_game failed");
                self.message = "Error while starting a new game.".into();
            }
        }
    }

    fn on_move(&mut self, result: Result<MoveResponse, ApiError>) {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "make_move failed");
                self.message = "Error while making a move.".into();
                return;
            }
        };
        if !response.result.valid {
            self.message = response
                .result
                .message
                .unwrap_or_else(|| "Invalid move.".into());
            return;
        }

        self.apply(response.game_state);
        let Some(state) = self.game.as_ref() else {
            return;
        };
        let (turn, limit) = (state.turn(), state.turn_limit());
        let (hits, blows) = (response.result.hits, response.result.blows);
        self.message = if state.game_over {
            if state.winner {
                format!("Congratulations, you found the sequence! ({turn} turns)")
            } else {
                format!("Game over. The sequence was not found. ({limit} turns)")
            }
        } else if hits > 0 || blows > 0 {
            format!("{hits} HIT / {blows} BLOW ({turn}/{limit} turns)")
        } else {
            format!("No matching colors. ({turn}/{limit} turns)")
        };
    }

    fn on_ai_move(&mut self, origin: Origin, result: Result<AiMoveResponse, ApiError>, fx: &mut Vec<Effect>) {
        if origin == Origin::Evaluation {
            if !self.evaluation_running() {
                return;
            }
            match result {
                Ok(response) => {
                    self.apply(response.game_state);
                    if let Some(run) = self.evaluation.as_mut() {
                        run.set_pending(Pending::Step);
                    }
                    fx.push(Effect::Arm {
                        kind: LoopKind::Evaluation,
                        after: evaluation::STEP_DELAY,
                    });
                }
                Err(e) => {
                    error!(error = %e, "evaluation ai_move failed");
                    self.message = format!("Evaluation stopped: {e}");
                    self.stop_evaluation(fx);
                }
            }
            return;
        }

        // Autoplay failures are reported and the interval keeps running.
        let response = match result {
            Ok(response) => response,
            Err(ApiError::Server(msg)) => {
                warn!(%msg, "ai_move rejected by server");
                self.message = msg;
                return;
            }
            Err(e) => {
                error!(error = %e, "ai_move failed");
                self.message = "Error during the AI move.".into();
                return;
            }
        };

        let action = response.action;
        self.apply(response.game_state);
        let Some(state) = self.game.as_ref() else {
            return;
        };
        let (turn, limit) = (state.turn(), state.turn_limit());
        let over = state.game_over;
        self.message = if over {
            if state.winner {
                format!("The AI found the sequence! ({turn} turns)")
            } else {
                format!("Game over. The AI did not find the sequence. ({limit} turns)")
            }
        } else {
            format!(
                "AI dropped {} into column {}: {} HIT / {} BLOW ({turn}/{limit} turns)",
                action.color,
                action.column + 1,
                response.result.hits,
                response.result.blows
            )
        };
        if over {
            self.stop_autoplay(fx);
        }
    }

    fn on_training_started(&mut self, result: Result<crate::api::Ack, ApiError>, fx: &mut Vec<Effect>) {
        if !self.training.is_running() {
            return;
        }
        match result {
            Ok(ack) if ack.success => {
                self.training.log.push(LogLevel::Success, ack.message);
                self.arm_training_poll(fx);
            }
            Ok(ack) => {
                warn!(message = %ack.message, "training refused");
                self.message = format!("Training could not start: {}", ack.message);
                self.training
                    .log
                    .push(LogLevel::Error, format!("Start failed: {}", ack.message));
                self.halt_training(false, fx);
            }
            Err(e) => {
                error!(error = %e, "start_training failed");
                self.message = "Error while starting training.".into();
                self.training
                    .log
                    .push(LogLevel::Error, format!("Start error: {e}"));
                self.halt_training(false, fx);
            }
        }
    }

    fn on_training_status(&mut self, result: Result<TrainingStatus, ApiError>, fx: &mut Vec<Effect>) {
        if !self.training.is_running() {
            return;
        }
        match result {
            Ok(status) if !status.active => {
                info!(games = self.training.stats.games_played, "training finished on server");
                self.training.log.push(LogLevel::Success, "Training complete.");
                self.message = "Training complete!".into();
                self.halt_training(false, fx);
            }
            Ok(status) => {
                if let Some(stats) = status.stats {
                    if let Some(line) = self.training.update(stats) {
                        self.training.log.push(LogLevel::Info, line);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "training_status poll failed");
                self.training
                    .log
                    .push(LogLevel::Warning, format!("Status error: {e}"));
            }
        }
    }

    fn on_training_stopped(&mut self, result: Result<crate::api::Ack, ApiError>, fx: &mut Vec<Effect>) {
        match result {
            Ok(ack) => {
                if ack.success {
                    self.message = "Training stopped.".into();
                    self.training.log.push(LogLevel::Success, "Training stopped.");
                } else {
                    self.message = format!("Stopping training failed: {}", ack.message);
                    self.training
                        .log
                        .push(LogLevel::Error, format!("Stop failed: {}", ack.message));
                }
                self.new_game(fx);
            }
            Err(e) => {
                error!(error = %e, "stop_training failed");
                self.message = "Error while stopping training.".into();
                self.training
                    .log
                    .push(LogLevel::Error, format!("Stop error: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Ack, AiAction, Cell, Move, MoveResult, NewGameResponse, TrainingStats};

    fn state(turn: u32, over: bool, winner: bool) -> GameState {
        GameState {
            board: vec![vec![Cell { color: Color::Red }; BOARD_SIZE]; BOARD_SIZE],
            history: (0..turn)
                .map(|i| Move {
                    color: Color::Blue,
                    column: (i as usize) % BOARD_SIZE,
                    hits: 0,
                    blows: 1,
                })
                .collect(),
            game_over: over,
            winner,
            target_sequence: None,
            sequence_length: 3,
            max_turns: 50,
            current_turn: turn,
        }
    }

    fn sent(fx: &[Effect]) -> Vec<&Outgoing> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Send(out) => Some(out),
                _ => None,
            })
            .collect()
    }

    fn reply_new_game(c: &mut Controller, origin: Origin, st: GameState) -> Vec<Effect> {
        c.handle_response(Response {
            origin,
            epoch: c.epoch(),
            reply: Reply::NewGame(Ok(NewGameResponse {
                game_state: st,
                message: None,
            })),
        })
    }

    fn started(agent: AgentType) -> Controller {
        let mut c = Controller::new(Settings {
            agent,
            ..Settings::default()
        });
        c.handle_command(Command::NewGame);
        reply_new_game(&mut c, Origin::User, state(0, false, false));
        c
    }

    #[test]
    fn nothing_rendered_before_first_snapshot() {
        let c = Controller::new(Settings::default());
        assert!(c.game().is_none());
        assert_eq!(c.revision(), 0);
    }

    #[test]
    fn valid_move_applies_snapshot_once() {
        let mut c = started(AgentType::None);
        assert_eq!(c.revision(), 1);
        let fx = c.handle_command(Command::Drop(2));
        assert!(matches!(sent(&fx)[0].request, Request::MakeMove(MoveRequest { column: 2, color: Color::Red, .. })));

        c.handle_response(Response {
            origin: Origin::User,
            epoch: c.epoch(),
            reply: Reply::Move(Ok(MoveResponse {
                game_state: state(1, false, false),
                result: MoveResult { valid: true, message: None, hits: 1, blows: 1 },
            })),
        });
        assert_eq!(c.revision(), 2);
        assert_eq!(c.game().unwrap().turn(), 1);
        assert!(c.message().starts_with("1 HIT / 1 BLOW"));
    }

    #[test]
    fn invalid_move_leaves_state_untouched() {
        let mut c = started(AgentType::None);
        c.handle_command(Command::Drop(0));
        c.handle_response(Response {
            origin: Origin::User,
            epoch: c.epoch(),
            reply: Reply::Move(Ok(MoveResponse {
                game_state: state(9, true, false),
                result: MoveResult { valid: false, message: Some("Invalid move".into()), hits: 0, blows: 0 },
            })),
        });
        assert_eq!(c.revision(), 1);
        assert_eq!(c.message(), "Invalid move");
    }

    #[test]
    fn moves_ignored_once_game_is_over() {
        let mut c = Controller::new(Settings::default());
        c.handle_command(Command::NewGame);
        reply_new_game(&mut c, Origin::User, state(4, true, true));
        assert!(c.handle_command(Command::Drop(1)).is_empty());
    }

    #[test]
    fn ai_key_disabled_when_over_or_without_agent() {
        let c = started(AgentType::None);
        assert!(!c.ai_move_enabled());

        let mut c = started(AgentType::Rule);
        assert!(c.ai_move_enabled());
        c.handle_command(Command::NewGame);
        reply_new_game(&mut c, Origin::User, state(3, true, false));
        assert!(!c.ai_move_enabled());
    }

    #[test]
    fn autoplay_toggle_arms_and_disarms_one_timer() {
        let mut c = started(AgentType::Rule);
        let fx = c.handle_command(Command::ToggleAutoplay);
        assert!(c.autoplay_active());
        assert_eq!(
            fx,
            vec![
                Effect::Disarm(LoopKind::Autoplay),
                Effect::Arm { kind: LoopKind::Autoplay, after: Duration::from_millis(1000) },
            ]
        );
        let fx = c.handle_command(Command::ToggleAutoplay);
        assert!(!c.autoplay_active());
        assert_eq!(fx, vec![Effect::Disarm(LoopKind::Autoplay)]);
    }

    #[test]
    fn autoplay_without_agent_only_reports() {
        let mut c = started(AgentType::None);
        assert!(c.handle_command(Command::ToggleAutoplay).is_empty());
        assert!(c.message().contains("No AI"));
    }

    #[test]
    fn autoplay_tick_requests_move_and_rearms() {
        let mut c = started(AgentType::Rl);
        c.handle_command(Command::ToggleAutoplay);
        let fx = c.handle_timer(LoopKind::Autoplay);
        assert!(matches!(sent(&fx)[0].request, Request::AiMove(AiMoveQuery { evaluation_mode: false, .. })));
        assert!(fx.contains(&Effect::Arm { kind: LoopKind::Autoplay, after: c.ai_delay() }));
    }

    #[test]
    fn autoplay_keeps_running_after_failure() {
        let mut c = started(AgentType::Rule);
        c.handle_command(Command::ToggleAutoplay);
        c.handle_timer(LoopKind::Autoplay);
        let fx = c.handle_response(Response {
            origin: Origin::Autoplay,
            epoch: c.epoch(),
            reply: Reply::AiMove(Err(ApiError::Server("AI is not selected".into()))),
        });
        assert!(fx.is_empty());
        assert!(c.autoplay_active());
        assert_eq!(c.message(), "AI is not selected");
    }

    #[test]
    fn autoplay_stops_at_game_over() {
        let mut c = started(AgentType::Rule);
        c.handle_command(Command::ToggleAutoplay);
        let fx = c.handle_response(Response {
            origin: Origin::Autoplay,
            epoch: c.epoch(),
            reply: Reply::AiMove(Ok(AiMoveResponse {
                action: AiAction { color: Color::Green, column: 0 },
                game_state: state(6, true, true),
                result: MoveResult { valid: true, message: None, hits: 3, blows: 0 },
            })),
        });
        assert!(!c.autoplay_active());
        assert_eq!(fx, vec![Effect::Disarm(LoopKind::Autoplay)]);
        assert!(c.message().contains("found the sequence"));
    }

    #[test]
    fn mode_switch_stops_autoplay_before_requesting() {
        let mut c = started(AgentType::Rule);
        c.handle_command(Command::ToggleAutoplay);
        let fx = c.handle_command(Command::SetMode(GameMode::Eval));
        let disarm = fx.iter().position(|e| *e == Effect::Disarm(LoopKind::Autoplay));
        let first_send = fx.iter().position(|e| matches!(e, Effect::Send(_)));
        assert!(disarm.unwrap() < first_send.unwrap());
        assert!(!c.autoplay_active());
    }

    #[test]
    fn entering_train_mode_selects_training_agent() {
        let mut c = started(AgentType::None);
        c.handle_command(Command::SetMode(GameMode::Train));
        assert_eq!(c.agent(), AgentType::Rl);
        assert!(c.learning());
        assert!(c.ai_enabled());
    }

    #[test]
    fn same_mode_does_not_restart_game() {
        let mut c = started(AgentType::None);
        let fx = c.handle_command(Command::SetMode(GameMode::Normal));
        assert!(sent(&fx).is_empty());
    }

    #[test]
    fn stale_replies_are_dropped() {
        let mut c = started(AgentType::Rule);
        let old_epoch = c.epoch();
        c.handle_command(Command::NewGame);
        c.handle_response(Response {
            origin: Origin::User,
            epoch: old_epoch,
            reply: Reply::Move(Ok(MoveResponse {
                game_state: state(1, false, false),
                result: MoveResult { valid: true, message: None, hits: 0, blows: 0 },
            })),
        });
        assert_eq!(c.revision(), 1);
    }

    #[test]
    fn delay_change_restarts_live_autoplay() {
        let mut c = started(AgentType::Rule);
        c.handle_command(Command::ToggleAutoplay);
        let fx = c.handle_command(Command::Slower);
        assert_eq!(c.ai_delay(), Duration::from_millis(1100));
        assert_eq!(
            fx.last(),
            Some(&Effect::Arm { kind: LoopKind::Autoplay, after: Duration::from_millis(1100) })
        );
        c.handle_command(Command::SetAiDelay(Duration::from_millis(10)));
        assert_eq!(c.ai_delay(), MIN_AI_DELAY);
    }

    #[test]
    fn evaluation_requires_eval_mode_and_agents() {
        let mut c = started(AgentType::Rule);
        assert!(c.handle_command(Command::StartEvaluation).is_empty());
        assert!(!c.evaluation_running());

        let mut c = Controller::new(Settings {
            evaluation: EvaluationConfig { agents: Vec::new(), ..EvaluationConfig::default() },
            ..Settings::default()
        });
        c.handle_command(Command::SetMode(GameMode::Eval));
        c.handle_command(Command::StartEvaluation);
        assert!(!c.evaluation_running());
        assert!(c.message().contains("at least one agent"));
    }

    #[test]
    fn evaluation_failure_stops_the_run() {
        let mut c = Controller::new(Settings::default());
        c.handle_command(Command::SetMode(GameMode::Eval));
        c.handle_command(Command::StartEvaluation);
        reply_new_game(&mut c, Origin::Evaluation, state(0, false, false));
        let fx = c.handle_response(Response {
            origin: Origin::Evaluation,
            epoch: c.epoch(),
            reply: Reply::AiMove(Err(ApiError::Status { status: 500 })),
        });
        assert!(!c.evaluation_running());
        assert!(fx.contains(&Effect::Disarm(LoopKind::Evaluation)));
        assert!(sent(&fx).iter().any(|o| matches!(o.request, Request::NewGame(_)) && o.origin == Origin::User));
    }

    #[test]
    fn training_start_then_poll_then_finish() {
        let mut c = Controller::new(Settings::default());
        c.handle_command(Command::SetMode(GameMode::Train));
        let fx = c.handle_command(Command::StartTraining);
        assert!(c.training().is_running());
        assert!(matches!(sent(&fx)[0].request, Request::StartTraining(StartTrainingRequest { num_games: 1000, agent_type: AgentType::Rl, .. })));

        let fx = c.handle_response(Response {
            origin: Origin::Training,
            epoch: c.epoch(),
            reply: Reply::TrainingStarted(Ok(Ack { success: true, message: "started".into() })),
        });
        assert_eq!(fx, vec![Effect::Arm { kind: LoopKind::Training, after: Duration::from_millis(1000) }]);

        let fx = c.handle_timer(LoopKind::Training);
        assert_eq!(sent(&fx)[0].request, Request::TrainingStatus);

        c.handle_response(Response {
            origin: Origin::Training,
            epoch: c.epoch(),
            reply: Reply::TrainingStatus(Ok(TrainingStatus {
                active: true,
                stats: Some(TrainingStats { games_played: 20, games_won: 5, win_rate: 25.0, avg_turns: 30.0, elapsed_time: 2.0 }),
            })),
        });
        assert_eq!(c.training().stats.games_played, 20);

        let fx = c.handle_response(Response {
            origin: Origin::Training,
            epoch: c.epoch(),
            reply: Reply::TrainingStatus(Ok(TrainingStatus { active: false, stats: None })),
        });
        assert!(!c.training().is_running());
        assert!(fx.contains(&Effect::Disarm(LoopKind::Training)));
        // server-driven completion does not send a stop request
        assert!(!sent(&fx).iter().any(|o| o.request == Request::StopTraining));
    }

    #[test]
    fn user_stop_sends_stop_request_once() {
        let mut c = Controller::new(Settings::default());
        c.handle_command(Command::SetMode(GameMode::Train));
        c.handle_command(Command::StartTraining);
        let fx = c.handle_command(Command::Stop);
        assert_eq!(sent(&fx)[0].request, Request::StopTraining);
        let fx = c.handle_command(Command::StopTraining);
        assert_eq!(fx, vec![Effect::Disarm(LoopKind::Training)]);
    }

    #[test]
    fn status_poll_errors_keep_polling() {
        let mut c = Controller::new(Settings::default());
        c.handle_command(Command::SetMode(GameMode::Train));
        c.handle_command(Command::StartTraining);
        let fx = c.handle_response(Response {
            origin: Origin::Training,
            epoch: c.epoch(),
            reply: Reply::TrainingStatus(Err(ApiError::Status { status: 503 })),
        });
        assert!(fx.is_empty());
        assert!(c.training().is_running());
        assert_eq!(c.training().log.entries().last().unwrap().level, LogLevel::Warning);
    }

    #[test]
    fn cursor_wraps_around_the_board() {
        let mut c = started(AgentType::None);
        c.handle_command(Command::MoveCursor(-1));
        assert_eq!(c.cursor(), BOARD_SIZE - 1);
        c.handle_command(Command::MoveCursor(1));
        assert_eq!(c.cursor(), 0);
        c.handle_command(Command::MoveCursor(7));
        assert_eq!(c.cursor(), 2);
    }

    #[test]
    fn cycling_agent_stops_autoplay_and_tracks_enabled_flag() {
        let mut c = started(AgentType::Rule);
        c.handle_command(Command::ToggleAutoplay);
        assert!(c.autoplay_active());

        let fx = c.handle_command(Command::CycleAgent);
        assert_eq!(c.agent(), AgentType::Rl);
        assert!(c.ai_enabled());
        assert!(!c.autoplay_active());
        assert_eq!(fx, vec![Effect::Disarm(LoopKind::Autoplay)]);

        c.handle_command(Command::CycleAgent);
        let fx = c.handle_command(Command::CycleAgent);
        assert_eq!(c.agent(), AgentType::None);
        assert!(!c.ai_enabled());
        assert!(!c.ai_move_enabled());
        assert!(fx.is_empty());
        assert_eq!(c.message(), "AI disabled.");
    }

    #[test]
    fn save_model_reports_each_outcome() {
        let mut c = started(AgentType::Rl);
        let fx = c.handle_command(Command::SaveModel);
        assert_eq!(sent(&fx)[0].request, Request::SaveModel);

        let reply = |c: &mut Controller, result: Result<Ack, ApiError>| {
            c.handle_response(Response {
                origin: Origin::User,
                epoch: c.epoch(),
                reply: Reply::ModelSaved(result),
            })
        };
        reply(&mut c, Ok(Ack { success: true, message: "ok".into() }));
        assert_eq!(c.message(), "Model saved.");
        reply(&mut c, Ok(Ack { success: false, message: "disk full".into() }));
        assert_eq!(c.message(), "Saving the model failed: disk full");
        reply(&mut c, Err(ApiError::Server("no model loaded".into())));
        assert_eq!(c.message(), "Error while saving the model.");
    }

    fn training_started_reply(c: &mut Controller, result: Result<Ack, ApiError>) -> Vec<Effect> {
        c.handle_command(Command::SetMode(GameMode::Train));
        c.handle_command(Command::StartTraining);
        assert!(c.training().is_running());
        c.handle_response(Response {
            origin: Origin::Training,
            epoch: c.epoch(),
            reply: Reply::TrainingStarted(result),
        })
    }

    #[test]
    fn refused_training_start_stops_and_starts_a_game() {
        let mut c = Controller::new(Settings::default());
        let fx = training_started_reply(
            &mut c,
            Ok(Ack { success: false, message: "Training already in progress".into() }),
        );
        assert!(!c.training().is_running());
        assert_eq!(c.message(), "Training could not start: Training already in progress");
        assert_eq!(c.training().log.entries().last().unwrap().level, LogLevel::Error);
        assert!(fx.contains(&Effect::Disarm(LoopKind::Training)));
        assert!(sent(&fx).iter().any(|o| matches!(o.request, Request::NewGame(_)) && o.origin == Origin::User));
        assert!(!sent(&fx).iter().any(|o| o.request == Request::StopTraining));
    }

    #[test]
    fn failed_training_start_stops_and_starts_a_game() {
        let mut c = Controller::new(Settings::default());
        let fx = training_started_reply(&mut c, Err(ApiError::Status { status: 500 }));
        assert!(!c.training().is_running());
        assert_eq!(c.message(), "Error while starting training.");
        assert!(c.training().log.entries().last().unwrap().message.contains("HTTP 500"));
        assert!(sent(&fx).iter().any(|o| matches!(o.request, Request::NewGame(_))));
    }

    #[test]
    fn evaluation_game_that_cannot_start_stops_the_run() {
        let mut c = Controller::new(Settings::default());
        c.handle_command(Command::SetMode(GameMode::Eval));
        c.handle_command(Command::StartEvaluation);
        assert!(c.evaluation_running());
        let fx = c.handle_response(Response {
            origin: Origin::Evaluation,
            epoch: c.epoch(),
            reply: Reply::NewGame(Err(ApiError::Server("Invalid sequence length".into()))),
        });
        assert!(!c.evaluation_running());
        assert_eq!(c.evaluation().unwrap().completed_games(), 0);
        assert_eq!(c.message(), "Error while starting an evaluation game.");
        assert!(fx.contains(&Effect::Disarm(LoopKind::Evaluation)));
        assert!(sent(&fx).iter().any(|o| matches!(o.request, Request::NewGame(_)) && o.origin == Origin::User));
    }

    #[test]
    fn evaluation_progress_counts_the_current_agent() {
        let mut c = Controller::new(Settings {
            evaluation: EvaluationConfig {
                games_per_agent: 2,
                sequence_length: 3,
                agents: vec![AgentType::Rule, AgentType::Hybrid],
            },
            ..Settings::default()
        });
        c.handle_command(Command::SetMode(GameMode::Eval));
        c.handle_command(Command::StartEvaluation);
        for _ in 0..3 {
            reply_new_game(&mut c, Origin::Evaluation, state(4, true, true));
            c.handle_timer(LoopKind::Evaluation);
        }
        assert_eq!(c.message(), "Evaluating Hybrid (1/2 games done)");
    }
}
