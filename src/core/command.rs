//! Messages flowing between the input layer, the controller and the driver.

use std::time::Duration;

use crate::api::{
    Ack, AiMoveQuery, AiMoveResponse, Color, GameMode, MoveRequest, MoveResponse,
    NewGameRequest, NewGameResponse, StartTrainingRequest, TrainingStatus,
};
use crate::error::ApiError;

/// User intents.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NewGame,
    SelectColor(Color),
    MoveCursor(isize),
    DropAtCursor,
    Drop(usize),
    ToggleAutoplay,
    CycleAgent,
    SetAiDelay(Duration),
    Faster,
    Slower,
    ToggleLearning,
    ToggleDebug,
    SetMode(GameMode),
    CycleMode,
    StartEvaluation,
    StopEvaluation,
    StartTraining,
    StopTraining,
    /// Stops whichever background loop belongs to the current mode.
    Stop,
    SaveModel,
    Quit,
}

/// The three timer-driven loops. At most one timer per kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Autoplay,
    Evaluation,
    Training,
}

impl LoopKind {
    pub const ALL: [LoopKind; 3] = [LoopKind::Autoplay, LoopKind::Evaluation, LoopKind::Training];

    pub fn index(self) -> usize {
        match self {
            LoopKind::Autoplay => 0,
            LoopKind::Evaluation => 1,
            LoopKind::Training => 2,
        }
    }
}

/// Who asked for a request; decides how its response is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Autoplay,
    Evaluation,
    Training,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    NewGame(NewGameRequest),
    MakeMove(MoveRequest),
    AiMove(AiMoveQuery),
    StartTraining(StartTrainingRequest),
    TrainingStatus,
    StopTraining,
    SaveModel,
}

/// A request tagged with its origin and the game epoch it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub origin: Origin,
    pub epoch: u64,
    pub request: Request,
}

#[derive(Debug)]
pub enum Reply {
    NewGame(Result<NewGameResponse, ApiError>),
    Move(Result<MoveResponse, ApiError>),
    AiMove(Result<AiMoveResponse, ApiError>),
    TrainingStarted(Result<Ack, ApiError>),
    TrainingStatus(Result<TrainingStatus, ApiError>),
    TrainingStopped(Result<Ack, ApiError>),
    ModelSaved(Result<Ack, ApiError>),
}

#[derive(Debug)]
pub struct Response {
    pub origin: Origin,
    pub epoch: u64,
    pub reply: Reply,
}

/// Side effects requested by the controller and carried out by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Outgoing),
    /// Replaces any live timer of the same kind.
    Arm { kind: LoopKind, after: Duration },
    Disarm(LoopKind),
}
