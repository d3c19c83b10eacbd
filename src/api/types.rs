use serde::{Deserialize, Serialize};

/// Width and height of the Color Link board.
pub const BOARD_SIZE: usize = 5;

/// Turn limit shown when the service omits one.
pub const FALLBACK_MAX_TURNS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Yellow,
    Green,
    Purple,
}

impl Color {
    pub const ALL: [Color; 5] = [
        Color::Red,
        Color::Blue,
        Color::Yellow,
        Color::Green,
        Color::Purple,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Purple => "purple",
        }
    }

    /// Keyboard shortcut used to pick this color.
    pub fn key(self) -> char {
        match self {
            Color::Red => 'r',
            Color::Blue => 'b',
            Color::Yellow => 'y',
            Color::Green => 'g',
            Color::Purple => 'p',
        }
    }

    pub fn from_key(c: char) -> Option<Self> {
        Color::ALL.into_iter().find(|color| color.key() == c)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub color: Color,
}

/// One recorded insertion and the feedback it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub color: Color,
    pub column: usize,
    pub hits: u32,
    pub blows: u32,
}

/// Snapshot of the server-side game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Vec<Vec<Cell>>,
    #[serde(default)]
    pub history: Vec<Move>,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub winner: bool,
    #[serde(default)]
    pub target_sequence: Option<Vec<Color>>,
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
    #[serde(default)]
    pub max_turns: u32,
    #[serde(default)]
    pub current_turn: u32,
}

fn default_sequence_length() -> usize {
    3
}

impl GameState {
    /// Turn counter, falling back to the history length when the server sends zero.
    pub fn turn(&self) -> u32 {
        if self.current_turn > 0 {
            self.current_turn
        } else {
            self.history.len() as u32
        }
    }

    pub fn turn_limit(&self) -> u32 {
        if self.max_turns > 0 {
            self.max_turns
        } else {
            FALLBACK_MAX_TURNS
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<Color> {
        self.board.get(row)?.get(column).map(|c| c.color)
    }
}

/// Feedback for a single submitted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub blows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAction {
    pub color: Color,
    pub column: usize,
}

/// Move-selection strategy hosted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    None,
    Rule,
    Rl,
    Hybrid,
}

impl AgentType {
    pub const CYCLE: [AgentType; 4] = [
        AgentType::None,
        AgentType::Rule,
        AgentType::Rl,
        AgentType::Hybrid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgentType::None => "None",
            AgentType::Rule => "Rule-based",
            AgentType::Rl => "Reinforcement learning",
            AgentType::Hybrid => "Hybrid",
        }
    }

    pub fn is_learning(self) -> bool {
        matches!(self, AgentType::Rl | AgentType::Hybrid)
    }

    pub fn next(self) -> Self {
        let idx = Self::CYCLE.iter().position(|a| *a == self).unwrap_or(0);
        Self::CYCLE[(idx + 1) % Self::CYCLE.len()]
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(AgentType::None),
            "rule" => Ok(AgentType::Rule),
            "rl" => Ok(AgentType::Rl),
            "hybrid" => Ok(AgentType::Hybrid),
            other => Err(format!("unknown agent type '{other}' (expected none, rule, rl or hybrid)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Normal,
    Eval,
    Train,
}

impl GameMode {
    pub fn next(self) -> Self {
        match self {
            GameMode::Normal => GameMode::Eval,
            GameMode::Eval => GameMode::Train,
            GameMode::Train => GameMode::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameMode::Normal => "Normal",
            GameMode::Eval => "Evaluation",
            GameMode::Train => "Training",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest {
    pub sequence_length: usize,
    pub ai_type: AgentType,
    pub learning_mode: bool,
    pub debug_mode: bool,
    pub game_mode: GameMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub color: Color,
    pub column: usize,
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMoveQuery {
    pub debug_mode: bool,
    pub evaluation_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTrainingRequest {
    pub num_games: u32,
    pub sequence_length: usize,
    pub agent_type: AgentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGameResponse {
    pub game_state: GameState,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub game_state: GameState,
    pub result: MoveResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMoveResponse {
    pub action: AiAction,
    pub game_state: GameState,
    pub result: MoveResult,
}

/// Generic success/message reply used by the training and model endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Aggregate counters reported by the service while training runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingStats {
    pub games_played: u32,
    pub games_won: u32,
    /// Percentage in `0..=100`.
    pub win_rate: f64,
    pub avg_turns: f64,
    /// Seconds since training started.
    pub elapsed_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub active: bool,
    #[serde(default)]
    pub stats: Option<TrainingStats>,
}
