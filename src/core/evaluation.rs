//! Agent benchmarking: sequential games per agent and the per-agent aggregates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{AgentType, GameState};

/// Pause between two evaluation games.
pub const GAME_GAP: Duration = Duration::from_millis(500);
/// Pause between two AI moves inside an evaluation game.
pub const STEP_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub games_per_agent: u32,
    pub sequence_length: usize,
    pub agents: Vec<AgentType>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            games_per_agent: 10,
            sequence_length: 3,
            agents: vec![AgentType::Rule, AgentType::Rl, AgentType::Hybrid],
        }
    }
}

/// Running totals for one agent. Rates are always derived from the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    pub agent: AgentType,
    pub wins: u32,
    /// Sum of turns over won games only.
    pub total_turns: u32,
    /// Fewest turns in a won game.
    pub min_turns: Option<u32>,
    pub completed_games: u32,
}

impl AgentRecord {
    pub fn new(agent: AgentType) -> Self {
        Self {
            agent,
            wins: 0,
            total_turns: 0,
            min_turns: None,
            completed_games: 0,
        }
    }

    pub fn record(&mut self, won: bool, turns: u32) {
        self.completed_games += 1;
        if won {
            self.wins += 1;
            self.total_turns += turns;
            self.min_turns = Some(self.min_turns.map_or(turns, |m| m.min(turns)));
        }
    }

    /// Fraction of completed games won, in `0.0..=1.0`.
    pub fn win_rate(&self) -> f64 {
        if self.completed_games == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.completed_games)
        }
    }

    /// Mean turns over won games, if any were won.
    pub fn avg_turns(&self) -> Option<f64> {
        (self.wins > 0).then(|| f64::from(self.total_turns) / f64::from(self.wins))
    }
}

/// What the evaluation timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Ask for the next AI move (or record the finished game).
    Step,
    /// Start the next game for the current agent.
    NextGame,
}

/// Outcome of recording a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    SameAgent,
    NextAgent,
    Finished,
}

#[derive(Debug, Clone)]
pub struct EvaluationRun {
    config: EvaluationConfig,
    agents: Vec<AgentRecord>,
    current: usize,
    completed_games: u32,
    running: bool,
    pending: Pending,
}

impl EvaluationRun {
    /// Returns `None` when no agent is selected.
    pub fn start(config: EvaluationConfig) -> Option<Self> {
        if config.agents.is_empty() {
            return None;
        }
        let agents = config.agents.iter().copied().map(AgentRecord::new).collect();
        Some(Self {
            config,
            agents,
            current: 0,
            completed_games: 0,
            running: true,
            pending: Pending::Step,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[AgentRecord] {
        &self.agents
    }

    pub fn current(&self) -> &AgentRecord {
        &self.agents[self.current]
    }

    /// Position of the agent currently being evaluated in selection order.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn completed_games(&self) -> u32 {
        self.completed_games
    }

    pub fn total_games(&self) -> u32 {
        let agents = u32::try_from(self.agents.len()).unwrap_or(u32::MAX);
        self.config.games_per_agent.saturating_mul(agents)
    }

    pub fn progress(&self) -> f64 {
        let total = self.total_games();
        if total == 0 {
            0.0
        } else {
            f64::from(self.completed_games) / f64::from(total)
        }
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    pub fn set_pending(&mut self, pending: Pending) {
        self.pending = pending;
    }

    /// Records a finished game for the current agent and moves the cursor on.
    pub fn record(&mut self, state: &GameState) -> Advance {
        let turns = state.turn();
        self.agents[self.current].record(state.winner, turns);
        self.completed_games += 1;

        if self.agents[self.current].completed_games < self.config.games_per_agent {
            Advance::SameAgent
        } else if self.current + 1 < self.agents.len() {
            self.current += 1;
            Advance::NextAgent
        } else {
            Advance::Finished
        }
    }

    /// Agents ordered by win rate, best first. Ties keep selection order.
    pub fn ranking(&self) -> Vec<&AgentRecord> {
        let mut ranked: Vec<&AgentRecord> = self.agents.iter().collect();
        ranked.sort_by(|a, b| b.win_rate().total_cmp(&a.win_rate()));
        ranked
    }

    pub fn best(&self) -> Option<&AgentRecord> {
        self.ranking().into_iter().next()
    }
}
