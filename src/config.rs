use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::api::{AgentType, BOARD_SIZE};
use crate::core::controller::{Settings, MAX_AI_DELAY, MIN_AI_DELAY};
use crate::core::evaluation::EvaluationConfig;
use crate::core::training::TrainingConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000".into(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    pub sequence_length: usize,
    pub ai_delay_ms: u64,
    pub agent: AgentType,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            sequence_length: 3,
            ai_delay_ms: 1000,
            agent: AgentType::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    #[serde(flatten)]
    pub run: TrainingConfig,
    pub poll_interval_ms: u64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            run: TrainingConfig::default(),
            poll_interval_ms: 1000,
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub play: PlayConfig,
    pub evaluation: EvaluationConfig,
    pub training: TrainingSection,
    /// Where the interactive session writes its log.
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, or `None` if the file does not exist.
    /// Logs nothing, so it can run before a subscriber is installed.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reports where the configuration came from. Call once logging is up.
    pub fn log_source(path: &Path, found: bool) {
        if found {
            info!(path = %path.display(), "loaded config file");
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_length("play.sequence_length", self.play.sequence_length)?;
        check_length("evaluation.sequence_length", self.evaluation.sequence_length)?;
        check_length("training.sequence_length", self.training.run.sequence_length)?;

        let delay = Duration::from_millis(self.play.ai_delay_ms);
        if delay < MIN_AI_DELAY || delay > MAX_AI_DELAY {
            return Err(ConfigError::Validation(format!(
                "play.ai_delay_ms must be within {}..={}",
                MIN_AI_DELAY.as_millis(),
                MAX_AI_DELAY.as_millis()
            )));
        }
        if self.server.timeout_ms == 0 {
            return Err(ConfigError::Validation("server.timeout_ms must be > 0".into()));
        }
        if self.evaluation.games_per_agent == 0 {
            return Err(ConfigError::Validation(
                "evaluation.games_per_agent must be > 0".into(),
            ));
        }
        let agents = &self.evaluation.agents;
        if agents.iter().enumerate().any(|(i, a)| agents[..i].contains(a)) {
            return Err(ConfigError::Validation(
                "evaluation.agents cannot list an agent twice".into(),
            ));
        }
        if self.evaluation.agents.contains(&AgentType::None) {
            return Err(ConfigError::Validation(
                "evaluation.agents cannot contain 'none'".into(),
            ));
        }
        if self.training.run.episodes == 0 {
            return Err(ConfigError::Validation("training.episodes must be > 0".into()));
        }
        if !self.training.run.agent.is_learning() {
            return Err(ConfigError::Validation(
                "training.agent must be 'rl' or 'hybrid'".into(),
            ));
        }
        if self.training.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "training.poll_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            sequence_length: self.play.sequence_length,
            ai_delay: Duration::from_millis(self.play.ai_delay_ms),
            agent: self.play.agent,
            evaluation: self.evaluation.clone(),
            training: self.training.run.clone(),
            training_poll: Duration::from_millis(self.training.poll_interval_ms),
        }
    }
}

fn check_length(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > BOARD_SIZE {
        return Err(ConfigError::Validation(format!(
            "{field} must be within 1..={BOARD_SIZE}"
        )));
    }
    Ok(())
}
