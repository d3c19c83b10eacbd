//! Client-side mirror of a server-run training session.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::api::{AgentType, TrainingStats};

/// Maximum number of entries kept in the training log.
pub const LOG_CAPACITY: usize = 100;
/// A progress line is logged whenever `games_played` is a multiple of this.
pub const PROGRESS_EVERY: u32 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: u32,
    pub sequence_length: usize,
    pub agent: AgentType,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            sequence_length: 3,
            agent: AgentType::Rl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Position in the stream of pushed entries, starting at 1. Survives eviction.
    pub seq: u64,
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Bounded log shown in the training panel; oldest entries drop first.
#[derive(Debug, Clone, Default)]
pub struct TrainingLog {
    entries: VecDeque<LogEntry>,
    pushed: u64,
}

impl TrainingLog {
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.pushed += 1;
        self.entries.push_back(LogEntry {
            seq: self.pushed,
            at: Local::now(),
            level,
            message: message.into(),
        });
        while self.entries.len() > LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Drops the entries; sequence numbers keep counting up.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries pushed after the one numbered `seq` that are still retained.
    pub fn entries_after(&self, seq: u64) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.seq > seq)
    }

    /// Sequence number of the newest entry ever pushed, 0 if none.
    pub fn last_seq(&self) -> u64 {
        self.pushed
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingRun {
    pub config: TrainingConfig,
    pub stats: TrainingStats,
    running: bool,
    pub log: TrainingLog,
}

impl TrainingRun {
    /// Resets the mirror and log for a fresh session.
    pub fn begin(&mut self, config: TrainingConfig) {
        self.config = config;
        self.stats = TrainingStats::default();
        self.running = true;
        self.log.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Clears the running flag; returns whether it was set.
    pub fn end(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Mirrors server counters. Returns the progress line to log, if one is due.
    pub fn update(&mut self, stats: TrainingStats) -> Option<String> {
        let advanced = stats.games_played > self.stats.games_played;
        let line = (advanced && stats.games_played % PROGRESS_EVERY == 0).then(|| {
            format!(
                "Progress: {}/{} games (win rate {:.1}%, avg turns {:.1})",
                stats.games_played, self.config.episodes, stats.win_rate, stats.avg_turns
            )
        });
        self.stats = stats;
        line
    }

    /// Completion percentage, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.config.episodes == 0 {
            return 0.0;
        }
        (f64::from(self.stats.games_played) / f64::from(self.config.episodes) * 100.0).min(100.0)
    }
}

/// Formats seconds as `mm:ss`, or `h:mm:ss` past one hour.
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hrs = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hrs > 0 {
        format!("{hrs}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(played: u32, won: u32) -> TrainingStats {
        TrainingStats {
            games_played: played,
            games_won: won,
            win_rate: f64::from(won) / f64::from(played.max(1)) * 100.0,
            avg_turns: 12.5,
            elapsed_time: 3.0,
        }
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0.0), "00:00");
        assert_eq!(format_elapsed(75.9), "01:15");
        assert_eq!(format_elapsed(3_725.0), "1:02:05");
        assert_eq!(format_elapsed(-4.0), "00:00");
    }

    #[test]
    fn log_is_bounded() {
        let mut log = TrainingLog::default();
        for i in 0..(LOG_CAPACITY + 20) {
            log.push(LogLevel::Info, format!("entry {i}"));
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.entries().next().unwrap().message, "entry 20");
    }

    #[test]
    fn reading_past_capacity_never_misses_an_entry() {
        let mut log = TrainingLog::default();
        let mut seen = 0;
        for i in 0..(LOG_CAPACITY as u64 + 30) {
            log.push(LogLevel::Info, format!("entry {i}"));
            let fresh: Vec<&LogEntry> = log.entries_after(seen).collect();
            assert_eq!(fresh.len(), 1, "push {i} should yield exactly one new entry");
            assert_eq!(fresh[0].message, format!("entry {i}"));
            seen = fresh[0].seq;
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.last_seq(), LOG_CAPACITY as u64 + 30);

        log.clear();
        log.push(LogLevel::Success, "after clear");
        assert_eq!(log.entries_after(seen).count(), 1);
    }

    #[test]
    fn progress_lines_every_ten_games() {
        let mut run = TrainingRun::default();
        run.begin(TrainingConfig { episodes: 40, ..TrainingConfig::default() });
        assert!(run.update(stats(7, 2)).is_none());
        assert!(run.update(stats(10, 4)).unwrap().starts_with("Progress: 10/40"));
        // same count again: nothing new to report
        assert!(run.update(stats(10, 4)).is_none());
        assert_eq!(run.stats.games_won, 4);
    }

    #[test]
    fn progress_is_capped() {
        let mut run = TrainingRun::default();
        run.begin(TrainingConfig { episodes: 10, ..TrainingConfig::default() });
        run.update(stats(15, 3));
        assert_eq!(run.progress_percent(), 100.0);
    }

    #[test]
    fn begin_resets_and_end_reports_previous_flag() {
        let mut run = TrainingRun::default();
        run.log.push(LogLevel::Error, "old");
        run.begin(TrainingConfig::default());
        assert!(run.is_running());
        assert!(run.log.is_empty());
        assert!(run.end());
        assert!(!run.end());
    }
}
