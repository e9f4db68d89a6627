use crate::error_code::ErrorKind;
use std::fmt;
use tracing::{debug, warn};

/// Where a request is in its life: `Start → FetchWeather → GenerateInsight →
/// Assemble → Done`, or `Failed` from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    FetchWeather,
    GenerateInsight,
    Assemble,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }

    /// The stage that follows on success; `None` once terminal.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Start => Some(Stage::FetchWeather),
            Stage::FetchWeather => Some(Stage::GenerateInsight),
            Stage::GenerateInsight => Some(Stage::Assemble),
            Stage::Assemble => Some(Stage::Done),
            Stage::Done | Stage::Failed(_) => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => f.write_str("start"),
            Stage::FetchWeather => f.write_str("fetch_weather"),
            Stage::GenerateInsight => f.write_str("generate_insight"),
            Stage::Assemble => f.write_str("assemble"),
            Stage::Done => f.write_str("done"),
            Stage::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Records the stages one request passes through. Transitions only move
/// forward, so no stage is skipped or entered twice.
#[derive(Debug)]
pub struct StageTracker {
    history: Vec<Stage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            history: vec![Stage::Start],
        }
    }

    pub fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Start)
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Move to the next stage. A terminal tracker stays where it is.
    pub fn advance(&mut self) -> Stage {
        let from = self.current();
        if let Some(to) = from.next() {
            debug!(from = %from, to = %to, "stage transition");
            self.history.push(to);
        }
        self.current()
    }

    /// Record a failure in the current stage.
    pub fn fail(&mut self, kind: ErrorKind) -> Stage {
        let from = self.current();
        if !from.is_terminal() {
            warn!(stage = %from, error_kind = %kind, "request failed");
            self.history.push(Stage::Failed(kind));
        }
        self.current()
    }
}
