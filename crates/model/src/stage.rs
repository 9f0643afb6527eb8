use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline stages. The derived ordering is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Classify,
    Match,
    Evaluate,
    Analyze,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Extract,
        Stage::Classify,
        Stage::Match,
        Stage::Evaluate,
        Stage::Analyze,
    ];

    /// Stages whose output is persisted in the stage cache.
    pub const CACHED: [Stage; 4] = [
        Stage::Extract,
        Stage::Classify,
        Stage::Match,
        Stage::Evaluate,
    ];

    /// Name used for cache directories and log fields.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extraction",
            Stage::Classify => "classification",
            Stage::Match => "matching",
            Stage::Evaluate => "evaluation",
            Stage::Analyze => "analysis",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Extract => Some(Stage::Classify),
            Stage::Classify => Some(Stage::Match),
            Stage::Match => Some(Stage::Evaluate),
            Stage::Evaluate => Some(Stage::Analyze),
            Stage::Analyze => None,
        }
    }

    pub fn is_cached(self) -> bool {
        self != Stage::Analyze
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resume point: every stage up to and including `stage()` is taken from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Checkpoint {
    Classified,
    Matched,
    Evaluated,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 3] = [
        Checkpoint::Classified,
        Checkpoint::Matched,
        Checkpoint::Evaluated,
    ];

    /// The last stage this checkpoint asserts as complete.
    pub fn stage(self) -> Stage {
        match self {
            Checkpoint::Classified => Stage::Classify,
            Checkpoint::Matched => Stage::Match,
            Checkpoint::Evaluated => Stage::Evaluate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Checkpoint::Classified => "classified",
            Checkpoint::Matched => "matched",
            Checkpoint::Evaluated => "evaluated",
        }
    }

    /// Whether `stage` is satisfied by this checkpoint and must not execute.
    pub fn covers(self, stage: Stage) -> bool {
        stage <= self.stage()
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown checkpoint '{0}' (expected classified, matched or evaluated)")]
pub struct UnknownCheckpoint(pub String);

impl FromStr for Checkpoint {
    type Err = UnknownCheckpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Checkpoint::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCheckpoint(s.to_string()))
    }
}
