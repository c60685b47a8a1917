//! Lifecycle stage of indexed records.

use crate::error::ParseStageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage a record is indexed under.
///
/// Serialized as `IN_PROGRESS` / `RELEASED`, which is also the value passed
/// to the graph service and accepted in the `databaseScope` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    InProgress,
    Released,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::InProgress, Stage::Released];

    /// Wire name used by the graph service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::InProgress => "IN_PROGRESS",
            Stage::Released => "RELEASED",
        }
    }

    /// Prefix of every physical index belonging to this stage.
    pub fn index_prefix(&self) -> &'static str {
        match self {
            Stage::InProgress => "in_progress",
            Stage::Released => "publicly_released",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Ok(Stage::InProgress),
            "RELEASED" => Ok(Stage::Released),
            _ => Err(ParseStageError(s.to_string())),
        }
    }
}
