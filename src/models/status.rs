use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Success,
    Failure,
    Pending,
}

impl Display for AckStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            AckStatus::Success => write!(f, "SUCCESS"),
            AckStatus::Failure => write!(f, "FAILURE"),
            AckStatus::Pending => write!(f, "PENDING"),
        }
    }
}

/// Where the consumer loop is in its fetch/process/commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Fetching,
    Processing,
    Committing,
    Stopped,
}

impl Display for LoopState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Fetching => write!(f, "fetching"),
            LoopState::Processing => write!(f, "processing"),
            LoopState::Committing => write!(f, "committing"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}
