//! Publication lifecycle state machine
//!
//! ```text
//! DRAFT  --claim-->   PUBLISHING --succeed--> PUBLISHED
//! FAILED --claim-->   PUBLISHING --fail-->    FAILED
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery state of a publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    Draft,
    Publishing,
    Published,
    Failed,
}

/// Event driving a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationEvent {
    /// An attempt starts
    Claim,
    /// The platform accepted the content
    Succeed,
    /// The attempt ended without a post
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Illegal transition: {event:?} from {from}")]
    IllegalTransition {
        from: PublicationStatus,
        event: PublicationEvent,
    },
    #[error("Unknown publication status: {0}")]
    UnknownStatus(String),
}

impl PublicationStatus {
    /// Apply an event, returning the next status or the illegal pair
    pub fn transition(self, event: PublicationEvent) -> Result<Self, LifecycleError> {
        use PublicationEvent::*;
        use PublicationStatus::*;

        match (self, event) {
            (Draft | Failed, Claim) => Ok(Publishing),
            (Publishing, Succeed) => Ok(Published),
            (Publishing, Fail) => Ok(Failed),
            (from, event) => Err(LifecycleError::IllegalTransition { from, event }),
        }
    }

    pub fn can_claim(self) -> bool {
        self.transition(PublicationEvent::Claim).is_ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Draft => "DRAFT",
            PublicationStatus::Publishing => "PUBLISHING",
            PublicationStatus::Published => "PUBLISHED",
            PublicationStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(PublicationStatus::Draft),
            "PUBLISHING" => Ok(PublicationStatus::Publishing),
            "PUBLISHED" => Ok(PublicationStatus::Published),
            "FAILED" => Ok(PublicationStatus::Failed),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}
