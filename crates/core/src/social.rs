//! Social platform identities and reel lifecycle status.
//!
//! Both enums are persisted as upper-case TEXT columns. The `db` crate stores
//! the raw string and converts through [`std::str::FromStr`] at the edges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// SocialIdentity
// ---------------------------------------------------------------------------

/// The social network a client account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocialIdentity {
    Instagram,
    Facebook,
}

impl SocialIdentity {
    /// Every supported identity, in display order.
    pub const ALL: [SocialIdentity; 2] = [SocialIdentity::Instagram, SocialIdentity::Facebook];

    /// The persisted / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SocialIdentity::Instagram => "INSTAGRAM",
            SocialIdentity::Facebook => "FACEBOOK",
        }
    }
}

impl fmt::Display for SocialIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSTAGRAM" => Ok(SocialIdentity::Instagram),
            "FACEBOOK" => Ok(SocialIdentity::Facebook),
            other => Err(CoreError::Validation(format!(
                "Unknown social identity '{other}'. Expected INSTAGRAM or FACEBOOK"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ReelStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a scheduled reel.
///
/// `Scheduled` is the only non-terminal state. A reel leaves it exactly once,
/// either to `Published` or to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReelStatus {
    Scheduled,
    Published,
    Failed,
}

impl ReelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReelStatus::Scheduled => "SCHEDULED",
            ReelStatus::Published => "PUBLISHED",
            ReelStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReelStatus::Scheduled)
    }
}

impl fmt::Display for ReelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReelStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(ReelStatus::Scheduled),
            "PUBLISHED" => Ok(ReelStatus::Published),
            "FAILED" => Ok(ReelStatus::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown reel status '{other}'. Expected SCHEDULED, PUBLISHED or FAILED"
            ))),
        }
    }
}
