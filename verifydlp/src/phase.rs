//! Verification phases and liveness progress

use serde::{Deserialize, Serialize};
use std::fmt;

/// The single user-facing phase of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPhase {
    /// Waiting for the user to begin
    Camera,
    /// Camera active, frames streaming, awaiting the liveness decision
    Liveness,
    /// Liveness passed, awaiting an ID document
    Upload,
    /// Document submitted, awaiting the result
    Verifying,
    /// Identity verified; terminal until reset
    Success,
    /// Attempt failed; terminal until reset
    Error,
}

impl VerificationPhase {
    /// Whether only a reset can leave this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Whether the camera and liveness connection may be in use
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Camera | Self::Liveness)
    }
}

impl Default for VerificationPhase {
    fn default() -> Self {
        Self::Camera
    }
}

impl fmt::Display for VerificationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Camera => "camera",
            Self::Liveness => "liveness",
            Self::Upload => "upload",
            Self::Verifying => "verifying",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// UI projection of the service's consecutive-real counter
///
/// The liveness decision itself is made remotely; this only scales the
/// reported count against a display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessProgress {
    /// Consecutive frames the service classified as real
    pub consecutive_real: u32,
    /// Count displayed as 100%
    pub target: u32,
}

impl LivenessProgress {
    /// Progress at zero against `target`
    pub fn new(target: u32) -> Self {
        Self {
            consecutive_real: 0,
            target: target.max(1),
        }
    }

    /// Percentage, capped at 100
    pub fn percent(&self) -> u32 {
        let scaled = u64::from(self.consecutive_real) * 100 / u64::from(self.target.max(1));
        scaled.min(100) as u32
    }

    /// "count/target"
    pub fn fraction(&self) -> String {
        format!("{}/{}", self.consecutive_real, self.target)
    }
}

impl Default for LivenessProgress {
    fn default() -> Self {
        Self::new(5)
    }
}
