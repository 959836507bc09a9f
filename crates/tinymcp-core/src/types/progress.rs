//! Progress updates streamed during long-running calls.

use crate::protocol::ProgressToken;
use serde::{Deserialize, Serialize};

/// One `notifications/progress` payload.
///
/// `sequence` increases strictly by one per token, starting at zero. A gap
/// anywhere before the final update is a protocol violation the consumer
/// may flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The token correlating this update to its call.
    #[serde(rename = "progressToken")]
    pub token: ProgressToken,
    /// Strictly increasing, gap-free sequence number per token.
    pub sequence: u64,
    /// Work completed so far.
    pub progress: u64,
    /// Total work, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Human-readable status line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
