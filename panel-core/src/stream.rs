//! Stream health: is the video source delivering frames right now.

use serde::{Deserialize, Serialize};

use crate::error::PanelError;

/// Poll cadence for `/stream_status`, in milliseconds.
pub const STREAM_POLL_MS: u32 = 5000;

/// Wire shape of a `/stream_status` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamStatusResponse {
    pub status: String,
}

/// Two-state alert toggle driven by the periodic stream poll.
///
/// Visibility is a pure function of the latest poll outcome: only an
/// explicit `running` hides the alert; a stopped report, an unrecognized
/// status token, and a failed poll all show it (fail-open). The poll task
/// itself is owned by the view so it cannot outlive it.
#[derive(Debug, Default)]
pub struct StreamHealthMonitor {
    alert_visible: bool,
}

impl StreamHealthMonitor {
    pub fn new() -> StreamHealthMonitor {
        StreamHealthMonitor::default()
    }

    /// Fold in one poll outcome; returns the resulting visibility.
    pub fn observe(&mut self, poll: Result<StreamStatusResponse, PanelError>) -> bool {
        self.alert_visible = match poll {
            Ok(response) => {
                if response.status != "running" && response.status != "stopped" {
                    tracing::debug!(status = %response.status, "unrecognized stream status");
                }
                response.status != "running"
            }
            Err(err) => {
                tracing::debug!(error = %err, "stream status poll failed");
                true
            }
        };
        self.alert_visible
    }

    pub fn alert_visible(&self) -> bool {
        self.alert_visible
    }
}
