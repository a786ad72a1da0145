//! Enabled flag plus optional activation/deactivation instants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credo_core::ValueObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnablementWindow {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_after: Option<DateTime<Utc>>,
}

impl ValueObject for EnablementWindow {}

fn enabled_by_default() -> bool {
    true
}

impl Default for EnablementWindow {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_after: None,
            disable_after: None,
        }
    }
}

impl EnablementWindow {
    /// Usable iff the flag is set and the time window admits `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.enabled && window_admits(self.enable_after, self.disable_after, now)
    }
}

/// Time-window check, bounds exclusive.
///
/// When both bounds are set and `disable_after` precedes `enable_after`, only
/// the `enable_after` bound applies.
pub fn window_admits(
    enable_after: Option<DateTime<Utc>>,
    disable_after: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match (enable_after, disable_after) {
        (None, None) => true,
        (None, Some(disable)) => now < disable,
        (Some(enable), None) => enable < now,
        (Some(enable), Some(disable)) if disable < enable => enable < now,
        (Some(enable), Some(disable)) => enable < now && now < disable,
    }
}
