//! Invalid-challenge lockout, applied by the caller after a failed challenge.
//!
//! [`Identity::challenge_password`] only answers yes or no. Services that
//! want brute-force protection call [`ChallengePolicy::register_invalid_challenge`]
//! on every `false`.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::CredentialsSettings;
use crate::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengePolicy {
    /// Zero disables lockout.
    pub maximum_invalid_challenges: u32,
    /// Failures older than this no longer count.
    pub reset_after: Duration,
}

impl ChallengePolicy {
    pub fn from_settings(settings: &CredentialsSettings) -> Self {
        Self {
            maximum_invalid_challenges: settings.maximum_invalid_challenges,
            reset_after: settings.reset_invalid_challenges_after(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.maximum_invalid_challenges > 0
    }

    /// Count one failed challenge. Returns `true` when this failure disabled
    /// the identity.
    pub fn register_invalid_challenge(&self, identity: &mut Identity, now: DateTime<Utc>) -> bool {
        if !self.is_enabled() {
            return false;
        }

        // a reset point past the date range never comes, so failures stay counted
        if identity
            .last_invalid_challenge_at()
            .and_then(|last| last.checked_add_signed(self.reset_after))
            .is_some_and(|reset_at| reset_at < now)
        {
            identity.reset_invalid_challenges();
        }

        identity.record_invalid_challenge(now);

        if identity.invalid_challenges() >= self.maximum_invalid_challenges {
            warn!(
                identity = %identity.id(),
                invalid_challenges = identity.invalid_challenges(),
                "too many invalid challenges, disabling"
            );
            identity.do_enable_or_disable(false);
            return true;
        }
        false
    }
}
