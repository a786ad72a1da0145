//! Credential settings.
//!
//! Defaults suit development. [`CredentialsSettings::from_env`] reads
//! `CREDO_*` variables, falling back to the defaults for unset ones.

use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use credo_core::{DomainError, DomainResult};

use crate::password::{DEFAULT_PASSWORD_REGEX, DEV_PASSWORD_SALT, Passwords};

pub const ENV_SESSION_MAX_LIFETIME_SECS: &str = "CREDO_SESSION_MAX_LIFETIME_SECS";
pub const ENV_SESSIONS_SIZE_MAX: &str = "CREDO_SESSIONS_SIZE_MAX";
pub const ENV_PASSWORD_REGEX: &str = "CREDO_PASSWORD_REGEX";
pub const ENV_PASSWORD_SALT: &str = "CREDO_PASSWORD_SALT";
pub const ENV_MAX_INVALID_CHALLENGES: &str = "CREDO_MAX_INVALID_CHALLENGES";
pub const ENV_RESET_INVALID_CHALLENGES_AFTER_MINS: &str = "CREDO_RESET_INVALID_CHALLENGES_AFTER_MINS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialsSettings {
    /// Longest lifetime a caller may request for an access token.
    pub session_max_lifetime_secs: i64,
    /// Sessions kept per identity when purging.
    pub sessions_size_max: usize,
    pub password_regex: String,
    pub password_salt: String,
    /// Zero disables lockout.
    pub maximum_invalid_challenges: u32,
    pub reset_invalid_challenges_after_mins: i64,
}

impl Default for CredentialsSettings {
    fn default() -> Self {
        Self {
            session_max_lifetime_secs: 60 * 60 * 24,
            sessions_size_max: 10,
            password_regex: DEFAULT_PASSWORD_REGEX.to_string(),
            password_salt: DEV_PASSWORD_SALT.to_string(),
            maximum_invalid_challenges: 0,
            reset_invalid_challenges_after_mins: 60,
        }
    }
}

impl CredentialsSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (environment, test maps).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(v) = lookup(ENV_SESSION_MAX_LIFETIME_SECS) {
            settings.session_max_lifetime_secs = v
                .parse()
                .with_context(|| format!("{ENV_SESSION_MAX_LIFETIME_SECS} must be an integer"))?;
        }
        if let Some(v) = lookup(ENV_SESSIONS_SIZE_MAX) {
            settings.sessions_size_max = v
                .parse()
                .with_context(|| format!("{ENV_SESSIONS_SIZE_MAX} must be a positive integer"))?;
        }
        if let Some(v) = lookup(ENV_PASSWORD_REGEX) {
            settings.password_regex = v;
        }
        match lookup(ENV_PASSWORD_SALT) {
            Some(v) => settings.password_salt = v,
            None => tracing::warn!("{ENV_PASSWORD_SALT} not set; using insecure dev salt"),
        }
        if let Some(v) = lookup(ENV_MAX_INVALID_CHALLENGES) {
            settings.maximum_invalid_challenges = v
                .parse()
                .with_context(|| format!("{ENV_MAX_INVALID_CHALLENGES} must be an integer"))?;
        }
        if let Some(v) = lookup(ENV_RESET_INVALID_CHALLENGES_AFTER_MINS) {
            settings.reset_invalid_challenges_after_mins = v.parse().with_context(|| {
                format!("{ENV_RESET_INVALID_CHALLENGES_AFTER_MINS} must be an integer")
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.session_max_lifetime_secs > 0,
            "session max lifetime must be positive"
        );
        anyhow::ensure!(
            Duration::try_seconds(self.session_max_lifetime_secs).is_some(),
            "session max lifetime of [{}] seconds is out of range",
            self.session_max_lifetime_secs
        );
        anyhow::ensure!(self.sessions_size_max > 0, "sessions size max must be positive");
        anyhow::ensure!(
            self.reset_invalid_challenges_after_mins >= 0,
            "invalid challenge reset delay must not be negative"
        );
        anyhow::ensure!(
            Duration::try_minutes(self.reset_invalid_challenges_after_mins).is_some(),
            "invalid challenge reset delay of [{}] minutes is out of range",
            self.reset_invalid_challenges_after_mins
        );
        self.passwords().context("password settings are invalid")?;
        Ok(())
    }

    /// Saturates at [`Duration::MAX`] for settings that skipped [`Self::validate`].
    pub fn session_max_lifetime(&self) -> Duration {
        Duration::try_seconds(self.session_max_lifetime_secs).unwrap_or(Duration::MAX)
    }

    /// Saturates at [`Duration::MAX`] for settings that skipped [`Self::validate`].
    pub fn reset_invalid_challenges_after(&self) -> Duration {
        Duration::try_minutes(self.reset_invalid_challenges_after_mins).unwrap_or(Duration::MAX)
    }

    pub fn passwords(&self) -> DomainResult<Passwords> {
        Passwords::new(self.password_salt.clone(), &self.password_regex)
    }

    /// Lifetime for a new session: the requested one, or the maximum.
    pub fn check_session_lifetime(&self, requested: Option<Duration>) -> DomainResult<Duration> {
        let max = self.session_max_lifetime();
        let lifetime = requested.unwrap_or(max);
        if lifetime <= Duration::zero() {
            return Err(DomainError::invalid_argument(
                "access token lifetime must be positive",
            ));
        }
        if lifetime > max {
            return Err(DomainError::forbidden(format!(
                "maximum access token lifetime is [{}] seconds",
                max.num_seconds()
            )));
        }
        Ok(lifetime)
    }
}
