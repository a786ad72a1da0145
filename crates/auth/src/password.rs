//! Password hashing and policy.

use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use credo_core::{DomainError, DomainResult};

/// Default policy: at least six characters.
pub const DEFAULT_PASSWORD_REGEX: &str = ".{6,}";

/// Salt used when none is configured. Fine for tests, not for production.
pub const DEV_PASSWORD_SALT: &str = "credo-dev-salt";

/// Hashing + policy collaborator handed to identity operations.
///
/// Hashing is salted SHA-256, hex encoded. The exact input bytes are hashed,
/// so surrounding whitespace is significant.
#[derive(Debug, Clone)]
pub struct Passwords {
    salt: String,
    policy: Regex,
}

impl Passwords {
    pub fn new(salt: impl Into<String>, regex: &str) -> DomainResult<Self> {
        Ok(Self {
            salt: salt.into(),
            policy: compile_policy(regex)?,
        })
    }

    pub fn hash(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update([0u8]);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validate against the configured policy, or against `regex` when given.
    pub fn check(&self, password: &str, regex: Option<&str>) -> DomainResult<()> {
        if password.is_empty() {
            return Err(DomainError::invalid_argument("password must not be empty"));
        }
        let matches = match regex {
            Some(custom) => compile_policy(custom)?.is_match(password),
            None => self.policy.is_match(password),
        };
        if !matches {
            return Err(DomainError::invalid_argument(format!(
                "password does not match policy [{}]",
                regex.unwrap_or_else(|| policy_source(&self.policy))
            )));
        }
        Ok(())
    }

    pub fn check_and_hash(&self, password: &str, regex: Option<&str>) -> DomainResult<String> {
        self.check(password, regex)?;
        Ok(self.hash(password))
    }
}

impl Default for Passwords {
    fn default() -> Self {
        Self {
            salt: DEV_PASSWORD_SALT.to_string(),
            policy: compile_policy(DEFAULT_PASSWORD_REGEX)
                .expect("default password policy is a valid regex"),
        }
    }
}

/// Fresh opaque reset code.
pub fn new_reset_code() -> String {
    Uuid::new_v4().to_string()
}

// Policies must match the whole password, not a substring.
fn compile_policy(regex: &str) -> DomainResult<Regex> {
    Regex::new(&format!("^(?:{regex})$"))
        .map_err(|e| DomainError::invalid_argument(format!("password regex [{regex}] is invalid: {e}")))
}

fn policy_source(policy: &Regex) -> &str {
    let src = policy.as_str();
    src.strip_prefix("^(?:")
        .and_then(|s| s.strip_suffix(")$"))
        .unwrap_or(src)
}
