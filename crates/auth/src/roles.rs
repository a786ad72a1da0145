use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use credo_core::{DomainError, DomainResult};

pub const GUEST: &str = "guest";
pub const USER: &str = "user";
pub const ADMIN: &str = "admin";
pub const SUPERADMIN: &str = "superadmin";
pub const SUPERDOG: &str = "superdog";

/// Pseudo-role implicitly held by every identity (including guests).
pub const ALL: &str = "all";

fn role_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-z]{3,}$").expect("role pattern is a valid regex"))
}

/// Role name used for trust levels and ACL lookups.
///
/// Always matches `[a-z]{3,}`: the only ways in are [`Role::parse`] and
/// deserialization, both of which validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn parse(name: impl Into<Cow<'static, str>>) -> DomainResult<Self> {
        let name = name.into();
        if !role_pattern().is_match(&name) {
            return Err(DomainError::invalid_argument(format!(
                "role [{name}] is invalid: must match [a-z]{{3,}}"
            )));
        }
        Ok(Self(name))
    }

    /// Well-known role names, known to be valid.
    pub const fn well_known(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_all(&self) -> bool {
        self.as_str() == ALL
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Role {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.0.into_owned()
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s.to_string())
    }
}

/// Parse a batch of role names, failing on the first invalid one.
pub fn parse_all<I, S>(names: I) -> DomainResult<Vec<Role>>
where
    I: IntoIterator<Item = S>,
    S: Into<Cow<'static, str>>,
{
    names.into_iter().map(Role::parse).collect()
}
