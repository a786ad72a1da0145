use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use credo_core::IdentityId;

use crate::identity::Identity;
use crate::roles::Role;

/// Externally visible projection of an identity.
///
/// Carries no password hash, reset code or access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: IdentityId,
    pub username: String,
    pub email: Option<String>,
    pub really_enabled: bool,
    pub enabled: bool,
    pub enable_after: Option<DateTime<Utc>>,
    pub disable_after: Option<DateTime<Utc>>,
    pub invalid_challenges: u32,
    pub last_invalid_challenge_at: Option<DateTime<Utc>>,
    pub roles: BTreeSet<Role>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IdentityView {
    pub fn of(identity: &Identity, now: DateTime<Utc>) -> Self {
        let window = identity.window();
        Self {
            id: identity.id().clone(),
            username: identity.username().to_string(),
            email: identity.email().map(str::to_string),
            really_enabled: identity.is_really_enabled(now),
            enabled: window.enabled,
            enable_after: window.enable_after,
            disable_after: window.disable_after,
            invalid_challenges: identity.invalid_challenges(),
            last_invalid_challenge_at: identity.last_invalid_challenge_at(),
            roles: identity.roles().clone(),
            created_at: identity.created_at(),
            updated_at: identity.updated_at(),
        }
    }
}
