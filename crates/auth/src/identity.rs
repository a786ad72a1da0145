//! Credential identity aggregate.
//!
//! One record per principal: roles (and the trust level derived from them),
//! the enablement gate, password lifecycle state and access-token sessions.
//! Every operation is a synchronous check-then-mutate over the in-memory
//! record; the owning service loads it, calls in here and persists it back
//! with an optimistic-concurrency check on [`AggregateRoot::version`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use credo_core::{AggregateRoot, DomainError, DomainResult, IdentityId};

use crate::enablement::EnablementWindow;
use crate::password::{self, Passwords};
use crate::projection::IdentityView;
use crate::roles::{self, Role};
use crate::session::{Session, SessionPool};
use crate::trust::{self, TrustLevel};

// ─────────────────────────────────────────────────────────────────────────────
// Identity Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// # Invariants
/// - Roles are validated [`Role`]s; the trust level is always recomputed from
///   them, never stored.
/// - No roles means guest level, whatever the username says.
/// - Expired sessions stay in the pool until deleted or purged.
/// - `password_has_been_challenged` and the current session are per-request
///   state and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    id: IdentityId,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(flatten)]
    window: EnablementWindow,
    #[serde(default)]
    roles: BTreeSet<Role>,
    /// Explicit memberships. The identity's own id is an implicit group.
    #[serde(default)]
    groups: BTreeSet<String>,
    #[serde(default)]
    hashed_password: Option<String>,
    #[serde(default)]
    password_reset_code: Option<String>,
    #[serde(default)]
    password_must_change: bool,
    #[serde(default)]
    invalid_challenges: u32,
    #[serde(default)]
    last_invalid_challenge_at: Option<DateTime<Utc>>,
    #[serde(default)]
    sessions: SessionPool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    password_has_been_challenged: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::with_id(IdentityId::new(), username, now)
    }

    pub fn with_id(id: IdentityId, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(now),
            updated_at: Some(now),
            ..Self::blank(id, username.into())
        }
    }

    /// Anonymous caller.
    pub fn guest() -> Self {
        Self::blank(IdentityId::from_static(roles::GUEST), roles::GUEST.to_string())
    }

    /// Platform operator: superdog level, password considered challenged.
    pub fn superdog() -> Self {
        let mut identity = Self::blank(
            IdentityId::from_static(roles::SUPERDOG),
            roles::SUPERDOG.to_string(),
        );
        identity.roles.insert(Role::well_known(roles::SUPERDOG));
        identity.password_has_been_challenged = true;
        identity
    }

    fn blank(id: IdentityId, username: String) -> Self {
        Self {
            id,
            version: 0,
            username: Some(username),
            email: None,
            window: EnablementWindow::default(),
            roles: BTreeSet::new(),
            groups: BTreeSet::new(),
            hashed_password: None,
            password_reset_code: None,
            password_must_change: false,
            invalid_challenges: 0,
            last_invalid_challenge_at: None,
            sessions: SessionPool::default(),
            created_at: None,
            updated_at: None,
            password_has_been_challenged: false,
        }
    }

    pub fn id(&self) -> &IdentityId {
        &self.id
    }

    /// Login name, `guest` when absent.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(roles::GUEST)
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    /// Storage revision, assigned by the persistence layer after each write.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn is_guest(&self) -> bool {
        self.id.as_str() == roles::GUEST
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// Never updated since creation.
    pub fn is_brand_new(&self) -> bool {
        match self.updated_at {
            None => true,
            Some(updated_at) => Some(updated_at) == self.created_at,
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> IdentityView {
        IdentityView::of(self, now)
    }
}

impl AggregateRoot for Identity {
    type Id = IdentityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl core::fmt::Display for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}][{}]", self.trust_level(), self.username())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles and trust level
// ─────────────────────────────────────────────────────────────────────────────

impl Identity {
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    pub fn trust_level(&self) -> TrustLevel {
        trust::resolve(&self.roles)
    }

    pub fn add_roles(&mut self, roles: impl IntoIterator<Item = Role>) {
        self.roles.extend(roles);
    }

    /// Validate every name first; nothing is added if one is malformed.
    pub fn add_role_names<I, S>(&mut self, names: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::borrow::Cow<'static, str>>,
    {
        let parsed = roles::parse_all(names)?;
        self.add_roles(parsed);
        Ok(())
    }

    pub fn remove_roles<'a>(&mut self, roles: impl IntoIterator<Item = &'a Role>) {
        for role in roles {
            self.roles.remove(role);
        }
    }

    pub fn clear_roles(&mut self) {
        self.roles.clear();
    }

    /// The error to raise when this identity is not allowed to do something.
    pub fn insufficient_credentials(&self) -> DomainError {
        if self.is_guest() {
            DomainError::GuestNotAuthorized
        } else {
            DomainError::insufficient_credentials(trust::name(self.trust_level()), self.username())
        }
    }

    pub fn is_at_least(&self, level: TrustLevel) -> bool {
        trust::greater_or_equal(self.trust_level(), level)
    }

    pub fn check_at_least(&self, level: TrustLevel) -> DomainResult<&Self> {
        if self.is_at_least(level) {
            Ok(self)
        } else {
            Err(self.insufficient_credentials())
        }
    }

    pub fn can_manage<'a>(&self, roles: impl IntoIterator<Item = &'a Role>) -> bool {
        trust::can_manage(self.trust_level(), roles)
    }

    /// Privilege-escalation guard: every role must be manageable by this identity.
    pub fn check_can_manage<'a>(&self, roles: impl IntoIterator<Item = &'a Role>) -> DomainResult<&Self> {
        for role in roles {
            let required = trust::authorized_to_manage(role);
            if !trust::greater_or_equal(self.trust_level(), required) {
                warn!(
                    actor = %self.id,
                    level = %self.trust_level(),
                    %role,
                    %required,
                    "role management denied"
                );
                return Err(self.insufficient_credentials());
            }
        }
        Ok(self)
    }

    /// May this identity manage `other` as a whole (at `other`'s level).
    pub fn check_can_manage_identity(&self, other: &Identity) -> DomainResult<&Self> {
        let level_role = Role::well_known(trust::name(other.trust_level()));
        self.check_can_manage([&level_role])
    }

    /// Add roles on behalf of `actor`, after the escalation guard.
    pub fn grant_roles(&mut self, actor: &Identity, roles: impl IntoIterator<Item = Role>) -> DomainResult<()> {
        let roles: Vec<Role> = roles.into_iter().collect();
        actor.check_can_manage(&roles)?;
        debug!(identity = %self.id, actor = %actor.id, count = roles.len(), "roles granted");
        self.add_roles(roles);
        Ok(())
    }

    /// Remove roles on behalf of `actor`, after the escalation guard.
    pub fn revoke_roles(&mut self, actor: &Identity, roles: impl IntoIterator<Item = Role>) -> DomainResult<()> {
        let roles: Vec<Role> = roles.into_iter().collect();
        actor.check_can_manage(&roles)?;
        debug!(identity = %self.id, actor = %actor.id, count = roles.len(), "roles revoked");
        self.remove_roles(&roles);
        Ok(())
    }

    /// Passes when `authorized` contains `all` or any role this identity holds.
    pub fn check_role_access<'a>(&self, authorized: impl IntoIterator<Item = &'a Role>) -> DomainResult<&Self> {
        for role in authorized {
            if role.is_all() || self.roles.contains(role) {
                return Ok(self);
            }
        }
        Err(self.insufficient_credentials())
    }

    pub fn check_owner_access(&self, owner: &IdentityId, object_type: &str, object_id: &str) -> DomainResult<()> {
        if &self.id == owner {
            return Ok(());
        }
        if self.is_guest() {
            return Err(DomainError::GuestNotAuthorized);
        }
        Err(DomainError::forbidden(format!(
            "{self} not owner of [{object_type}][{object_id}]"
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────────────────────────

/// Separator between the owner id and the suffix of a created group.
pub const GROUP_SEPARATOR: &str = "__";

impl Identity {
    /// Personal group, the identity id.
    pub fn group(&self) -> &str {
        self.id.as_str()
    }

    /// Personal group plus explicit memberships.
    pub fn groups(&self) -> BTreeSet<&str> {
        let mut groups: BTreeSet<&str> = self.groups.iter().map(String::as_str).collect();
        groups.insert(self.group());
        groups
    }

    pub fn add_group(&mut self, group: impl Into<String>) -> DomainResult<()> {
        let group = group.into();
        if group.trim().is_empty() {
            return Err(DomainError::invalid_argument("group must not be empty"));
        }
        self.groups.insert(group);
        Ok(())
    }

    /// Returns whether the identity was a member. The personal group cannot be left.
    pub fn remove_group(&mut self, group: &str) -> bool {
        self.groups.remove(group)
    }

    /// Create a group owned by this identity, `<id>__<suffix>`, and join it.
    pub fn create_group(&mut self, suffix: &str) -> DomainResult<String> {
        if suffix.trim().is_empty() {
            return Err(DomainError::invalid_argument("group suffix must not be empty"));
        }
        let group = format!("{}{GROUP_SEPARATOR}{suffix}", self.id);
        self.groups.insert(group.clone());
        debug!(identity = %self.id, %group, "group created");
        Ok(group)
    }

    pub fn has_group_access(&self, group: &str) -> bool {
        group == self.group() || self.groups.contains(group)
    }

    pub fn check_group_access(&self, group: &str) -> DomainResult<()> {
        if self.has_group_access(group) {
            return Ok(());
        }
        Err(DomainError::forbidden(format!(
            "{self} not authorized for group [{group}]"
        )))
    }

    /// Group for a new object: the requested one if accessible, else the personal group.
    pub fn check_init_group(&self, requested: Option<&str>) -> DomainResult<String> {
        match requested.filter(|g| !g.is_empty()) {
            None => Ok(self.group().to_string()),
            Some(group) => {
                self.check_group_access(group)?;
                Ok(group.to_string())
            }
        }
    }

    /// Group after an update: unchanged when nothing new is requested, else
    /// the requested one if accessible.
    pub fn check_update_group(&self, current: &str, requested: Option<&str>) -> DomainResult<String> {
        match requested.filter(|g| !g.is_empty() && *g != current) {
            None => Ok(current.to_string()),
            Some(group) => {
                self.check_group_access(group)?;
                Ok(group.to_string())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Enablement
// ─────────────────────────────────────────────────────────────────────────────

impl Identity {
    pub fn window(&self) -> &EnablementWindow {
        &self.window
    }

    pub fn enabled(&self) -> bool {
        self.window.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.window.enabled = enabled;
    }

    pub fn set_enable_after(&mut self, enable_after: Option<DateTime<Utc>>) {
        self.window.enable_after = enable_after;
    }

    pub fn set_disable_after(&mut self, disable_after: Option<DateTime<Utc>>) {
        self.window.disable_after = disable_after;
    }

    pub fn is_really_enabled(&self, now: DateTime<Utc>) -> bool {
        self.window.is_open(now)
    }

    pub fn check_really_enabled(&self, now: DateTime<Utc>) -> DomainResult<&Self> {
        if self.is_really_enabled(now) {
            Ok(self)
        } else {
            Err(DomainError::disabled_credentials(
                trust::name(self.trust_level()),
                self.username(),
            ))
        }
    }

    /// Enabling also forgives past invalid challenges.
    pub fn do_enable_or_disable(&mut self, enable: bool) {
        self.window.enabled = enable;
        if enable {
            self.reset_invalid_challenges();
        }
        info!(identity = %self.id, enabled = enable, "enablement changed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Password lifecycle
// ─────────────────────────────────────────────────────────────────────────────

impl Identity {
    pub fn has_password(&self) -> bool {
        self.hashed_password.is_some()
    }

    pub fn hashed_password(&self) -> Option<&str> {
        self.hashed_password.as_deref()
    }

    /// Adopt an already hashed password (e.g. migrated from another store).
    pub fn set_hashed_password(&mut self, hashed_password: Option<String>) {
        self.hashed_password = hashed_password;
    }

    pub fn password_reset_code(&self) -> Option<&str> {
        self.password_reset_code.as_deref()
    }

    /// Issue a fresh reset code, replacing any previous one.
    pub fn new_password_reset_code(&mut self) -> &str {
        self.password_reset_code.insert(password::new_reset_code())
    }

    pub fn password_must_change(&self) -> bool {
        self.password_must_change
    }

    pub fn set_password_must_change(&mut self, must_change: bool) {
        self.password_must_change = must_change;
    }

    pub fn check_password_must_change(&self) -> DomainResult<()> {
        if self.password_must_change {
            return Err(DomainError::PasswordMustChange);
        }
        Ok(())
    }

    pub fn has_password_been_challenged(&self) -> bool {
        self.password_has_been_challenged
    }

    pub fn set_password_has_been_challenged(&mut self, challenged: bool) {
        self.password_has_been_challenged = challenged;
    }

    pub fn check_password_has_been_challenged(&self) -> DomainResult<()> {
        if !self.password_has_been_challenged {
            return Err(DomainError::UnchallengedPassword);
        }
        Ok(())
    }

    /// Compare a candidate with the stored hash. Counting failures and any
    /// lockout are up to the caller (see [`crate::lockout`]).
    pub fn challenge_password(&mut self, passwords: &Passwords, candidate: &str) -> bool {
        let Some(hashed) = self.hashed_password.as_deref() else {
            return false;
        };
        if passwords.hash(candidate) == hashed {
            self.password_has_been_challenged = true;
            return true;
        }
        false
    }

    pub fn invalid_challenges(&self) -> u32 {
        self.invalid_challenges
    }

    pub fn last_invalid_challenge_at(&self) -> Option<DateTime<Utc>> {
        self.last_invalid_challenge_at
    }

    pub fn record_invalid_challenge(&mut self, now: DateTime<Utc>) {
        self.invalid_challenges = self.invalid_challenges.saturating_add(1);
        self.last_invalid_challenge_at = Some(now);
    }

    pub fn reset_invalid_challenges(&mut self) {
        self.invalid_challenges = 0;
        self.last_invalid_challenge_at = None;
    }

    /// Drop the password, reset code, failure counters and every session.
    pub fn clear_password_and_tokens(&mut self) {
        self.hashed_password = None;
        self.password_reset_code = None;
        self.reset_invalid_challenges();
        self.sessions.clear();
    }

    /// Set a new password.
    ///
    /// With `reset_code`, the code must equal the one last issued. `regex`
    /// overrides the policy configured on `passwords`. Every outstanding
    /// session is invalidated.
    pub fn change_password(
        &mut self,
        passwords: &Passwords,
        new_password: &str,
        reset_code: Option<&str>,
        regex: Option<&str>,
    ) -> DomainResult<()> {
        if let Some(code) = reset_code {
            if code.is_empty() {
                return Err(DomainError::invalid_argument(
                    "password reset code must not be empty",
                ));
            }
            if self.password_reset_code.as_deref() != Some(code) {
                return Err(DomainError::invalid_argument(format!(
                    "password reset code [{code}] is invalid"
                )));
            }
        }

        let hashed = passwords.check_and_hash(new_password, regex)?;
        let revoked = self.sessions.len();
        self.clear_password_and_tokens();
        self.hashed_password = Some(hashed);
        self.password_has_been_challenged = true;
        self.password_must_change = false;
        info!(identity = %self.id, revoked_sessions = revoked, "password changed");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

impl Identity {
    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    pub fn set_sessions(&mut self, sessions: impl IntoIterator<Item = Session>) {
        self.sessions = SessionPool::from_sessions(sessions);
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.sessions.current()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.sessions.current().map(Session::access_token)
    }

    pub fn access_token_expires_in(&self, now: DateTime<Utc>) -> i64 {
        self.sessions.current().map_or(0, |s| s.expires_in(now))
    }

    pub fn new_session(&mut self, lifetime: Duration, now: DateTime<Utc>) -> DomainResult<&Session> {
        let session = self.sessions.new_session(lifetime, now)?;
        debug!(identity = %self.id, lifetime_secs = lifetime.num_seconds(), "session created");
        Ok(session)
    }

    pub fn set_current_session(&mut self, access_token: &str) -> DomainResult<&Session> {
        self.sessions.set_current(access_token)
    }

    pub fn delete_current_session(&mut self) {
        self.sessions.delete_current();
    }

    pub fn delete_session(&mut self, access_token: &str) -> DomainResult<()> {
        if self.sessions.delete(access_token) {
            return Ok(());
        }
        Err(DomainError::invalid_argument(format!(
            "access token not found in {self}"
        )))
    }

    pub fn purge_old_sessions(&mut self, max: usize) -> DomainResult<usize> {
        let dropped = self.sessions.purge(max)?;
        if dropped > 0 {
            debug!(identity = %self.id, dropped, kept = self.sessions.len(), "old sessions purged");
        }
        Ok(dropped)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

impl Identity {
    /// Bearer-token check: owned token, then expiry, then enablement.
    pub fn authenticate_with_token(&mut self, access_token: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if self.sessions.set_current(access_token)?.is_expired(now) {
            return Err(DomainError::ExpiredAccessToken);
        }
        self.check_really_enabled(now)?;
        Ok(())
    }

    /// Basic-auth check: enablement, then password challenge.
    pub fn authenticate_with_password(
        &mut self,
        passwords: &Passwords,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.check_really_enabled(now)?;
        if !self.challenge_password(passwords, candidate) {
            return Err(DomainError::InvalidUsernamePassword);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
