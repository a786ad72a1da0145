//! Access-token sessions owned by one identity.

use std::cmp::Ordering;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use credo_core::{DomainError, DomainResult, Entity};

/// One access-token grant. Identity is the token value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    access_token: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    access_token_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(lifetime: Duration, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::with_token(new_access_token(), lifetime, now)
    }

    /// Fails when `now + lifetime` is past the representable date range.
    pub fn with_token(
        access_token: impl Into<String>,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let expires_at = now.checked_add_signed(lifetime).ok_or_else(|| {
            DomainError::invalid_argument(format!(
                "access token lifetime [{}] seconds is out of range",
                lifetime.num_seconds()
            ))
        })?;
        Ok(Self {
            access_token: access_token.into(),
            created_at: Some(now),
            access_token_expires_at: Some(expires_at),
        })
    }

    /// Rebuild a session from stored fields, any of which may be missing.
    pub fn restore(
        access_token: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
        access_token_expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            created_at,
            access_token_expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token_expires_at
    }

    /// Whole seconds left, rounded up, never negative.
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        let Some(expires_at) = self.access_token_expires_at else {
            return 0;
        };
        let millis = (expires_at - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis + 999) / 1000
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_in(now) == 0
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.access_token == other.access_token
    }
}

impl Eq for Session {}

impl Entity for Session {
    type Id = str;

    fn id(&self) -> &str {
        &self.access_token
    }
}

/// Most recent first; sessions without a creation time sort last.
fn most_recent_first(a: &Session, b: &Session) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

pub fn new_access_token() -> String {
    STANDARD.encode(Uuid::new_v4().to_string())
}

/// Ordered sessions plus the transient "current" one for this request.
///
/// Expired sessions are kept until deleted or purged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPool {
    sessions: Vec<Session>,
    #[serde(skip)]
    current: Option<Session>,
}

impl SessionPool {
    pub fn from_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        Self {
            sessions: sessions.into_iter().collect(),
            current: None,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Create a session, append it and make it current.
    pub fn new_session(&mut self, lifetime: Duration, now: DateTime<Utc>) -> DomainResult<&Session> {
        let session = Session::new(lifetime, now)?;
        Ok(self.push_current(session))
    }

    pub fn push_current(&mut self, session: Session) -> &Session {
        self.sessions.push(session.clone());
        self.current.insert(session)
    }

    pub fn set_current(&mut self, access_token: &str) -> DomainResult<&Session> {
        let found = self
            .sessions
            .iter()
            .find(|s| s.access_token == access_token)
            .cloned()
            .ok_or(DomainError::InvalidAccessToken)?;
        Ok(&*self.current.insert(found))
    }

    pub fn delete_current(&mut self) {
        if let Some(current) = self.current.take() {
            self.sessions.retain(|s| *s != current);
        }
    }

    pub fn delete(&mut self, access_token: &str) -> bool {
        match self.sessions.iter().position(|s| s.access_token == access_token) {
            Some(index) => {
                self.sessions.remove(index);
                true
            }
            None => false,
        }
    }

    /// Keep only the `max` most recently created sessions. Returns how many
    /// were dropped. The current session reference is left untouched.
    pub fn purge(&mut self, max: usize) -> DomainResult<usize> {
        if max == 0 {
            return Err(DomainError::invalid_argument(
                "sessions size max should be greater than 0",
            ));
        }
        if self.sessions.len() <= max {
            return Ok(0);
        }
        self.sessions.sort_by(most_recent_first);
        let dropped = self.sessions.len() - max;
        self.sessions.truncate(max);
        Ok(dropped)
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn session(token: impl Into<String>, lifetime: Duration, now: DateTime<Utc>) -> Session {
        Session::with_token(token, lifetime, now).unwrap()
    }

    #[test]
    fn new_session_is_current_and_listed() {
        let mut pool = SessionPool::default();
        let token = pool.new_session(Duration::hours(1), t()).unwrap().access_token().to_string();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.current().unwrap().access_token(), token);
        assert_eq!(pool.current().unwrap().expires_at(), Some(t() + Duration::hours(1)));
    }

    #[test]
    fn expires_in_rounds_up_and_clamps() {
        let s = session("tok", Duration::seconds(10), t());
        assert_eq!(s.expires_in(t()), 10);
        assert_eq!(s.expires_in(t() + Duration::milliseconds(1)), 10);
        assert_eq!(s.expires_in(t() + Duration::milliseconds(9_001)), 1);
        assert_eq!(s.expires_in(t() + Duration::seconds(10)), 0);
        assert_eq!(s.expires_in(t() + Duration::hours(1)), 0);
        assert!(s.is_expired(t() + Duration::seconds(11)));
        assert_eq!(Session::restore("x", None, None).expires_in(t()), 0);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let mut pool = SessionPool::default();
        pool.new_session(Duration::hours(1), t()).unwrap();
        let err = pool.set_current("bm9wZQ==").unwrap_err();
        assert_eq!(err, DomainError::InvalidAccessToken);
    }

    #[test]
    fn set_current_finds_owned_token() {
        let mut pool = SessionPool::from_sessions([
            session("a", Duration::hours(1), t()),
            session("b", Duration::hours(1), t()),
        ]);
        assert!(pool.current().is_none());
        assert_eq!(pool.set_current("b").unwrap().access_token(), "b");
    }

    #[test]
    fn delete_current_only_removes_current() {
        let mut pool = SessionPool::default();
        pool.new_session(Duration::hours(1), t()).unwrap();
        pool.new_session(Duration::hours(1), t()).unwrap();
        pool.delete_current();
        assert_eq!(pool.len(), 1);
        assert!(pool.current().is_none());
        pool.delete_current();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn delete_by_token() {
        let mut pool = SessionPool::from_sessions([session("a", Duration::hours(1), t())]);
        assert!(!pool.delete("zz"));
        assert!(pool.delete("a"));
        assert!(pool.is_empty());
    }

    #[test]
    fn purge_keeps_most_recent() {
        let mut pool = SessionPool::from_sessions(
            (0..5).map(|i| session(format!("s{i}"), Duration::hours(1), t() + Duration::minutes(i))),
        );
        assert_eq!(pool.purge(2).unwrap(), 3);
        let kept: Vec<_> = pool.sessions().iter().map(|s| s.access_token()).collect();
        assert_eq!(kept, vec!["s4", "s3"]);
        assert!(matches!(pool.purge(0), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn purge_drops_undated_sessions_first() {
        let mut pool = SessionPool::from_sessions([
            Session::restore("undated", None, None),
            session("old", Duration::hours(1), t()),
            session("new", Duration::hours(1), t() + Duration::minutes(1)),
        ]);
        pool.purge(2).unwrap();
        let kept: Vec<_> = pool.sessions().iter().map(|s| s.access_token()).collect();
        assert_eq!(kept, vec!["new", "old"]);
    }

    #[test]
    fn purge_below_max_keeps_order() {
        let mut pool = SessionPool::from_sessions([
            session("old", Duration::hours(1), t()),
            session("new", Duration::hours(1), t() + Duration::minutes(1)),
        ]);
        assert_eq!(pool.purge(5).unwrap(), 0);
        assert_eq!(pool.sessions()[0].access_token(), "old");
    }

    #[test]
    fn tokens_are_unique_and_base64() {
        let a = new_access_token();
        assert_ne!(a, new_access_token());
        assert!(STANDARD.decode(&a).is_ok());
    }

    #[test]
    fn sessions_are_equal_by_token() {
        let a = session("same", Duration::hours(1), t());
        let b = session("same", Duration::hours(2), t() + Duration::hours(1));
        assert_eq!(a, b);
        assert!(a.same_entity_as(&b));
    }

    #[test]
    fn lifetime_past_date_range_is_rejected() {
        let err = Session::new(Duration::seconds(9_000_000_000_000), t()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));

        let mut pool = SessionPool::default();
        assert!(pool.new_session(Duration::MAX, t()).is_err());
        assert!(pool.is_empty());
        assert!(pool.current().is_none());
    }

    proptest! {
        #[test]
        fn purge_retains_the_max_newest(offsets in prop::collection::hash_set(0i64..10_000, 1..20), max in 1usize..10) {
            let mut pool = SessionPool::from_sessions(offsets.iter().map(|m| {
                session(format!("s{m}"), Duration::hours(1), t() + Duration::minutes(*m))
            }));
            pool.purge(max).unwrap();

            let mut newest: Vec<i64> = offsets.iter().copied().collect();
            newest.sort_unstable_by(|a, b| b.cmp(a));
            newest.truncate(max);
            let expected: Vec<String> = newest.iter().map(|m| format!("s{m}")).collect();

            let kept: Vec<String> = pool.sessions().iter().map(|s| s.access_token().to_string()).collect();
            if offsets.len() > max {
                prop_assert_eq!(kept, expected);
            } else {
                prop_assert_eq!(kept.len(), offsets.len());
            }
        }
    }
}
