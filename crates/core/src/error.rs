//! Domain error model.
//!
//! Every credential failure is a distinct variant so the outer request layer
//! can choose its own signaling (status codes, retry hints) by matching on
//! the variant or on [`DomainError::code`], never on the message text.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse family of a [`DomainError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input (role name, password policy, arguments).
    Validation,
    /// The caller could not be authenticated (disabled, bad token, bad password).
    Authentication,
    /// The caller is authenticated but not allowed to do this.
    Authorization,
    /// Stale state (optimistic concurrency).
    Conflict,
    /// A referenced item does not exist.
    NotFound,
}

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An argument failed validation (malformed role, password policy, reset code).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The acting identity's trust level is too low for the operation.
    #[error("[{level}][{username}] => insufficient credentials")]
    InsufficientCredentials { level: String, username: String },

    /// An anonymous caller attempted a privileged operation.
    #[error("guest not authorized")]
    GuestNotAuthorized,

    /// Authenticated but denied for a reason other than trust level.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The enabled flag or the enablement window rejects the identity.
    #[error("[{level}][{username}] => disabled")]
    DisabledCredentials { level: String, username: String },

    #[error("invalid access token")]
    InvalidAccessToken,

    #[error("access token has expired")]
    ExpiredAccessToken,

    #[error("invalid username or password")]
    InvalidUsernamePassword,

    /// A sensitive operation requires a fresh password challenge.
    #[error("password must be challenged")]
    UnchallengedPassword,

    #[error("password must change")]
    PasswordMustChange,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn insufficient_credentials(level: impl Into<String>, username: impl Into<String>) -> Self {
        Self::InsufficientCredentials {
            level: level.into(),
            username: username.into(),
        }
    }

    pub fn disabled_credentials(level: impl Into<String>, username: impl Into<String>) -> Self {
        Self::DisabledCredentials {
            level: level.into(),
            username: username.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidArgument(_) => ErrorKind::Validation,
            DomainError::DisabledCredentials { .. }
            | DomainError::InvalidAccessToken
            | DomainError::ExpiredAccessToken
            | DomainError::InvalidUsernamePassword
            | DomainError::GuestNotAuthorized => ErrorKind::Authentication,
            DomainError::InsufficientCredentials { .. }
            | DomainError::Forbidden(_)
            | DomainError::UnchallengedPassword
            | DomainError::PasswordMustChange => ErrorKind::Authorization,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidArgument(_) => "invalid-argument",
            DomainError::InsufficientCredentials { .. } => "insufficient-credentials",
            DomainError::GuestNotAuthorized => "guest-not-authorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::DisabledCredentials { .. } => "disabled-credentials",
            DomainError::InvalidAccessToken => "invalid-access-token",
            DomainError::ExpiredAccessToken => "expired-access-token",
            DomainError::InvalidUsernamePassword => "invalid-credentials",
            DomainError::UnchallengedPassword => "unchallenged-password",
            DomainError::PasswordMustChange => "password-must-change",
            DomainError::Conflict(_) => "conflict",
            DomainError::NotFound(_) => "not-found",
        }
    }
}
