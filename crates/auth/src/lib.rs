//! `credo-auth`: credential identity model.
//!
//! Trust levels, enablement windows, password lifecycle, access-token
//! sessions and per-type ACLs, composed by the [`Identity`] aggregate.
//! No IO: callers supply the record, the current time and request inputs.

pub mod acl;
pub mod config;
pub mod enablement;
pub mod identity;
pub mod lockout;
pub mod password;
pub mod permissions;
pub mod projection;
pub mod roles;
pub mod session;
pub mod trust;

pub use acl::{AccessControlList, AclDecision, AclSource, RolePermissions, default_acl};
pub use config::CredentialsSettings;
pub use enablement::EnablementWindow;
pub use identity::Identity;
pub use lockout::ChallengePolicy;
pub use password::Passwords;
pub use permissions::Permission;
pub use projection::IdentityView;
pub use roles::Role;
pub use session::{Session, SessionPool};
pub use trust::TrustLevel;
