//! Per-resource-type access control lists.
//!
//! An ACL maps a resource type to the permissions each role holds on it.
//! Types without an entry fall back to the built-in [`default_acl`]; an
//! explicit but empty entry denies everything.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use credo_core::DomainResult;

use crate::identity::Identity;
use crate::permissions::Permission;
use crate::roles::{self, Role};

/// Role → granted permissions, for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePermissions(BTreeMap<Role, BTreeSet<Permission>>);

impl RolePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> &mut Self {
        self.0.entry(role).or_default().extend(permissions);
        self
    }

    pub fn revoke(&mut self, role: &Role, permissions: impl IntoIterator<Item = Permission>) -> &mut Self {
        if let Some(granted) = self.0.get_mut(role) {
            for permission in permissions {
                granted.remove(&permission);
            }
            if granted.is_empty() {
                self.0.remove(role);
            }
        }
        self
    }

    pub fn permissions_of(&self, role: &Role) -> Option<&BTreeSet<Permission>> {
        self.0.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, role: &Role, permission: Permission) -> bool {
        self.0
            .get(role)
            .is_some_and(|granted| granted.contains(&permission))
    }

    /// Roles among `roles` granting at least one of `permissions`.
    pub fn granting<'a>(
        &'a self,
        roles: impl IntoIterator<Item = &'a Role>,
        permissions: &'a [Permission],
    ) -> impl Iterator<Item = &'a Role> {
        roles
            .into_iter()
            .filter(move |role| permissions.iter().any(|p| self.has(role, *p)))
    }

    /// True iff any of `roles` grants any of `permissions`.
    pub fn has_one<'a>(&'a self, roles: impl IntoIterator<Item = &'a Role>, permissions: &'a [Permission]) -> bool {
        self.granting(roles, permissions).next().is_some()
    }
}

/// Built-in ACL for types without an explicit entry.
///
/// Everyone reads; users create, search and edit their own objects; admins
/// create, search, update and delete any object.
pub fn default_acl() -> &'static RolePermissions {
    static DEFAULT: OnceLock<RolePermissions> = OnceLock::new();
    DEFAULT.get_or_init(|| {
        let mut acl = RolePermissions::new();
        acl.grant(Role::well_known(roles::ALL), [Permission::Read])
            .grant(
                Role::well_known(roles::USER),
                [
                    Permission::Create,
                    Permission::Read,
                    Permission::Search,
                    Permission::UpdateMine,
                    Permission::DeleteMine,
                ],
            )
            .grant(
                Role::well_known(roles::ADMIN),
                [
                    Permission::Create,
                    Permission::Read,
                    Permission::Search,
                    Permission::Update,
                    Permission::Delete,
                ],
            );
        acl
    })
}

/// Roles an identity acts with: its own plus the implicit `all`.
fn acting_roles(identity: &Identity) -> Vec<Role> {
    let mut acting: Vec<Role> = identity.roles().iter().cloned().collect();
    acting.push(Role::well_known(roles::ALL));
    acting
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessControlList(BTreeMap<String, RolePermissions>);

impl AccessControlList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, resource_type: impl Into<String>, acl: RolePermissions) -> &mut Self {
        self.0.insert(resource_type.into(), acl);
        self
    }

    /// Register a type with a copy of the default ACL, unless already present.
    pub fn declare(&mut self, resource_type: impl Into<String>) -> &mut RolePermissions {
        self.0
            .entry(resource_type.into())
            .or_insert_with(|| default_acl().clone())
    }

    pub fn remove(&mut self, resource_type: &str) -> Option<RolePermissions> {
        self.0.remove(resource_type)
    }

    pub fn get(&self, resource_type: &str) -> Option<&RolePermissions> {
        self.0.get(resource_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Explicit entry for the type, or the default ACL.
    pub fn effective(&self, resource_type: &str) -> &RolePermissions {
        self.get(resource_type).unwrap_or_else(|| default_acl())
    }

    pub fn check(&self, resource_type: &str, role: &Role, permission: Permission) -> bool {
        self.effective(resource_type).has(role, permission)
    }

    /// Any role held by `identity` grants any of `permissions` on the type.
    pub fn check_identity(&self, identity: &Identity, resource_type: &str, permissions: &[Permission]) -> bool {
        self.effective(resource_type)
            .has_one(&acting_roles(identity), permissions)
    }

    pub fn check_permission(
        &self,
        identity: &Identity,
        resource_type: &str,
        permissions: &[Permission],
    ) -> DomainResult<()> {
        if self.check_identity(identity, resource_type, permissions) {
            return Ok(());
        }
        tracing::debug!(
            identity = %identity.id(),
            resource_type,
            ?permissions,
            "acl denied"
        );
        Err(identity.insufficient_credentials())
    }

    /// Declared types on which `identity` holds `permission`.
    pub fn types_granting_permission(&self, permission: Permission, identity: &Identity) -> BTreeSet<String> {
        let acting = acting_roles(identity);
        self.0
            .iter()
            .filter(|(_, acl)| acl.has_one(&acting, &[permission]))
            .map(|(resource_type, _)| resource_type.clone())
            .collect()
    }

    /// Explain an ACL decision for audits and debugging.
    pub fn explain(&self, identity: &Identity, resource_type: &str, permission: Permission) -> AclDecision {
        let (source, acl) = match self.get(resource_type) {
            Some(acl) => (AclSource::Explicit, acl),
            None => (AclSource::Default, default_acl()),
        };
        let acting = acting_roles(identity);
        let granting_roles: Vec<String> = acl
            .granting(&acting, &[permission])
            .map(|r| r.to_string())
            .collect();

        AclDecision {
            resource_type: resource_type.to_string(),
            permission,
            granted: !granting_roles.is_empty(),
            source,
            acting_roles: acting.iter().map(Role::to_string).collect(),
            granting_roles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AclSource {
    Explicit,
    Default,
}

/// Outcome of [`AccessControlList::explain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclDecision {
    pub resource_type: String,
    pub permission: Permission,
    pub granted: bool,
    pub source: AclSource,
    pub acting_roles: Vec<String>,
    pub granting_roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use credo_core::DomainError;

    fn identity(roles: &[&'static str]) -> Identity {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut identity = Identity::new("vince", now);
        identity.add_role_names(roles.iter().copied()).unwrap();
        identity
    }

    fn role(name: &'static str) -> Role {
        Role::parse(name).unwrap()
    }

    #[test]
    fn missing_type_uses_default_acl() {
        let acl = AccessControlList::new();
        assert!(acl.check("message", &role("user"), Permission::Create));
        assert!(acl.check("message", &role("all"), Permission::Read));
        assert!(!acl.check("message", &role("all"), Permission::Create));
        assert!(!acl.check("message", &role("editor"), Permission::Read));
    }

    #[test]
    fn empty_entry_denies_everything() {
        let mut acl = AccessControlList::new();
        acl.set("message", RolePermissions::new());
        assert!(!acl.check("message", &role("admin"), Permission::Read));
        assert!(!acl.check_identity(&identity(&["admin"]), "message", &[Permission::Read]));
    }

    #[test]
    fn default_acl_for_guest_user_and_admin() {
        let acl = AccessControlList::new();
        let guest = Identity::guest();
        let user = identity(&["user"]);
        let admin = identity(&["admin"]);

        assert!(acl.check_identity(&guest, "message", &[Permission::Read]));
        assert!(!acl.check_identity(&guest, "message", &[Permission::Create]));
        assert!(!acl.check_identity(&guest, "message", &[Permission::Search]));

        assert!(acl.check_identity(&user, "message", &[Permission::Create]));
        assert!(!acl.check_identity(&user, "message", &[Permission::Update]));
        assert!(acl.check_identity(&user, "message", &[Permission::Update, Permission::UpdateMine]));

        assert!(acl.check_identity(&admin, "message", &[Permission::Delete]));
    }

    #[test]
    fn union_across_roles() {
        let mut acl = AccessControlList::new();
        let mut rp = RolePermissions::new();
        rp.grant(role("reader"), [Permission::Read])
            .grant(role("writer"), [Permission::Create]);
        acl.set("message", rp);

        let both = identity(&["reader", "writer"]);
        assert!(acl.check_identity(&both, "message", &[Permission::Create]));
        assert!(acl.check_identity(&both, "message", &[Permission::Read]));
        assert!(!acl.check_identity(&identity(&["reader"]), "message", &[Permission::Create]));
    }

    #[test]
    fn check_permission_names_the_actor() {
        let acl = AccessControlList::new();
        let err = acl
            .check_permission(&identity(&["user"]), "message", &[Permission::Delete])
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_credentials("user", "vince"));
        assert_eq!(
            acl.check_permission(&Identity::guest(), "message", &[Permission::Create]),
            Err(DomainError::GuestNotAuthorized)
        );
    }

    #[test]
    fn types_granting_permission_scopes_to_declared_types() {
        let mut acl = AccessControlList::new();
        acl.declare("message");
        let mut secret = RolePermissions::new();
        secret.grant(role("admin"), [Permission::Search]);
        acl.set("secret", secret);
        let mut public = RolePermissions::new();
        public.grant(role("all"), [Permission::Search]);
        acl.set("public", public);

        let user = identity(&["user"]);
        let found = acl.types_granting_permission(Permission::Search, &user);
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["message".to_string(), "public".to_string()]
        );

        let admin = identity(&["admin"]);
        assert_eq!(acl.types_granting_permission(Permission::Search, &admin).len(), 3);
        assert_eq!(
            acl.types_granting_permission(Permission::Search, &Identity::guest()).len(),
            1
        );
    }

    #[test]
    fn revoke_drops_empty_roles() {
        let mut rp = RolePermissions::new();
        rp.grant(role("user"), [Permission::Read, Permission::Search]);
        rp.revoke(&role("user"), [Permission::Read]);
        assert!(rp.has(&role("user"), Permission::Search));
        rp.revoke(&role("user"), [Permission::Search]);
        assert!(rp.is_empty());
    }

    #[test]
    fn explain_reports_source_and_granting_roles() {
        let acl = AccessControlList::new();
        let decision = acl.explain(&identity(&["user", "admin"]), "message", Permission::Create);
        assert!(decision.granted);
        assert_eq!(decision.source, AclSource::Default);
        assert_eq!(decision.granting_roles, vec!["admin".to_string(), "user".to_string()]);

        let denied = acl.explain(&Identity::guest(), "message", Permission::Delete);
        assert!(!denied.granted);
        assert_eq!(denied.acting_roles, vec!["all".to_string()]);
    }

    #[test]
    fn acl_deserializes_and_rejects_bad_roles() {
        let acl: AccessControlList =
            serde_json::from_str(r#"{"message":{"user":["read","updateMine"]}}"#).unwrap();
        assert!(acl.check("message", &role("user"), Permission::UpdateMine));
        assert!(serde_json::from_str::<AccessControlList>(r#"{"message":{"User":["read"]}}"#).is_err());
    }
}
