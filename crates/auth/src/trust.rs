//! Trust levels derived from role sets.
//!
//! A trust level is a plain tag. Ordering, resolution and the "who may manage
//! which role" rule live in free functions over the [`LEVELS`] table so the
//! tag itself carries no behavior.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::roles::{self, Role};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Guest,
    User,
    Admin,
    Superadmin,
    Superdog,
}

/// All levels, lowest first. Position in this table is the level's rank.
pub const LEVELS: [TrustLevel; 5] = [
    TrustLevel::Guest,
    TrustLevel::User,
    TrustLevel::Admin,
    TrustLevel::Superadmin,
    TrustLevel::Superdog,
];

const NAMES: [&str; 5] = [
    roles::GUEST,
    roles::USER,
    roles::ADMIN,
    roles::SUPERADMIN,
    roles::SUPERDOG,
];

/// Level required to grant or revoke a role that is not a level name.
pub const CUSTOM_ROLE_MANAGER: TrustLevel = TrustLevel::Admin;

pub fn rank(level: TrustLevel) -> usize {
    LEVELS
        .iter()
        .position(|l| *l == level)
        .unwrap_or_default()
}

pub fn name(level: TrustLevel) -> &'static str {
    NAMES[rank(level)]
}

pub fn from_name(name: &str) -> Option<TrustLevel> {
    NAMES.iter().position(|n| *n == name).map(|i| LEVELS[i])
}

pub fn compare(a: TrustLevel, b: TrustLevel) -> Ordering {
    rank(a).cmp(&rank(b))
}

pub fn greater_than(a: TrustLevel, b: TrustLevel) -> bool {
    compare(a, b) == Ordering::Greater
}

pub fn greater_or_equal(a: TrustLevel, b: TrustLevel) -> bool {
    compare(a, b) != Ordering::Less
}

/// Resolve the level of a role set: the highest level whose name is present,
/// checked from `superdog` down to `user`; `guest` otherwise.
pub fn resolve<'a, I>(roles: I) -> TrustLevel
where
    I: IntoIterator<Item = &'a Role>,
{
    let mut best = TrustLevel::Guest;
    for role in roles {
        if let Some(level) = from_name(role.as_str()) {
            if greater_than(level, best) {
                best = level;
            }
        }
    }
    best
}

/// Minimum level an actor needs to grant or revoke `role`.
pub fn authorized_to_manage(role: &Role) -> TrustLevel {
    from_name(role.as_str()).unwrap_or(CUSTOM_ROLE_MANAGER)
}

/// Whether an actor at `actor` may grant or revoke every role in `roles`.
pub fn can_manage<'a, I>(actor: TrustLevel, roles: I) -> bool
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .all(|role| greater_or_equal(actor, authorized_to_manage(role)))
}

impl core::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(name(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roles(names: &[&'static str]) -> Vec<Role> {
        names.iter().map(|n| Role::parse(*n).unwrap()).collect()
    }

    #[test]
    fn empty_role_set_is_guest() {
        assert_eq!(resolve(&roles(&[])), TrustLevel::Guest);
        assert_eq!(resolve(&roles(&["editor", "guest"])), TrustLevel::Guest);
    }

    #[test]
    fn highest_level_wins() {
        assert_eq!(resolve(&roles(&["user", "admin"])), TrustLevel::Admin);
        assert_eq!(resolve(&roles(&["superadmin", "user"])), TrustLevel::Superadmin);
        assert_eq!(
            resolve(&roles(&["superdog", "superadmin", "admin"])),
            TrustLevel::Superdog
        );
    }

    #[test]
    fn ordering_follows_table() {
        assert!(greater_than(TrustLevel::Admin, TrustLevel::User));
        assert!(!greater_than(TrustLevel::Admin, TrustLevel::Admin));
        assert!(greater_or_equal(TrustLevel::Admin, TrustLevel::Admin));
        assert!(!greater_or_equal(TrustLevel::User, TrustLevel::Superadmin));
        assert_eq!(compare(TrustLevel::Guest, TrustLevel::Superdog), Ordering::Less);
    }

    #[test]
    fn custom_roles_require_admin() {
        let editor = Role::parse("editor").unwrap();
        assert_eq!(authorized_to_manage(&editor), TrustLevel::Admin);
        assert_eq!(
            authorized_to_manage(&Role::parse("superadmin").unwrap()),
            TrustLevel::Superadmin
        );
        assert!(can_manage(TrustLevel::Admin, &roles(&["editor", "user", "admin"])));
        assert!(!can_manage(TrustLevel::Admin, &roles(&["editor", "superadmin"])));
        assert!(!can_manage(TrustLevel::User, &roles(&["editor"])));
    }

    #[test]
    fn names_round_trip() {
        for level in LEVELS {
            assert_eq!(from_name(name(level)), Some(level));
        }
        assert_eq!(TrustLevel::Superadmin.to_string(), "superadmin");
    }

    fn role_name() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "guest", "user", "admin", "superadmin", "superdog", "editor", "viewer",
        ])
    }

    proptest! {
        #[test]
        fn resolve_picks_highest_priority_present(names in prop::collection::vec(role_name(), 0..8)) {
            let set = roles(&names);
            let expected = ["superdog", "superadmin", "admin", "user"]
                .iter()
                .find(|n| names.contains(n))
                .and_then(|n| from_name(n))
                .unwrap_or(TrustLevel::Guest);
            prop_assert_eq!(resolve(&set), expected);
        }

        #[test]
        fn adding_a_role_never_lowers_the_level(
            names in prop::collection::vec(role_name(), 0..8),
            extra in role_name(),
        ) {
            let before = resolve(&roles(&names));
            let mut more = names.clone();
            more.push(extra);
            prop_assert!(greater_or_equal(resolve(&roles(&more)), before));
        }
    }
}
