use serde::{Deserialize, Serialize};

use credo_core::DomainError;

/// Permission a role may hold on a resource type.
///
/// `*Mine` variants only cover objects owned by the caller, `*Group` variants
/// objects in one of the caller's groups. The resource layer enforces those
/// with [`Identity::check_owner_access`] and [`Identity::check_group_access`];
/// the ACL only answers "is it granted".
///
/// [`Identity::check_owner_access`]: crate::identity::Identity::check_owner_access
/// [`Identity::check_group_access`]: crate::identity::Identity::check_group_access
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Create,
    CreateMine,
    CreateGroup,
    Read,
    ReadMine,
    ReadGroup,
    Search,
    Update,
    UpdateMine,
    UpdateGroup,
    Delete,
    DeleteMine,
    DeleteGroup,
    ImportAll,
    ExportAll,
    ForceMeta,
}

impl Permission {
    pub const ALL: [Permission; 16] = [
        Permission::Create,
        Permission::CreateMine,
        Permission::CreateGroup,
        Permission::Read,
        Permission::ReadMine,
        Permission::ReadGroup,
        Permission::Search,
        Permission::Update,
        Permission::UpdateMine,
        Permission::UpdateGroup,
        Permission::Delete,
        Permission::DeleteMine,
        Permission::DeleteGroup,
        Permission::ImportAll,
        Permission::ExportAll,
        Permission::ForceMeta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Create => "create",
            Permission::CreateMine => "createMine",
            Permission::CreateGroup => "createGroup",
            Permission::Read => "read",
            Permission::ReadMine => "readMine",
            Permission::ReadGroup => "readGroup",
            Permission::Search => "search",
            Permission::Update => "update",
            Permission::UpdateMine => "updateMine",
            Permission::UpdateGroup => "updateGroup",
            Permission::Delete => "delete",
            Permission::DeleteMine => "deleteMine",
            Permission::DeleteGroup => "deleteGroup",
            Permission::ImportAll => "importAll",
            Permission::ExportAll => "exportAll",
            Permission::ForceMeta => "forceMeta",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DomainError::invalid_argument(format!("permission [{s}] is unknown")))
    }
}
