//! Roles and the static role → permission table.
//!
//! Authorization decisions on the client are pure lookups in this table. The
//! backend remains the authority; the table only decides what the client offers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user role within a company.
///
/// The set is closed. Wire names match the backend exactly.
///
/// # Examples
///
/// ```
/// use am_core::{Permission, Role};
///
/// assert!(Role::Admin.has_permission(Permission::ManageUsers));
/// assert!(!Role::Observer.has_permission(Permission::WriteAssets));
/// assert_eq!(Role::WarehouseKeeper.as_str(), "Warehouse_keeper");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Full access, including user, branch, and settings management.
    Admin,
    /// Bookkeeping access: assets, operations, warehouses, reports.
    Accountant,
    /// Warehouse staff: assets, operations, warehouses.
    #[serde(rename = "Warehouse_keeper")]
    WarehouseKeeper,
    /// Read-only access with reports.
    Observer,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ReadAll,
    Permission::WriteAll,
    Permission::DeleteAll,
    Permission::ManageUsers,
    Permission::ManageBranches,
    Permission::ManageSettings,
    Permission::ViewReports,
];

const ACCOUNTANT_PERMISSIONS: &[Permission] = &[
    Permission::ReadAll,
    Permission::WriteAssets,
    Permission::WriteOperations,
    Permission::WriteWarehouses,
    Permission::ViewReports,
];

const WAREHOUSE_KEEPER_PERMISSIONS: &[Permission] = &[
    Permission::ReadAll,
    Permission::WriteAssets,
    Permission::WriteOperations,
    Permission::WriteWarehouses,
];

const OBSERVER_PERMISSIONS: &[Permission] = &[Permission::ReadAll, Permission::ViewReports];

impl Role {
    /// Every role, in display order.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Accountant, Self::WarehouseKeeper, Self::Observer];

    /// Returns the permissions granted to this role.
    #[must_use]
    pub const fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Admin => ADMIN_PERMISSIONS,
            Self::Accountant => ACCOUNTANT_PERMISSIONS,
            Self::WarehouseKeeper => WAREHOUSE_KEEPER_PERMISSIONS,
            Self::Observer => OBSERVER_PERMISSIONS,
        }
    }

    /// Returns `true` if the role's table entry contains `permission`.
    #[must_use]
    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Returns the backend wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Accountant => "Accountant",
            Self::WarehouseKeeper => "Warehouse_keeper",
            Self::Observer => "Observer",
        }
    }

    /// Returns the localized display label.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::Role;
    ///
    /// assert_eq!(Role::Accountant.label(), "Бухгалтер");
    /// ```
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Администратор",
            Self::Accountant => "Бухгалтер",
            Self::WarehouseKeeper => "Кладовщик",
            Self::Observer => "Наблюдатель",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parses a wire name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// A capability checked by the client before offering an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read every record of the company.
    ReadAll,
    /// Write every kind of record.
    WriteAll,
    /// Delete every kind of record.
    DeleteAll,
    /// Create and edit users.
    ManageUsers,
    /// Create and edit branches.
    ManageBranches,
    /// Change company settings.
    ManageSettings,
    /// Open reports and the dashboard analytics.
    ViewReports,
    /// Create and edit assets.
    WriteAssets,
    /// Record inventory operations.
    WriteOperations,
    /// Create and edit warehouses.
    WriteWarehouses,
}

impl Permission {
    /// Every permission.
    pub const ALL: [Self; 10] = [
        Self::ReadAll,
        Self::WriteAll,
        Self::DeleteAll,
        Self::ManageUsers,
        Self::ManageBranches,
        Self::ManageSettings,
        Self::ViewReports,
        Self::WriteAssets,
        Self::WriteOperations,
        Self::WriteWarehouses,
    ];

    /// Returns the snake_case wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadAll => "read_all",
            Self::WriteAll => "write_all",
            Self::DeleteAll => "delete_all",
            Self::ManageUsers => "manage_users",
            Self::ManageBranches => "manage_branches",
            Self::ManageSettings => "manage_settings",
            Self::ViewReports => "view_reports",
            Self::WriteAssets => "write_assets",
            Self::WriteOperations => "write_operations",
            Self::WriteWarehouses => "write_warehouses",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| format!("unknown permission: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_table() {
        let admin = Role::Admin.permissions();
        assert_eq!(admin.len(), 7);
        assert!(admin.contains(&Permission::ManageSettings));
        assert!(!admin.contains(&Permission::WriteAssets));
    }

    #[test]
    fn test_accountant_and_keeper_differ_only_by_reports() {
        assert!(Role::Accountant.has_permission(Permission::ViewReports));
        assert!(!Role::WarehouseKeeper.has_permission(Permission::ViewReports));
        for p in [Permission::WriteAssets, Permission::WriteOperations, Permission::WriteWarehouses] {
            assert!(Role::Accountant.has_permission(p));
            assert!(Role::WarehouseKeeper.has_permission(p));
        }
    }

    #[test]
    fn test_observer_is_read_only() {
        assert_eq!(Role::Observer.permissions(), &[Permission::ReadAll, Permission::ViewReports]);
    }

    #[test]
    fn test_every_role_can_read() {
        for role in Role::ALL {
            assert!(role.has_permission(Permission::ReadAll), "{role}");
        }
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::WarehouseKeeper).unwrap(), r#""Warehouse_keeper""#);
        let parsed: Role = serde_json::from_str(r#""Observer""#).unwrap();
        assert_eq!(parsed, Role::Observer);
        assert!(serde_json::from_str::<Role>(r#""Manager""#).is_err());
    }

    #[test]
    fn test_role_from_str_ignores_case() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("warehouse_keeper".parse::<Role>().unwrap(), Role::WarehouseKeeper);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_permission_wire_names() {
        for permission in Permission::ALL {
            let json = serde_json::to_string(&permission).unwrap();
            assert_eq!(json, format!("\"{}\"", permission.as_str()));
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), permission);
        }
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::Admin.label(), "Администратор");
        assert_eq!(Role::WarehouseKeeper.label(), "Кладовщик");
        assert_eq!(Role::Observer.label(), "Наблюдатель");
    }
}
