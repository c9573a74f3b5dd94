//! Branches and warehouses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// A company branch grouping warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Backend identifier.
    pub id: i64,
    /// Branch name.
    pub name: String,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Owning company.
    #[serde(default)]
    pub company_id: Option<i64>,
    /// Whether the branch is in use.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Creation time.
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A storage location holding assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    /// Backend identifier.
    pub id: i64,
    /// Warehouse name.
    pub name: String,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Branch the warehouse belongs to.
    pub branch_id: i64,
    /// Whether the warehouse is in use.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Creation time.
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Embedded branch, when the backend includes it.
    #[serde(default)]
    pub branch: Option<Branch>,
}

impl Warehouse {
    /// Returns `true` unless the backend marks the warehouse inactive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

/// A branch to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBranch {
    /// Branch name, at least two characters.
    pub name: String,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A warehouse to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    /// Warehouse name, at least two characters.
    pub name: String,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Branch the warehouse belongs to.
    pub branch_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warehouse_with_embedded_branch() {
        let json = r#"{
            "id": 3,
            "name": "Главный склад",
            "address": null,
            "branch_id": 1,
            "created_at": "2024-02-01T12:00:00",
            "is_active": true,
            "branch": {"id": 1, "name": "Москва", "company_id": 1, "is_active": true}
        }"#;
        let warehouse: Warehouse = serde_json::from_str(json).unwrap();
        assert!(warehouse.is_active());
        assert_eq!(warehouse.branch.unwrap().name, "Москва");
    }

    #[test]
    fn test_new_warehouse_omits_missing_address() {
        let warehouse = NewWarehouse {
            name: "Склад 2".to_owned(),
            address: None,
            branch_id: 4,
        };
        assert_eq!(
            serde_json::to_string(&warehouse).unwrap(),
            r#"{"name":"Склад 2","branch_id":4}"#
        );
    }
}
