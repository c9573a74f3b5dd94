//! Assets and asset list queries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueryParams;
use super::timestamp;
use crate::validate::ValidationReport;

/// Accounting category of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetCategory {
    /// Long-lived fixed assets.
    #[serde(rename = "Fixed Assets")]
    FixedAssets,
    /// Raw materials.
    Materials,
    /// Goods for resale.
    Goods,
    /// Small inventory.
    Inventory,
}

impl AssetCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::FixedAssets, Self::Materials, Self::Goods, Self::Inventory];

    /// Returns the backend wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedAssets => "Fixed Assets",
            Self::Materials => "Materials",
            Self::Goods => "Goods",
            Self::Inventory => "Inventory",
        }
    }

    /// Returns the localized display label.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::AssetCategory;
    ///
    /// assert_eq!(AssetCategory::FixedAssets.label(), "Основные средства");
    /// ```
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FixedAssets => "Основные средства",
            Self::Materials => "Материалы",
            Self::Goods => "Товары",
            Self::Inventory => "Инвентарь",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted) || c.as_str().replace(' ', "_").eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Lifecycle status of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum AssetStatus {
    /// In use.
    #[default]
    Active,
    /// Temporarily out of use.
    Inactive,
    /// Under repair.
    Repair,
    /// Written off.
    Disposed,
}

impl AssetStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [Self::Active, Self::Inactive, Self::Repair, Self::Disposed];

    /// Returns the backend wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Repair => "Repair",
            Self::Disposed => "Disposed",
        }
    }

    /// Returns the localized display label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Активен",
            Self::Inactive => "Неактивен",
            Self::Repair => "Ремонт",
            Self::Disposed => "Списан",
        }
    }

    /// Returns the badge tone used when rendering the status.
    #[inline]
    #[must_use]
    pub const fn tone(self) -> &'static str {
        match self {
            Self::Active => "success",
            Self::Inactive => "gray",
            Self::Repair => "warning",
            Self::Disposed => "danger",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

/// An inventory item held in a warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Backend identifier.
    pub id: i64,
    /// Generated inventory number, `INV-YYYYMMDD-NNNN`.
    pub inventory_number: String,
    /// Asset name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Accounting category.
    pub category: AssetCategory,
    /// Unit cost in rubles.
    pub cost: f64,
    /// Number of units.
    pub quantity: i64,
    /// Lifecycle status.
    #[serde(default)]
    pub status: AssetStatus,
    /// Warehouse holding the asset.
    pub warehouse_id: i64,
    /// Manufacturer serial number.
    #[serde(default)]
    pub serial_number: Option<String>,
    /// Supplier name.
    #[serde(default)]
    pub supplier: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Purchase date.
    #[serde(default, with = "timestamp::option")]
    pub purchase_date: Option<DateTime<Utc>>,
    /// End of warranty.
    #[serde(default, with = "timestamp::option")]
    pub warranty_until: Option<DateTime<Utc>>,
    /// Creation time.
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    /// `false` once soft-deleted.
    #[serde(default = "super::user::default_true")]
    pub is_active: bool,
}

impl Asset {
    /// Total value, `cost × quantity`.
    ///
    /// # Examples
    ///
    /// ```
    /// # let json = r#"{"id":1,"inventory_number":"INV-20240101-0001","name":"Стол",
    /// #   "category":"Inventory","cost":1500.5,"quantity":4,"warehouse_id":1}"#;
    /// let asset: am_core::Asset = serde_json::from_str(json).unwrap();
    /// assert_eq!(asset.total_value(), 6002.0);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_value(&self) -> f64 {
        self.cost * self.quantity as f64
    }
}

/// An asset to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    /// Asset name, at least two characters.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accounting category.
    pub category: AssetCategory,
    /// Unit cost, positive.
    pub cost: f64,
    /// Number of units, positive.
    pub quantity: i64,
    /// Initial status.
    #[serde(default)]
    pub status: AssetStatus,
    /// Target warehouse.
    pub warehouse_id: i64,
    /// Manufacturer serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Supplier name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Purchase date.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub purchase_date: Option<DateTime<Utc>>,
    /// End of warranty.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub warranty_until: Option<DateTime<Utc>>,
}

impl NewAsset {
    /// Creates an active asset with the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, category: AssetCategory, cost: f64, quantity: i64, warehouse_id: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            category,
            cost,
            quantity,
            status: AssetStatus::Active,
            warehouse_id,
            serial_number: None,
            supplier: None,
            notes: None,
            purchase_date: None,
            warranty_until: None,
        }
    }

    /// Checks the asset before it is sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::{AssetCategory, NewAsset};
    ///
    /// let report = NewAsset::new("Н", AssetCategory::Goods, 0.0, 1, 1).validate();
    /// assert!(!report.is_valid());
    /// assert!(report.error("name").is_some());
    /// assert!(report.error("cost").is_some());
    /// ```
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if self.name.trim().chars().count() < 2 {
            report.add("name", "Название должно содержать минимум 2 символа");
        }
        if self.cost.is_nan() || self.cost <= 0.0 {
            report.add("cost", "Стоимость должна быть больше 0");
        }
        if self.quantity <= 0 {
            report.add("quantity", "Количество должно быть больше 0");
        }
        if self.warehouse_id <= 0 {
            report.add("warehouse_id", "Выберите склад");
        }
        report
    }
}

/// Changes to an existing asset. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetUpdate {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<AssetCategory>,
    /// New unit cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// New quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AssetStatus>,
    /// New warehouse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<i64>,
    /// New serial number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// New supplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// New notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Restore or soft-delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl AssetUpdate {
    /// Applies the set fields to a local copy of `asset`.
    pub fn apply(&self, asset: &mut Asset) {
        if let Some(name) = &self.name {
            asset.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            asset.description = Some(description.clone());
        }
        if let Some(category) = self.category {
            asset.category = category;
        }
        if let Some(cost) = self.cost {
            asset.cost = cost;
        }
        if let Some(quantity) = self.quantity {
            asset.quantity = quantity;
        }
        if let Some(status) = self.status {
            asset.status = status;
        }
        if let Some(warehouse_id) = self.warehouse_id {
            asset.warehouse_id = warehouse_id;
        }
        if let Some(serial) = &self.serial_number {
            asset.serial_number = Some(serial.clone());
        }
        if let Some(supplier) = &self.supplier {
            asset.supplier = Some(supplier.clone());
        }
        if let Some(notes) = &self.notes {
            asset.notes = Some(notes.clone());
        }
        if let Some(active) = self.is_active {
            asset.is_active = active;
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortOrder {
    /// Returns the opposite direction.
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Returns the query string value.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters and sorting for the asset list.
///
/// Page and size are supplied separately by the paginating caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetQuery {
    /// Free-text search over name, inventory number, and serial number.
    pub search: Option<String>,
    /// Restrict to a category.
    pub category: Option<AssetCategory>,
    /// Restrict to a status.
    pub status: Option<AssetStatus>,
    /// Restrict to a warehouse.
    pub warehouse_id: Option<i64>,
    /// Sort column.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl AssetQuery {
    /// Returns the query string parameters for these filters.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::{AssetQuery, AssetStatus};
    ///
    /// let query = AssetQuery { status: Some(AssetStatus::Repair), ..AssetQuery::default() };
    /// let params = query.to_params();
    /// assert!(params.contains(&("status", "Repair".to_owned())));
    /// ```
    #[must_use]
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(search) = &self.search {
            params.push(("search", search.trim().to_owned()));
        }
        if let Some(category) = self.category {
            params.push(("category", category.as_str().to_owned()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_owned()));
        }
        if let Some(warehouse_id) = self.warehouse_id {
            params.push(("warehouse_id", warehouse_id.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sort_by", sort_by.clone()));
            params.push(("sort_order", self.sort_order.as_str().to_owned()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET_JSON: &str = r#"{
        "id": 7,
        "inventory_number": "INV-20240115-0007",
        "name": "Ноутбук",
        "description": null,
        "category": "Fixed Assets",
        "cost": 85000.0,
        "quantity": 2,
        "status": "Repair",
        "warehouse_id": 1,
        "serial_number": "SN-1",
        "supplier": null,
        "notes": null,
        "created_at": "2024-01-15T08:00:00",
        "updated_at": null,
        "is_active": true,
        "purchase_date": null,
        "warranty_until": "2026-01-15T00:00:00"
    }"#;

    #[test]
    fn test_asset_from_backend_json() {
        let asset: Asset = serde_json::from_str(ASSET_JSON).unwrap();
        assert_eq!(asset.category, AssetCategory::FixedAssets);
        assert_eq!(asset.status, AssetStatus::Repair);
        assert!((asset.total_value() - 170_000.0).abs() < f64::EPSILON);
        assert!(asset.warranty_until.is_some());
    }

    #[test]
    fn test_category_wire_and_parse() {
        assert_eq!(serde_json::to_string(&AssetCategory::FixedAssets).unwrap(), r#""Fixed Assets""#);
        assert_eq!("fixed_assets".parse::<AssetCategory>().unwrap(), AssetCategory::FixedAssets);
        assert_eq!("Goods".parse::<AssetCategory>().unwrap(), AssetCategory::Goods);
        assert!("Tools".parse::<AssetCategory>().is_err());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(AssetStatus::Active.label(), "Активен");
        assert_eq!(AssetStatus::Disposed.label(), "Списан");
        assert_eq!(AssetStatus::Repair.tone(), "warning");
    }

    #[test]
    fn test_new_asset_validation() {
        let valid = NewAsset::new("Стол офисный", AssetCategory::Inventory, 4500.0, 3, 2);
        assert!(valid.validate().is_valid());

        let invalid = NewAsset::new(" ", AssetCategory::Inventory, -1.0, 0, 0);
        let report = invalid.validate();
        assert_eq!(report.errors().len(), 4);
        assert_eq!(report.error("quantity"), Some("Количество должно быть больше 0"));
    }

    #[test]
    fn test_update_applies_set_fields() {
        let mut asset: Asset = serde_json::from_str(ASSET_JSON).unwrap();
        let update = AssetUpdate {
            status: Some(AssetStatus::Active),
            quantity: Some(5),
            ..AssetUpdate::default()
        };
        update.apply(&mut asset);
        assert_eq!(asset.status, AssetStatus::Active);
        assert_eq!(asset.quantity, 5);
        assert_eq!(asset.name, "Ноутбук");
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"quantity":5,"status":"Active"}"#
        );
    }

    #[test]
    fn test_query_params_skip_unset_filters() {
        assert!(AssetQuery::default().to_params().is_empty());
        let query = AssetQuery {
            search: Some(" стол ".to_owned()),
            warehouse_id: Some(3),
            sort_by: Some("cost".to_owned()),
            sort_order: SortOrder::Desc,
            ..AssetQuery::default()
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("search", "стол".to_owned()),
                ("warehouse_id", "3".to_owned()),
                ("sort_by", "cost".to_owned()),
                ("sort_order", "desc".to_owned()),
            ]
        );
    }

    #[test]
    fn test_sort_order_toggle() {
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
        assert_eq!(SortOrder::Desc.toggled(), SortOrder::Asc);
    }
}
