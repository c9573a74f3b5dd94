//! Inventory operations: receipts, transfers, disposals, and adjustments.
//!
//! Operations are immutable once recorded. The backend applies them to the
//! referenced asset; the client only constructs and validates them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::QueryParams;
use super::asset::Asset;
use super::timestamp;
use crate::validate::ValidationReport;

/// Kind of inventory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationType {
    /// Units arrive at a warehouse.
    Receipt,
    /// Units move between two warehouses.
    Transfer,
    /// Units are written off.
    Disposal,
    /// Quantity or cost is corrected.
    Adjustment,
}

impl OperationType {
    /// Every operation type, in display order.
    pub const ALL: [Self; 4] = [Self::Receipt, Self::Transfer, Self::Disposal, Self::Adjustment];

    /// Returns the backend wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "Receipt",
            Self::Transfer => "Transfer",
            Self::Disposal => "Disposal",
            Self::Adjustment => "Adjustment",
        }
    }

    /// Returns the localized display label.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::OperationType;
    ///
    /// assert_eq!(OperationType::Transfer.label(), "Перемещение");
    /// ```
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Receipt => "Поступление",
            Self::Transfer => "Перемещение",
            Self::Disposal => "Списание",
            Self::Adjustment => "Корректировка",
        }
    }

    /// Returns `true` if the operation needs a destination warehouse.
    #[inline]
    #[must_use]
    pub const fn requires_destination(self) -> bool {
        matches!(self, Self::Receipt | Self::Transfer)
    }

    /// Returns `true` if the operation needs a source warehouse.
    #[inline]
    #[must_use]
    pub const fn requires_source(self) -> bool {
        matches!(self, Self::Transfer | Self::Disposal)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown operation type: {s}"))
    }
}

/// A recorded operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Backend identifier.
    pub id: i64,
    /// Operation kind.
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// Affected asset.
    pub asset_id: i64,
    /// Number of units.
    pub quantity: i64,
    /// Source warehouse.
    #[serde(default)]
    pub from_warehouse_id: Option<i64>,
    /// Destination warehouse.
    #[serde(default)]
    pub to_warehouse_id: Option<i64>,
    /// Unit cost before an adjustment.
    #[serde(default)]
    pub cost_before: Option<f64>,
    /// Unit cost after an adjustment.
    #[serde(default)]
    pub cost_after: Option<f64>,
    /// User who recorded the operation.
    pub user_id: i64,
    /// When the operation happened.
    #[serde(with = "timestamp")]
    pub operation_date: DateTime<Utc>,
    /// Reason given by the user.
    #[serde(default)]
    pub reason: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Supporting document number.
    #[serde(default)]
    pub document_number: Option<String>,
    /// When the record was stored.
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Embedded asset, when the backend includes it.
    #[serde(default)]
    pub asset: Option<Asset>,
}

/// An operation to record.
///
/// # Examples
///
/// ```
/// use am_core::NewOperation;
///
/// let transfer = NewOperation::transfer(12, 3, 1, 2).with_reason("Переезд");
/// assert!(transfer.validate().is_valid());
///
/// let bad = NewOperation::transfer(12, 3, 1, 1);
/// assert!(bad.validate().error("to_warehouse_id").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperation {
    /// Operation kind.
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// Affected asset.
    pub asset_id: i64,
    /// Number of units.
    pub quantity: i64,
    /// Source warehouse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_warehouse_id: Option<i64>,
    /// Destination warehouse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_warehouse_id: Option<i64>,
    /// Unit cost before an adjustment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_before: Option<f64>,
    /// Unit cost after an adjustment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_after: Option<f64>,
    /// Reason given by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Supporting document number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
}

impl NewOperation {
    fn base(kind: OperationType, asset_id: i64, quantity: i64) -> Self {
        Self {
            kind,
            asset_id,
            quantity,
            from_warehouse_id: None,
            to_warehouse_id: None,
            cost_before: None,
            cost_after: None,
            reason: None,
            notes: None,
            document_number: None,
        }
    }

    /// A receipt of `quantity` units into `to_warehouse`.
    #[must_use]
    pub fn receipt(asset_id: i64, quantity: i64, to_warehouse: i64) -> Self {
        Self {
            to_warehouse_id: Some(to_warehouse),
            ..Self::base(OperationType::Receipt, asset_id, quantity)
        }
    }

    /// A transfer of `quantity` units between two warehouses.
    #[must_use]
    pub fn transfer(asset_id: i64, quantity: i64, from_warehouse: i64, to_warehouse: i64) -> Self {
        Self {
            from_warehouse_id: Some(from_warehouse),
            to_warehouse_id: Some(to_warehouse),
            ..Self::base(OperationType::Transfer, asset_id, quantity)
        }
    }

    /// A disposal of `quantity` units from `from_warehouse`.
    #[must_use]
    pub fn disposal(asset_id: i64, quantity: i64, from_warehouse: i64) -> Self {
        Self {
            from_warehouse_id: Some(from_warehouse),
            ..Self::base(OperationType::Disposal, asset_id, quantity)
        }
    }

    /// A cost adjustment from `cost_before` to `cost_after`.
    #[must_use]
    pub fn adjustment(asset_id: i64, quantity: i64, cost_before: f64, cost_after: f64) -> Self {
        Self {
            cost_before: Some(cost_before),
            cost_after: Some(cost_after),
            ..Self::base(OperationType::Adjustment, asset_id, quantity)
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the supporting document number.
    #[must_use]
    pub fn with_document_number(mut self, number: impl Into<String>) -> Self {
        self.document_number = Some(number.into());
        self
    }

    /// Checks the warehouse, quantity, and cost constraints of the operation kind.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if self.asset_id <= 0 {
            report.add("asset_id", "Выберите актив");
        }
        if self.quantity <= 0 {
            report.add("quantity", "Количество должно быть больше 0");
        }
        match self.kind {
            OperationType::Transfer => {
                if self.to_warehouse_id.is_none() {
                    report.add("to_warehouse_id", "Для перемещения требуется склад назначения");
                } else if self.from_warehouse_id == self.to_warehouse_id {
                    report.add(
                        "to_warehouse_id",
                        "Склад отправления и назначения не могут совпадать",
                    );
                }
                if self.from_warehouse_id.is_none() {
                    report.add("from_warehouse_id", "Для перемещения требуется склад отправления");
                }
            }
            OperationType::Receipt => {
                if self.to_warehouse_id.is_none() {
                    report.add("to_warehouse_id", "Для поступления требуется склад назначения");
                }
            }
            OperationType::Disposal => {
                if self.from_warehouse_id.is_none() {
                    report.add("from_warehouse_id", "Для списания требуется склад отправления");
                }
            }
            OperationType::Adjustment => {
                if self.cost_after.is_some_and(|cost| cost <= 0.0) {
                    report.add("cost_after", "Новая стоимость должна быть больше 0");
                }
            }
        }
        report
    }
}

/// Filters for the operation list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationQuery {
    /// Number of records to skip.
    pub skip: u32,
    /// Maximum number of records.
    pub limit: u32,
    /// Restrict to one kind.
    pub operation_type: Option<OperationType>,
    /// Earliest operation date.
    pub start_date: Option<NaiveDate>,
    /// Latest operation date.
    pub end_date: Option<NaiveDate>,
}

impl Default for OperationQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            operation_type: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl OperationQuery {
    /// Returns the query string parameters for these filters.
    #[must_use]
    pub fn to_params(&self) -> QueryParams {
        let mut params = vec![("skip", self.skip.to_string()), ("limit", self.limit.to_string())];
        if let Some(kind) = self.operation_type {
            params.push(("operation_type", kind.as_str().to_owned()));
        }
        if let Some(start) = self.start_date {
            params.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        params
    }
}
