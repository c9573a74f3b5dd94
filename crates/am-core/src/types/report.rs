//! Dashboard data, report filters, and report summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::{Asset, AssetCategory, AssetStatus};
use super::operation::Operation;
use super::timestamp;
use crate::validate::ValidationReport;

/// Headline figures of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Number of active assets.
    pub total_assets: u64,
    /// Sum of `cost × quantity` over active assets.
    pub total_value: f64,
    /// Operations recorded today.
    pub operations_today: u64,
    /// Warehouses in use.
    pub active_warehouses: u64,
    /// Month-over-month growth in percent.
    pub monthly_growth: f64,
}

/// Per-category share of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Category.
    pub category: AssetCategory,
    /// Number of assets.
    pub count: u64,
    /// Total value.
    pub value: f64,
    /// Share of the total value in percent.
    pub percentage: f64,
}

/// Operation counts for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOperationStats {
    /// Month abbreviation as sent by the backend (`Jan`, `Feb`, ...).
    pub month: String,
    /// Receipts.
    pub receipt: u64,
    /// Transfers.
    pub transfer: u64,
    /// Disposals.
    pub disposal: u64,
    /// Adjustments.
    pub adjustment: u64,
}

impl MonthlyOperationStats {
    /// Returns the localized month abbreviation, or the raw value if unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::MonthlyOperationStats;
    ///
    /// let stats = MonthlyOperationStats { month: "Oct".to_owned(), ..Default::default() };
    /// assert_eq!(stats.month_label(), "Окт");
    /// ```
    #[must_use]
    pub fn month_label(&self) -> &str {
        match self.month.as_str() {
            "Jan" => "Янв",
            "Feb" => "Фев",
            "Mar" => "Мар",
            "Apr" => "Апр",
            "May" => "Май",
            "Jun" => "Июн",
            "Jul" => "Июл",
            "Aug" => "Авг",
            "Sep" => "Сен",
            "Oct" => "Окт",
            "Nov" => "Ноя",
            "Dec" => "Дек",
            other => other,
        }
    }

    /// Total operations in the month.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.receipt + self.transfer + self.disposal + self.adjustment
    }
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Headline figures.
    pub stats: DashboardStats,
    /// Value by category.
    #[serde(default)]
    pub category_stats: Vec<CategoryStats>,
    /// Operation counts by month.
    #[serde(default)]
    pub monthly_operations: Vec<MonthlyOperationStats>,
    /// Latest operations.
    #[serde(default)]
    pub recent_operations: Vec<Operation>,
}

/// Filters shared by the asset and operation reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilter {
    /// Earliest record time.
    #[serde(skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub start_date: Option<DateTime<Utc>>,
    /// Latest record time.
    #[serde(skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub end_date: Option<DateTime<Utc>>,
    /// Restrict to these warehouses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_ids: Option<Vec<i64>>,
    /// Restrict to a category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<AssetCategory>,
    /// Restrict to a status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AssetStatus>,
}

impl ReportFilter {
    /// Checks the date range against `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::ReportFilter;
    /// use chrono::{Duration, Utc};
    ///
    /// let now = Utc::now();
    /// let filter = ReportFilter {
    ///     start_date: Some(now),
    ///     end_date: Some(now - Duration::days(1)),
    ///     ..ReportFilter::default()
    /// };
    /// assert!(filter.validate(now).error("date_range").is_some());
    /// ```
    #[must_use]
    pub fn validate(&self, now: DateTime<Utc>) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                report.add("date_range", "Дата начала не может быть позже даты окончания");
            }
            if start > now {
                report.add("start_date", "Дата начала не может быть в будущем");
            }
        }
        report
    }
}

/// Assets matching a report filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    /// Filter the report was built with.
    pub filters: ReportFilter,
    /// Matching assets.
    pub assets: Vec<Asset>,
    /// Number of matching assets.
    pub total_count: u64,
    /// Sum of their values.
    pub total_value: f64,
}

/// Operations matching a report filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    /// Filter the report was built with.
    pub filters: ReportFilter,
    /// Matching operations.
    pub operations: Vec<Operation>,
    /// Number of matching operations.
    pub total_count: u64,
    /// Per-type summary as computed by the backend.
    #[serde(default)]
    pub summary_by_type: BTreeMap<String, serde_json::Value>,
}

/// Count and value of a group of assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTotals {
    /// Number of assets.
    pub count: u64,
    /// Sum of their values.
    pub value: f64,
}

/// Client-side summary of a set of assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of assets.
    pub total_items: u64,
    /// Sum of `cost × quantity`.
    pub total_value: f64,
    /// Mean value per asset.
    pub average_value: f64,
    /// Totals per category.
    pub category_breakdown: BTreeMap<AssetCategory, GroupTotals>,
}

impl SummaryStats {
    /// Summarises `assets`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_assets(assets: &[Asset]) -> Self {
        let mut stats = Self::default();
        for asset in assets {
            let value = asset.total_value();
            stats.total_items += 1;
            stats.total_value += value;
            let group = stats.category_breakdown.entry(asset.category).or_default();
            group.count += 1;
            group.value += value;
        }
        if stats.total_items > 0 {
            stats.average_value = stats.total_value / stats.total_items as f64;
        }
        stats
    }
}

/// Change from `previous` to `current` in percent; zero when there is no baseline.
#[must_use]
pub fn period_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || previous.is_nan() {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// A named date range offered in report forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangePreset {
    /// Localized label.
    pub label: String,
    /// Range start.
    pub start: NaiveDateTime,
    /// Range end.
    pub end: NaiveDateTime,
}

impl DateRangePreset {
    /// Returns the standard presets ending at `now`.
    ///
    /// Weeks start on Sunday.
    #[must_use]
    pub fn standard(now: NaiveDateTime) -> Vec<Self> {
        let today = now.date();
        let start_of_week = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
        let start_of_month = today.with_day(1).unwrap_or(today);
        let quarter_month = (today.month0() / 3) * 3 + 1;
        let start_of_quarter = NaiveDate::from_ymd_opt(today.year(), quarter_month, 1).unwrap_or(today);
        let start_of_year = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        let last_30 = today - Duration::days(30);

        [
            ("Сегодня", today),
            ("Эта неделя", start_of_week),
            ("Этот месяц", start_of_month),
            ("Этот квартал", start_of_quarter),
            ("Этот год", start_of_year),
            ("Последние 30 дней", last_30),
        ]
        .into_iter()
        .map(|(label, start)| Self {
            label: label.to_owned(),
            start: start.and_time(chrono::NaiveTime::MIN),
            end: now,
        })
        .collect()
    }

    /// Converts the preset into a report filter, reading both ends as UTC.
    #[must_use]
    pub fn to_filter(&self) -> ReportFilter {
        ReportFilter {
            start_date: Some(self.start.and_utc()),
            end_date: Some(self.end.and_utc()),
            ..ReportFilter::default()
        }
    }
}
