//! Domain records exchanged with the asset management backend.
//!
//! Records mirror the backend's JSON schemas. Timestamps are carried as
//! [`DateTime<Utc>`](chrono::DateTime) and accept both RFC 3339 strings and the
//! naive ISO form the backend emits for columns stored without a zone.

mod asset;
mod location;
mod operation;
mod page;
mod permission;
mod report;
mod user;

pub use asset::{Asset, AssetCategory, AssetQuery, AssetStatus, AssetUpdate, NewAsset, SortOrder};
pub use location::{Branch, NewBranch, NewWarehouse, Warehouse};
pub use operation::{NewOperation, Operation, OperationQuery, OperationType};
pub use page::{Page, PageInfo, PageParams};
pub use permission::{Permission, Role};
pub use report::{
    AssetReport, CategoryStats, Dashboard, DashboardStats, DateRangePreset, GroupTotals,
    MonthlyOperationStats, OperationReport, ReportFilter, SummaryStats, period_change,
};
pub use user::{AuthToken, Company, CompanyRegistration, Credentials, NewUser, User, UserPatch, UserUpdate};

/// Query string parameters as ordered `(name, value)` pairs.
///
/// Empty values are kept here and dropped when the URL is built.
pub type QueryParams = Vec<(&'static str, String)>;

/// Serde adapter for backend timestamps.
///
/// Serializes as RFC 3339. Deserializes RFC 3339 or a naive
/// `YYYY-MM-DDTHH:MM:SS[.frac]` value, which is taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parses a backend timestamp string.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::types::timestamp::parse;
    ///
    /// assert!(parse("2024-03-01T10:15:00").is_some());
    /// assert!(parse("2024-03-01T10:15:00+03:00").is_some());
    /// assert!(parse("yesterday").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    /// Serializes a timestamp as RFC 3339.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    /// Deserializes a timestamp in either accepted form.
    ///
    /// # Errors
    ///
    /// Fails when the string matches neither form.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// The same adapter for optional fields.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serializes an optional timestamp, `None` as null.
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional timestamp, treating null as `None`.
        ///
        /// # Errors
        ///
        /// Fails when a present string matches neither accepted form.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|raw| {
                super::parse(&raw)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use serde::Deserialize;

    use super::timestamp;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(with = "timestamp")]
        at: chrono::DateTime<chrono::Utc>,
        #[serde(default, with = "timestamp::option")]
        maybe: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let parsed = timestamp::parse("2024-03-01T10:15:30.123456").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.second(), 30);
    }

    #[test]
    fn test_offset_timestamp_is_normalised() {
        let parsed = timestamp::parse("2024-03-01T10:00:00+03:00").unwrap();
        assert_eq!(parsed.hour(), 7);
    }

    #[test]
    fn test_optional_timestamp_null_and_missing() {
        let with_null: Stamped =
            serde_json::from_str(r#"{"at": "2024-01-01T00:00:00", "maybe": null}"#).unwrap();
        assert!(with_null.maybe.is_none());
        let missing: Stamped = serde_json::from_str(r#"{"at": "2024-01-01T00:00:00Z"}"#).unwrap();
        assert!(missing.maybe.is_none());
        assert_eq!(missing.at.month(), 1);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let result = serde_json::from_str::<Stamped>(r#"{"at": "not a date"}"#);
        assert!(result.is_err());
    }
}
