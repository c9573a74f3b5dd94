use am_core::{AssetReport, Dashboard, OperationReport, ReportFilter};
use chrono::Utc;

use super::ensure_valid;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::Transport;

/// Dashboard and report endpoints.
#[derive(Debug)]
pub struct ReportsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ReportsApi<'a, T> {
    pub(crate) const fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Fetches dashboard statistics, charts, and recent operations.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.client.get("/dashboard").await
    }

    /// Generates an asset report.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] without a request if the date range is
    /// inverted or starts in the future.
    pub async fn assets(&self, filter: &ReportFilter) -> Result<AssetReport, ApiError> {
        ensure_valid(filter.validate(Utc::now()))?;
        self.client.post("/reports/assets", filter).await
    }

    /// Generates an operation report.
    ///
    /// # Errors
    ///
    /// See [`assets`](Self::assets).
    pub async fn operations(&self, filter: &ReportFilter) -> Result<OperationReport, ApiError> {
        ensure_valid(filter.validate(Utc::now()))?;
        self.client.post("/reports/operations", filter).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::services::fixtures;
    use crate::transport::Method;

    #[tokio::test]
    async fn test_dashboard_decodes() {
        let (client, transport, _) = fixtures::client();
        transport.respond(
            Method::Get,
            "/dashboard",
            200,
            json!({
                "stats": {
                    "total_assets": 12,
                    "total_value": 1250000.0,
                    "operations_today": 3,
                    "active_warehouses": 2,
                    "monthly_growth": 5.5
                },
                "category_stats": [
                    {"category": "Fixed Assets", "count": 10, "value": 1200000.0, "percentage": 96.0}
                ],
                "monthly_operations": [
                    {"month": "Янв", "receipt": 120, "transfer": 80, "disposal": 20, "adjustment": 15}
                ],
                "recent_operations": [fixtures::operation(1, 1, "Receipt")]
            }),
        );
        let dashboard = client.reports().dashboard().await.unwrap();
        assert_eq!(dashboard.stats.total_assets, 12);
        assert_eq!(dashboard.monthly_operations[0].total(), 235);
        assert_eq!(dashboard.recent_operations.len(), 1);
    }

    #[tokio::test]
    async fn test_inverted_range_rejected_locally() {
        let (client, transport, _) = fixtures::client();
        let now = Utc::now();
        let filter = ReportFilter {
            start_date: Some(now - Duration::days(1)),
            end_date: Some(now - Duration::days(10)),
            ..ReportFilter::default()
        };
        assert!(matches!(client.reports().assets(&filter).await, Err(ApiError::Validation { .. })));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_operation_report() {
        let (client, transport, _) = fixtures::client();
        transport.respond(
            Method::Post,
            "/reports/operations",
            200,
            json!({
                "filters": {},
                "operations": [fixtures::operation(1, 1, "Receipt")],
                "total_count": 1,
                "summary_by_type": {"Receipt": 1, "Transfer": 0, "Disposal": 0, "Adjustment": 0}
            }),
        );
        let report = client.reports().operations(&ReportFilter::default()).await.unwrap();
        assert_eq!(report.total_count, 1);
        assert_eq!(report.summary_by_type["Receipt"], 1);
        assert_eq!(transport.last_request().unwrap().json().map(|b| b.is_object()), Some(true));
    }
}
