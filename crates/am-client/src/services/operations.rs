use am_core::{NewOperation, Operation, OperationQuery};
use tracing::info;

use super::ensure_valid;
use crate::client::ApiClient;
use crate::download::Download;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::url::build_url;

/// Records fetched when filtering operations by asset on the client.
const ASSET_HISTORY_LIMIT: u32 = 1000;

/// `/operations` endpoints.
#[derive(Debug)]
pub struct OperationsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> OperationsApi<'a, T> {
    pub(crate) const fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Lists operations, newest first.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn list(&self, query: &OperationQuery) -> Result<Vec<Operation>, ApiError> {
        self.client.get(&build_url("/operations", &query.to_params())).await
    }

    /// Records an operation after validating it locally.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] without a request if the operation is
    /// inconsistent, e.g. a transfer within one warehouse.
    pub async fn create(&self, operation: &NewOperation) -> Result<Operation, ApiError> {
        ensure_valid(operation.validate())?;
        let created: Operation = self.client.post("/operations", operation).await?;
        info!(id = created.id, kind = created.kind.as_str(), asset_id = created.asset_id, "operation recorded");
        Ok(created)
    }

    /// Records units arriving at a warehouse.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub async fn receipt(
        &self,
        asset_id: i64,
        quantity: i64,
        to_warehouse_id: i64,
        notes: Option<&str>,
    ) -> Result<Operation, ApiError> {
        let mut operation = NewOperation::receipt(asset_id, quantity, to_warehouse_id);
        if let Some(notes) = notes {
            operation = operation.with_notes(notes);
        }
        self.create(&operation).await
    }

    /// Records units moving between warehouses.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub async fn transfer(
        &self,
        asset_id: i64,
        quantity: i64,
        from_warehouse_id: i64,
        to_warehouse_id: i64,
        notes: Option<&str>,
    ) -> Result<Operation, ApiError> {
        let mut operation = NewOperation::transfer(asset_id, quantity, from_warehouse_id, to_warehouse_id);
        if let Some(notes) = notes {
            operation = operation.with_notes(notes);
        }
        self.create(&operation).await
    }

    /// Records units being written off.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub async fn disposal(
        &self,
        asset_id: i64,
        quantity: i64,
        from_warehouse_id: i64,
        reason: &str,
    ) -> Result<Operation, ApiError> {
        let operation = NewOperation::disposal(asset_id, quantity, from_warehouse_id).with_reason(reason);
        self.create(&operation).await
    }

    /// Records a cost correction.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub async fn adjustment(
        &self,
        asset_id: i64,
        quantity: i64,
        cost_before: f64,
        cost_after: f64,
        reason: &str,
    ) -> Result<Operation, ApiError> {
        let operation = NewOperation::adjustment(asset_id, quantity, cost_before, cost_after).with_reason(reason);
        self.create(&operation).await
    }

    /// Returns the operation history of one asset.
    ///
    /// The backend has no per-asset filter, so a large window is fetched and
    /// filtered here.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn by_asset(&self, asset_id: i64) -> Result<Vec<Operation>, ApiError> {
        let query = OperationQuery { limit: ASSET_HISTORY_LIMIT, ..OperationQuery::default() };
        let mut operations = self.list(&query).await?;
        operations.retain(|op| op.asset_id == asset_id);
        Ok(operations)
    }

    /// Returns the latest `limit` operations.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Operation>, ApiError> {
        self.list(&OperationQuery { skip: 0, limit, ..OperationQuery::default() }).await
    }

    /// Downloads an Excel export of operations matching the filters.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn export(&self, query: &OperationQuery) -> Result<Download, ApiError> {
        let params: Vec<(&str, String)> = std::iter::once(("format", "excel".to_owned()))
            .chain(
                query
                    .to_params()
                    .into_iter()
                    .filter(|(key, _)| !matches!(*key, "skip" | "limit")),
            )
            .collect();
        self.client.download(&build_url("/export/operations", &params)).await
    }
}

#[cfg(test)]
mod tests {
    use am_core::OperationType;
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::services::fixtures;
    use crate::transport::{HttpResponse, Method};

    #[tokio::test]
    async fn test_list_query_string() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/operations", 200, json!([fixtures::operation(1, 2, "Receipt")]));
        let query = OperationQuery {
            operation_type: Some(OperationType::Receipt),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..OperationQuery::default()
        };
        let ops = client.operations().list(&query).await.unwrap();
        assert_eq!(ops[0].kind, OperationType::Receipt);
        assert_eq!(
            transport.last_request().unwrap().query(),
            Some("skip=0&limit=100&operation_type=Receipt&start_date=2024-03-01")
        );
    }

    #[tokio::test]
    async fn test_transfer_to_same_warehouse_rejected() {
        let (client, transport, _) = fixtures::client();
        let err = client.operations().transfer(1, 1, 3, 3, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
        assert!(err.user_message().contains("Склад отправления и назначения не могут совпадать"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_helpers_build_payloads() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Post, "/operations", 200, fixtures::operation(5, 7, "Disposal"));

        client.operations().disposal(7, 1, 2, "Поломка").await.unwrap();
        let body = transport.last_request().unwrap().json().unwrap();
        assert_eq!(body["type"], "Disposal");
        assert_eq!(body["from_warehouse_id"], 2);
        assert_eq!(body["reason"], "Поломка");

        client.operations().receipt(7, 10, 3, Some("Поставка")).await.unwrap();
        let body = transport.last_request().unwrap().json().unwrap();
        assert_eq!(body["type"], "Receipt");
        assert_eq!(body["to_warehouse_id"], 3);
        assert_eq!(body["notes"], "Поставка");

        client.operations().adjustment(7, 1, 100.0, 120.0, "Переоценка").await.unwrap();
        let body = transport.last_request().unwrap().json().unwrap();
        assert_eq!(body["cost_after"], 120.0);
    }

    #[tokio::test]
    async fn test_by_asset_filters_client_side() {
        let (client, transport, _) = fixtures::client();
        transport.respond(
            Method::Get,
            "/operations",
            200,
            json!([
                fixtures::operation(1, 7, "Receipt"),
                fixtures::operation(2, 8, "Receipt"),
                fixtures::operation(3, 7, "Transfer")
            ]),
        );
        let history = client.operations().by_asset(7).await.unwrap();
        assert_eq!(history.iter().map(|op| op.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(transport.last_request().unwrap().query().is_some_and(|q| q.contains("limit=1000")));
    }

    #[tokio::test]
    async fn test_recent_and_export() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/operations", 200, json!([]));
        transport.respond_raw(
            Method::Get,
            "/export/operations",
            HttpResponse {
                status: 200,
                headers: vec![("Content-Disposition".into(), "attachment; filename=operations.xlsx".into())],
                body: vec![7],
            },
        );

        client.operations().recent(10).await.unwrap();
        assert_eq!(transport.last_request().unwrap().query(), Some("skip=0&limit=10"));

        let query = OperationQuery { operation_type: Some(OperationType::Transfer), ..OperationQuery::default() };
        let file = client.operations().export(&query).await.unwrap();
        assert_eq!(file.filename, "operations.xlsx");
        assert_eq!(
            transport.last_request().unwrap().query(),
            Some("format=excel&operation_type=Transfer")
        );
    }
}
