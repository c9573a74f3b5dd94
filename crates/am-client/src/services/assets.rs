use am_core::{Asset, AssetQuery, AssetUpdate, NewAsset, Page, PageParams};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ensure_valid;
use crate::client::ApiClient;
use crate::download::Download;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::url::build_url;

/// Page size used for full-text search.
const SEARCH_PAGE_SIZE: u32 = 50;
/// Page size used when listing a whole warehouse.
const WAREHOUSE_PAGE_SIZE: u32 = 1000;

/// A bare `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable acknowledgement.
    pub message: String,
}

/// Outcome of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateResult {
    /// Human-readable summary.
    pub message: String,
    /// Assets actually updated.
    pub updated_count: u64,
    /// Assets named in the request.
    pub total_requested: u64,
}

impl BulkUpdateResult {
    /// Returns `true` if some requested assets were not updated.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.updated_count < self.total_requested
    }
}

#[derive(Serialize)]
struct BulkUpdateRequest<'a> {
    asset_ids: &'a [i64],
    updates: &'a AssetUpdate,
}

/// `/assets` endpoints.
#[derive(Debug)]
pub struct AssetsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> AssetsApi<'a, T> {
    pub(crate) const fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Lists one page of assets matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn list(&self, page: PageParams, query: &AssetQuery) -> Result<Page<Asset>, ApiError> {
        let mut params = page.to_params();
        params.extend(query.to_params());
        self.client.get(&build_url("/assets", &params)).await
    }

    /// Fetches one asset.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the asset does not exist in the company.
    pub async fn get(&self, id: i64) -> Result<Asset, ApiError> {
        self.client.get(&format!("/assets/{id}")).await
    }

    /// Creates an asset after validating it locally.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] without a request if the payload is invalid.
    pub async fn create(&self, asset: &NewAsset) -> Result<Asset, ApiError> {
        ensure_valid(asset.validate())?;
        let created: Asset = self.client.post("/assets", asset).await?;
        info!(id = created.id, inventory_number = %created.inventory_number, "asset created");
        Ok(created)
    }

    /// Updates the given fields of an asset.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn update(&self, id: i64, changes: &AssetUpdate) -> Result<Asset, ApiError> {
        self.client.put(&format!("/assets/{id}"), changes).await
    }

    /// Soft-deletes an asset.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn delete(&self, id: i64) -> Result<MessageResponse, ApiError> {
        let response = self.client.delete(&format!("/assets/{id}")).await?;
        info!(id, "asset deleted");
        Ok(response)
    }

    /// Applies the same changes to several assets.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn bulk_update(&self, ids: &[i64], updates: &AssetUpdate) -> Result<BulkUpdateResult, ApiError> {
        let result: BulkUpdateResult = self
            .client
            .post("/assets/bulk-update", &BulkUpdateRequest { asset_ids: ids, updates })
            .await?;
        info!(updated = result.updated_count, requested = result.total_requested, "bulk update finished");
        Ok(result)
    }

    /// Downloads an Excel export of assets matching the filters.
    ///
    /// Search and sort are not applied by the export endpoint.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn export(&self, query: &AssetQuery) -> Result<Download, ApiError> {
        let params: Vec<(&str, String)> = std::iter::once(("format", "excel".to_owned()))
            .chain(
                query
                    .to_params()
                    .into_iter()
                    .filter(|(key, _)| matches!(*key, "category" | "status" | "warehouse_id")),
            )
            .collect();
        self.client.download(&build_url("/export/assets", &params)).await
    }

    /// Searches assets by name, inventory number, or serial number.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn search(&self, term: &str) -> Result<Vec<Asset>, ApiError> {
        let query = AssetQuery { search: Some(term.to_owned()), ..AssetQuery::default() };
        Ok(self.list(PageParams::new(1, SEARCH_PAGE_SIZE), &query).await?.items)
    }

    /// Lists every asset held in one warehouse.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn by_warehouse(&self, warehouse_id: i64) -> Result<Vec<Asset>, ApiError> {
        let query = AssetQuery { warehouse_id: Some(warehouse_id), ..AssetQuery::default() };
        Ok(self.list(PageParams::new(1, WAREHOUSE_PAGE_SIZE), &query).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use am_core::{AssetCategory, AssetStatus, SortOrder};
    use serde_json::json;

    use super::*;
    use crate::services::fixtures;
    use crate::transport::{HttpResponse, Method};

    fn page_body(items: Vec<serde_json::Value>, page: u32, size: u32, total: u64) -> serde_json::Value {
        json!({
            "items": items,
            "total": total,
            "page": page,
            "size": size,
            "pages": total.div_ceil(u64::from(size)),
            "has_next": u64::from(page * size) < total,
            "has_prev": page > 1
        })
    }

    #[tokio::test]
    async fn test_list_sends_page_filters_and_sort() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/assets", 200, page_body(vec![fixtures::asset(1, 2)], 2, 10, 11));

        let query = AssetQuery {
            category: Some(AssetCategory::FixedAssets),
            status: Some(AssetStatus::Active),
            sort_by: Some("cost".into()),
            sort_order: SortOrder::Desc,
            ..AssetQuery::default()
        };
        let page = client.assets().list(PageParams::new(2, 10), &query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_prev);
        assert!(!page.has_next);

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.query(),
            Some("page=2&size=10&category=Fixed%20Assets&status=Active&sort_by=cost&sort_order=desc")
        );
    }

    #[tokio::test]
    async fn test_invalid_asset_rejected_locally() {
        let (client, transport, _) = fixtures::client();
        let bad = NewAsset::new("A", AssetCategory::Goods, 0.0, 1, 1);
        let err = client.assets().create(&bad).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref issues, .. } if issues.len() == 2));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_posts_asset() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Post, "/assets", 200, fixtures::asset(9, 1));
        let asset = NewAsset::new("Ноутбук", AssetCategory::FixedAssets, 85000.0, 1, 1);
        let created = client.assets().create(&asset).await.unwrap();
        assert_eq!(created.id, 9);
        let body = transport.last_request().unwrap().json().unwrap();
        assert_eq!(body["category"], "Fixed Assets");
        assert_eq!(body["warehouse_id"], 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Put, "/assets/4", 200, fixtures::asset(4, 1));
        transport.respond(Method::Delete, "/assets/4", 200, json!({"message": "Asset deleted successfully"}));

        let changes = AssetUpdate { status: Some(AssetStatus::Repair), ..AssetUpdate::default() };
        client.assets().update(4, &changes).await.unwrap();
        assert_eq!(transport.last_request().unwrap().json(), Some(json!({"status": "Repair"})));

        let deleted = client.assets().delete(4).await.unwrap();
        assert_eq!(deleted.message, "Asset deleted successfully");
    }

    #[tokio::test]
    async fn test_bulk_update_body_and_result() {
        let (client, transport, _) = fixtures::client();
        transport.respond(
            Method::Post,
            "/assets/bulk-update",
            200,
            json!({"message": "Updated 2 assets successfully", "updated_count": 2, "total_requested": 3}),
        );
        let updates = AssetUpdate { warehouse_id: Some(5), ..AssetUpdate::default() };
        let result = client.assets().bulk_update(&[1, 2, 3], &updates).await.unwrap();
        assert!(result.is_partial());
        assert_eq!(
            transport.last_request().unwrap().json(),
            Some(json!({"asset_ids": [1, 2, 3], "updates": {"warehouse_id": 5}}))
        );
    }

    #[tokio::test]
    async fn test_export_keeps_supported_filters() {
        let (client, transport, _) = fixtures::client();
        transport.respond_raw(
            Method::Get,
            "/export/assets",
            HttpResponse { status: 200, headers: Vec::new(), body: vec![1] },
        );
        let query = AssetQuery {
            search: Some("стол".into()),
            warehouse_id: Some(2),
            ..AssetQuery::default()
        };
        let file = client.assets().export(&query).await.unwrap();
        assert_eq!(file.filename, "download");
        assert_eq!(transport.last_request().unwrap().query(), Some("format=excel&warehouse_id=2"));
    }

    #[tokio::test]
    async fn test_search_and_by_warehouse_page_sizes() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/assets", 200, page_body(vec![fixtures::asset(1, 3)], 1, 50, 1));

        let found = client.assets().search("ноут").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(transport.last_request().unwrap().query().is_some_and(|q| q.contains("size=50")));

        client.assets().by_warehouse(3).await.unwrap();
        let query = transport.last_request().unwrap().query().map(str::to_owned).unwrap();
        assert!(query.contains("size=1000"));
        assert!(query.contains("warehouse_id=3"));
    }
}
