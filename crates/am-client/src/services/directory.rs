use am_core::{Branch, NewBranch, NewUser, NewWarehouse, User, UserUpdate, Warehouse};
use tracing::info;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::Transport;

/// Warehouse, branch, and user endpoints.
///
/// Warehouse and branch lists change rarely and are read through the
/// response cache; creating one invalidates its list.
#[derive(Debug)]
pub struct DirectoryApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> DirectoryApi<'a, T> {
    pub(crate) const fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Lists warehouses visible to the company.
    ///
    /// # Errors
    ///
    /// Returns the request error when nothing is cached.
    pub async fn warehouses(&self) -> Result<Vec<Warehouse>, ApiError> {
        self.client.cached_get("/warehouses").await
    }

    /// Creates a warehouse in a branch.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn create_warehouse(&self, warehouse: &NewWarehouse) -> Result<Warehouse, ApiError> {
        let created: Warehouse = self.client.post("/warehouses", warehouse).await?;
        self.client.clear_cache(Some("/warehouses"));
        info!(id = created.id, name = %created.name, "warehouse created");
        Ok(created)
    }

    /// Lists branches of the company.
    ///
    /// # Errors
    ///
    /// Returns the request error when nothing is cached.
    pub async fn branches(&self) -> Result<Vec<Branch>, ApiError> {
        self.client.cached_get("/branches").await
    }

    /// Creates a branch.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn create_branch(&self, branch: &NewBranch) -> Result<Branch, ApiError> {
        let created: Branch = self.client.post("/branches", branch).await?;
        self.client.clear_cache(Some("/branches"));
        info!(id = created.id, name = %created.name, "branch created");
        Ok(created)
    }

    /// Lists users of the company.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.client.get("/users").await
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns the request error, e.g. a 400 for a taken e-mail.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let created: User = self.client.post("/users", user).await?;
        info!(id = created.id, role = created.role.as_str(), "user created");
        Ok(created)
    }

    /// Updates a user.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn update_user(&self, id: i64, changes: &UserUpdate) -> Result<User, ApiError> {
        self.client.put(&format!("/users/{id}"), changes).await
    }
}

#[cfg(test)]
mod tests {
    use am_core::Role;
    use serde_json::json;

    use super::*;
    use crate::services::fixtures;
    use crate::transport::Method;

    #[tokio::test]
    async fn test_warehouse_list_cached_until_create() {
        let (client, transport, _) = fixtures::client();
        transport.respond(
            Method::Get,
            "/warehouses",
            200,
            json!([{"id": 1, "name": "Центральный", "branch_id": 1, "is_active": true}]),
        );
        transport.respond(Method::Post, "/warehouses", 200, json!({"id": 2, "name": "Северный", "branch_id": 1}));

        assert_eq!(client.directory().warehouses().await.unwrap().len(), 1);
        client.directory().warehouses().await.unwrap();
        assert_eq!(transport.count(Method::Get, "/warehouses"), 1);

        let new = NewWarehouse { name: "Северный".into(), address: None, branch_id: 1 };
        client.directory().create_warehouse(&new).await.unwrap();
        client.directory().warehouses().await.unwrap();
        assert_eq!(transport.count(Method::Get, "/warehouses"), 2);
    }

    #[tokio::test]
    async fn test_branches() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/branches", 200, json!([{"id": 1, "name": "Москва"}]));
        transport.respond(Method::Post, "/branches", 200, json!({"id": 2, "name": "Казань"}));
        assert_eq!(client.directory().branches().await.unwrap()[0].name, "Москва");
        let created = client
            .directory()
            .create_branch(&NewBranch { name: "Казань".into(), address: None })
            .await
            .unwrap();
        assert_eq!(created.id, 2);
    }

    #[tokio::test]
    async fn test_user_management() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/users", 200, json!([fixtures::user("Admin")]));
        transport.respond(Method::Post, "/users", 200, fixtures::user("Observer"));
        transport.respond(Method::Put, "/users/1", 200, fixtures::user("Accountant"));

        assert_eq!(client.directory().users().await.unwrap().len(), 1);

        let new = NewUser {
            email: "viewer@result-education.ru".into(),
            username: "viewer".into(),
            role: Role::Observer,
            password: "secret1".into(),
        };
        let created = client.directory().create_user(&new).await.unwrap();
        assert_eq!(created.role, Role::Observer);

        let changes = UserUpdate { role: Some(Role::Accountant), ..UserUpdate::default() };
        let updated = client.directory().update_user(1, &changes).await.unwrap();
        assert_eq!(updated.role, Role::Accountant);
        assert_eq!(transport.last_request().unwrap().json(), Some(json!({"role": "Accountant"})));
    }
}
