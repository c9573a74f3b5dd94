//! Typed facades over the REST endpoints.
//!
//! Each facade borrows the client:
//!
//! ```
//! use am_client::ApiClient;
//! use am_client::testing::ScriptedTransport;
//! use am_core::ApiConfig;
//!
//! let client = ApiClient::with_transport(ScriptedTransport::new(), ApiConfig::default());
//! let _assets = client.assets();
//! let _reports = client.reports();
//! ```

mod assets;
mod auth;
mod directory;
mod operations;
mod reports;

pub use assets::{AssetsApi, BulkUpdateResult, MessageResponse};
pub use auth::AuthApi;
pub use directory::DirectoryApi;
pub use operations::OperationsApi;
pub use reports::ReportsApi;

use am_core::ValidationReport;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::Transport;

impl<T: Transport> ApiClient<T> {
    /// Authentication endpoints.
    #[must_use]
    pub const fn auth(&self) -> AuthApi<'_, T> {
        AuthApi::new(self)
    }

    /// Asset endpoints.
    #[must_use]
    pub const fn assets(&self) -> AssetsApi<'_, T> {
        AssetsApi::new(self)
    }

    /// Operation endpoints.
    #[must_use]
    pub const fn operations(&self) -> OperationsApi<'_, T> {
        OperationsApi::new(self)
    }

    /// Warehouse, branch, and user endpoints.
    #[must_use]
    pub const fn directory(&self) -> DirectoryApi<'_, T> {
        DirectoryApi::new(self)
    }

    /// Dashboard and report endpoints.
    #[must_use]
    pub const fn reports(&self) -> ReportsApi<'_, T> {
        ReportsApi::new(self)
    }
}

/// Rejects a payload that failed client-side validation before any request.
fn ensure_valid(report: ValidationReport) -> Result<(), ApiError> {
    if report.is_valid() {
        Ok(())
    } else {
        tracing::debug!(errors = %report, "rejected invalid payload");
        Err(report.into())
    }
}
