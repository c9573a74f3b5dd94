//! HTTP client for the asset manager backend.
//!
//! This crate provides:
//!
//! - [`ApiClient`]: bearer authentication, error classification, notices,
//!   slow-request logging, and a response cache
//! - [`Transport`]: the seam between the client and the network, with a
//!   `reqwest` implementation ([`HttpTransport`]) and an in-memory one
//!   ([`testing::ScriptedTransport`])
//! - Helpers: [`retry()`] with exponential backoff, chunked [`batch()`] requests,
//!   [`build_url`], and file [`Download`]s
//! - Typed facades per resource: [`AuthApi`], [`AssetsApi`],
//!   [`OperationsApi`], [`DirectoryApi`], [`ReportsApi`]
//!
//! # Error Handling
//!
//! Every call returns [`ApiError`]. A 401 on an authenticated request clears
//! the [`TokenSource`] and broadcasts [`ClientEvent::SessionExpired`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod batch;
pub mod cache;
pub mod client;
pub mod download;
pub mod error;
pub mod notify;
pub mod retry;
pub mod services;
pub mod testing;
pub mod token;
pub mod transport;
pub mod url;

pub use batch::{DEFAULT_BATCH_SIZE, batch};
pub use cache::TtlCache;
pub use client::{ApiClient, HealthStatus, RequestOptions};
pub use download::Download;
pub use error::{ApiError, FieldIssue};
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use retry::{RetryPolicy, retry};
pub use services::{
    AssetsApi, AuthApi, BulkUpdateResult, DirectoryApi, MessageResponse, OperationsApi, ReportsApi,
};
pub use token::{ClientEvent, MemoryToken, TokenSource};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MultipartForm, RequestBody, Transport, TransportError,
};
pub use url::build_url;
