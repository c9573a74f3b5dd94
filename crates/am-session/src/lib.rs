//! Session layer of the asset manager client.
//!
//! - [`Session`]: the authentication lifecycle, driven by a pure reducer
//!   over [`AuthState`] and persisted through [`am_storage`]
//! - [`access`]: role-based navigation and route guards
//! - [`query`]: cancellable request handles with last-write-wins semantics
//! - [`table`]: client-side search, sort, paging, and selection
//!
//! # Error Handling
//!
//! Session calls that report success to the user return [`AuthOutcome`];
//! the rest return [`SessionError`]. Query handles return the client's
//! [`am_client::ApiError`] after recording it in their state.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod access;
pub mod auth;
pub mod error;
pub mod query;
pub mod table;

pub use access::{Access, RoleSet, RouteGuard, Section, navigation_for};
pub use auth::{AuthAction, AuthOutcome, AuthState, AuthStatus, Session, StoredCredentials, TokenClaims, UserDisplay};
pub use error::SessionError;
pub use query::{
    DebouncedQuery, InfiniteQuery, OptimisticQuery, PageRequest, PaginatedQuery, Query, QueryError, QueryOptions,
    QueryState,
};
pub use table::{Cell, Selection, SortKey, TableRow, TableState};
