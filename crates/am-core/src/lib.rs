//! Core types, permissions, and utilities for the asset manager.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Domain records (`Asset`, `Operation`, `Warehouse`, `Branch`, `User`)
//! - The static role → permission table ([`Role`], [`Permission`])
//! - Configuration structures ([`Config`] and its sections)
//! - Display formatters ([`format`]) and form validators ([`validate`])
//!
//! # Crate Dependencies
//!
//! ```text
//! am-cli ──► am-session ──► am-client ──► am-core
//!                       └─► am-storage ──►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod format;
pub mod types;
pub mod validate;

pub use config::{ApiConfig, CacheConfig, Config, PaginationConfig, StorageConfig};
pub use error::ConfigError;
pub use types::{
    Asset, AssetCategory, AssetQuery, AssetReport, AssetStatus, AssetUpdate, AuthToken, Branch,
    CategoryStats, Company, CompanyRegistration, Credentials, Dashboard, DashboardStats,
    DateRangePreset, MonthlyOperationStats, NewAsset, NewBranch, NewOperation, NewUser,
    NewWarehouse, Operation, OperationQuery, OperationReport, OperationType, Page, PageInfo,
    PageParams, Permission, ReportFilter, Role, SortOrder, SummaryStats, User, UserPatch,
    UserUpdate, Warehouse,
};
pub use validate::ValidationReport;
