//! # minicrm-db: Database Layer for MiniCRM
//!
//! This crate provides storage for the MiniCRM system: SQLite via sqlx,
//! repositories over customers/products/orders, the transactional order
//! workflow, and the customer import engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MiniCRM Data Flow                                │
//! │                                                                         │
//! │  Caller (HTTP layer, import_customers binary, tests)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    minicrm-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ customer.rs   │    │  (embedded)  │  │   │
//! │  │   │               │    │ product.rs    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ order.rs      │    │ 001_init.sql │  │   │
//! │  │   │ WAL + busy    │    │               │    │              │  │   │
//! │  │   │ timeout       │    │ import.rs     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - The typed error surface (`DbError`)
//! - [`repository`] - Repository implementations
//! - [`import`] - The customer import engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use minicrm_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/minicrm.db")).await?;
//! let detail = db.orders().create(&order_input).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod import;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use import::{ImportOptions, ImportReport, Importer};
pub use repository::customer::CustomerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
