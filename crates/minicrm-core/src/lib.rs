//! # minicrm-core: Pure Business Logic for MiniCRM
//!
//! This crate is the **heart** of MiniCRM. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MiniCRM Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (HTTP layer, import binary)                │   │
//! │  │    create_order, update_status, CRUD, import_customers          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ minicrm-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ │   │
//! │  │  │  types  │ │  money  │ │ payload │ │validation│ │ import  │ │   │
//! │  │  │Customer │ │  Money  │ │ inputs  │ │  rules   │ │ CSV ETL │ │   │
//! │  │  │ Product │ │ (cents) │ │ patches │ │  checks  │ │ helpers │ │   │
//! │  │  │  Order  │ └─────────┘ └─────────┘ └──────────┘ └─────────┘ │   │
//! │  │  └─────────┘                                                    │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   minicrm-db (Storage Layer)                    │   │
//! │  │        SQLite queries, migrations, repositories, workflow       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Product, Order, OrderIdentity)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Validation errors and the error-kind taxonomy
//! - [`payload`] - Caller-facing request payloads
//! - [`validation`] - Input validation and normalization
//! - [`import`] - Pure helpers for the offline customer import
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use minicrm_core::money::Money;
//!
//! // Create money from cents (never from floats!)
//! let price = Money::from_cents(5000); // 50.00
//!
//! // Line totals are exact integer arithmetic
//! let line_total = price.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line_total.to_string(), "100.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod import;
pub mod money;
pub mod payload;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use minicrm_core::Money` instead of
// `use minicrm_core::money::Money`

pub use error::{ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default page size for listing endpoints
///
/// ## Business Reason
/// Keeps unfiltered listings bounded; callers page explicitly past this.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Hard ceiling on caller-supplied page sizes
pub const MAX_LIST_LIMIT: i64 = 500;
