//! # Database Error Types
//!
//! The full typed error surface of the storage layer. Every variant maps to
//! one of the four stable kinds callers dispatch on, and carries structured
//! details naming the offending entities.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite error (sqlx::Error)      Pure input failure (ValidationError)  │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  DbError (this module) ← categorized into the 4-kind taxonomy          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  kind() + details() + message  ← a transport layer serializes these    │
//! │                                                                         │
//! │   VALIDATION  → caller sent a bad payload                               │
//! │   NOT_FOUND   → referenced entity missing or inactive                   │
//! │   CONFLICT    → stock shortfall, duplicate SKU                          │
//! │   INTERNAL    → storage-level failure, no caller remedy                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use minicrm_core::error::ErrorKind;
use minicrm_core::payload::ErrorBody;
use minicrm_core::ValidationError;
use thiserror::Error;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Structural payload failure, detected before or during a write.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Customer missing or deactivated.
    #[error("customer not found: {customer_id}")]
    CustomerNotFound { customer_id: i64 },

    /// Product missing or deactivated.
    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: i64 },

    /// Order id does not exist.
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: i64 },

    /// A stock reservation asked for more units than the product has.
    ///
    /// `available` is the committed quantity observed inside the
    /// reserving transaction.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    /// SKU uniqueness violation on product create/update.
    #[error("duplicate SKU: '{sku}' already exists")]
    DuplicateSku { sku: String },

    /// Some other UNIQUE index violation.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Foreign key violation (e.g. order item referencing a vanished row).
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::CustomerNotFound { .. }
            | DbError::ProductNotFound { .. }
            | DbError::OrderNotFound { .. } => ErrorKind::NotFound,
            DbError::InsufficientStock { .. }
            | DbError::DuplicateSku { .. }
            | DbError::UniqueViolation { .. } => ErrorKind::Conflict,
            DbError::ForeignKeyViolation { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Structured detail payload, camelCase-keyed for the wire.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            DbError::Validation(err) => Some(err.details()),
            DbError::CustomerNotFound { customer_id } => {
                Some(serde_json::json!({ "customerId": customer_id }))
            }
            DbError::ProductNotFound { product_id } => {
                Some(serde_json::json!({ "productId": product_id }))
            }
            DbError::OrderNotFound { order_id } => {
                Some(serde_json::json!({ "orderId": order_id }))
            }
            DbError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Some(serde_json::json!({
                "productId": product_id,
                "requested": requested,
                "available": available,
            })),
            DbError::DuplicateSku { sku } => Some(serde_json::json!({ "sku": sku })),
            _ => None,
        }
    }

    /// Serializable wire representation of this error.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.kind().as_str().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database(UNIQUE..)  → DbError::UniqueViolation
/// sqlx::Error::Database(FK..)      → DbError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut        → DbError::PoolExhausted
/// Other                            → DbError::QueryFailed / Internal
/// ```
/// Repositories refine these further where they know the entity involved
/// (e.g. a `products.sku` unique failure becomes `DuplicateSku`).
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let constraint = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { constraint }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
