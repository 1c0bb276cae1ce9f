//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Key Operations
//! - CRUD with soft deletion (`is_active` flag)
//! - Dedup lookups by normalized email / phone (used by the importer)
//! - Merge-patch application for import rows matching an existing customer
//!
//! ## Soft Deletion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  deactivate(id)                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE customers SET is_active = 0  ← row stays, orders keep their    │
//! │       │                                 customer reference              │
//! │       ▼                                                                 │
//! │  get_active(id)      → CustomerNotFound                                │
//! │  get(id)             → still returns the row (order detail reads)      │
//! │  orders().create(..) → CustomerNotFound (inactive can't order)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use minicrm_core::payload::{CustomerPatch, NewCustomer};
use minicrm_core::validation::{validate_customer_patch, validate_new_customer, ValidCustomer};
use minicrm_core::{Customer, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, address, \
     is_active, created_at, updated_at";

/// Repository for customer database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = CustomerRepository::new(pool);
/// let customer = repo.create(&payload).await?;
/// let found = repo.find_by_email("ali@example.com").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Registers a customer from a raw payload.
    ///
    /// Validation normalizes names and contact fields; empty strings become
    /// NULL. `firstName` is the only required field.
    pub async fn create(&self, input: &NewCustomer) -> DbResult<Customer> {
        let valid = validate_new_customer(input)?;
        self.insert(&valid).await
    }

    /// Inserts an already-normalized customer (import path).
    pub async fn insert(&self, valid: &ValidCustomer) -> DbResult<Customer> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO customers \
             (first_name, last_name, email, phone, address, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6) \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(&valid.first_name)
            .bind(&valid.last_name)
            .bind(&valid.email)
            .bind(&valid.phone)
            .bind(&valid.address)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        debug!(customer_id = customer.id, "Customer created");
        Ok(customer)
    }

    /// Fetches a customer regardless of active flag.
    ///
    /// Used where historical references must resolve (order details).
    pub async fn get(&self, customer_id: i64) -> DbResult<Customer> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        sqlx::query_as::<_, Customer>(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::CustomerNotFound { customer_id })
    }

    /// Fetches an active customer.
    pub async fn get_active(&self, customer_id: i64) -> DbResult<Customer> {
        let sql =
            format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND is_active = 1");
        sqlx::query_as::<_, Customer>(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::CustomerNotFound { customer_id })
    }

    /// Lists customers, newest first. Active only unless `include_inactive`.
    pub async fn list(
        &self,
        include_inactive: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> DbResult<Vec<Customer>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE (?1 OR is_active = 1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?2 OFFSET ?3"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(include_inactive)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Applies a partial update. Fields set to `None` stay unchanged.
    pub async fn update(&self, customer_id: i64, patch: &CustomerPatch) -> DbResult<Customer> {
        let patch = validate_customer_patch(patch)?;
        let existing = self.get(customer_id).await?;

        // Read-modify-write: resolve the patch in Rust, write all mutable
        // columns at once. Customer rows are not contended.
        let first_name = patch.first_name.unwrap_or(existing.first_name);
        let last_name = patch.last_name.or(existing.last_name);
        let email = patch.email.or(existing.email);
        let phone = patch.phone.or(existing.phone);
        let address = patch.address.or(existing.address);
        let is_active = patch.is_active.unwrap_or(existing.is_active);

        let sql = format!(
            "UPDATE customers \
             SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, \
                 address = ?5, is_active = ?6, updated_at = ?7 \
             WHERE id = ?8 \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(&first_name)
            .bind(&last_name)
            .bind(&email)
            .bind(&phone)
            .bind(&address)
            .bind(is_active)
            .bind(Utc::now())
            .bind(customer_id)
            .fetch_one(&self.pool)
            .await?;

        debug!(customer_id, "Customer updated");
        Ok(customer)
    }

    /// Deactivates a customer. Idempotent: deactivating twice is a no-op.
    pub async fn deactivate(&self, customer_id: i64) -> DbResult<Customer> {
        let sql = format!(
            "UPDATE customers SET is_active = 0, updated_at = ?1 WHERE id = ?2 \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(Utc::now())
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::CustomerNotFound { customer_id })?;

        debug!(customer_id, "Customer deactivated");
        Ok(customer)
    }

    /// Looks up a customer by normalized (lowercase) email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?1 LIMIT 1");
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Looks up a customer by normalized (E.164) phone.
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1 LIMIT 1");
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?)
    }
}

// Used by order_detail reads which run inside an open transaction.
pub(crate) async fn fetch_any(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> DbResult<Customer> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
    sqlx::query_as::<_, Customer>(&sql)
        .bind(customer_id)
        .fetch_optional(conn)
        .await?
        .ok_or(DbError::CustomerNotFound { customer_id })
}

/// Fetches an active customer on the caller's connection (order creation
/// runs this inside its transaction).
pub(crate) async fn fetch_active(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> DbResult<Customer> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND is_active = 1");
    sqlx::query_as::<_, Customer>(&sql)
        .bind(customer_id)
        .fetch_optional(conn)
        .await?
        .ok_or(DbError::CustomerNotFound { customer_id })
}

// =============================================================================
// Unit Tests
// =============================================================================
