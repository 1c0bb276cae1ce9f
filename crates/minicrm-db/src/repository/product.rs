//! # Product Repository
//!
//! Database operations for products, including the stock reservation used
//! by order creation.
//!
//! ## Stock Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              reserve(conn, product_id, quantity)                        │
//! │                                                                         │
//! │  Caller holds a BEGIN IMMEDIATE transaction, so SQLite's writer lock   │
//! │  already serializes this read-compare-decrement against every other    │
//! │  reservation.                                                           │
//! │                                                                         │
//! │  SELECT product (active only) ──── missing ──▶ ProductNotFound         │
//! │       │                                                                 │
//! │       ├── track_stock = 0 ──▶ Reservation (stock untouched)            │
//! │       ▼                                                                 │
//! │  available < requested? ──── yes ──▶ InsufficientStock                 │
//! │       │                              {productId, requested, available} │
//! │       ▼                                                                 │
//! │  UPDATE products                                                        │
//! │  SET stock_quantity = stock_quantity - ?q                               │
//! │  WHERE id = ?id AND stock_quantity >= ?q   ← second, store-enforced    │
//! │       │                                       guard: stock can never   │
//! │       ▼                                       go negative              │
//! │  Reservation { product }  (price snapshot for the order line)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use minicrm_core::payload::{NewProduct, ProductPatch};
use minicrm_core::validation::{validate_new_product, normalize_optional_text};
use minicrm_core::{Money, Product, ValidationError, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

const PRODUCT_COLUMNS: &str = "id, name, sku, description, price, track_stock, \
     stock_quantity, is_active, created_at, updated_at";

/// A successful stock reservation.
///
/// Carries the product row as read inside the reserving transaction; its
/// `price` is the snapshot the order line must record.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub product: Product,
}

impl Reservation {
    /// The captured unit price.
    pub fn unit_price(&self) -> Money {
        self.product.price
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// Stock defaulting: tracked products with no quantity start at 0;
    /// untracked products store NULL. A duplicate SKU is a CONFLICT.
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        let valid = validate_new_product(input)?;
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO products \
             (name, sku, description, price, track_stock, stock_quantity, is_active, \
              created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&valid.name)
            .bind(&valid.sku)
            .bind(&valid.description)
            .bind(valid.price)
            .bind(valid.track_stock)
            .bind(valid.stock_quantity)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sku_conflict(err.into(), &valid.sku))?;

        debug!(product_id = product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Fetches a product regardless of active flag.
    pub async fn get(&self, product_id: i64) -> DbResult<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::ProductNotFound { product_id })
    }

    /// Lists products, newest first. Active only unless `include_inactive`.
    pub async fn list(
        &self,
        include_inactive: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> DbResult<Vec<Product>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE (?1 OR is_active = 1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?2 OFFSET ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(include_inactive)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Applies a partial update. Fields set to `None` stay unchanged.
    ///
    /// The trackStock/stockQuantity coupling is re-resolved after the
    /// patch: turning tracking off nulls the quantity, turning it on with
    /// no quantity defaults to 0. A SKU change that collides with another
    /// product is a CONFLICT, same as on create.
    pub async fn update(&self, product_id: i64, patch: &ProductPatch) -> DbResult<Product> {
        let existing = self.get(product_id).await?;

        let name = match &patch.name {
            Some(name) => normalize_optional_text(Some(name.as_str())).ok_or_else(|| {
                ValidationError::Empty {
                    field: "name".to_string(),
                }
            })?,
            None => existing.name,
        };
        let sku = match &patch.sku {
            Some(sku) => normalize_optional_text(Some(sku.as_str())).ok_or_else(|| {
                ValidationError::Empty {
                    field: "sku".to_string(),
                }
            })?,
            None => existing.sku,
        };
        let price = patch.price.unwrap_or(existing.price);
        if price.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "price".to_string(),
            }
            .into());
        }
        let track_stock = patch.track_stock.unwrap_or(existing.track_stock);
        let stock_quantity = if track_stock {
            let quantity = patch
                .stock_quantity
                .or(existing.stock_quantity)
                .unwrap_or(0);
            if quantity < 0 {
                return Err(ValidationError::MustBePositive {
                    field: "stockQuantity".to_string(),
                }
                .into());
            }
            Some(quantity)
        } else {
            None
        };
        let description = patch.description.clone().or(existing.description);
        let is_active = patch.is_active.unwrap_or(existing.is_active);

        let sql = format!(
            "UPDATE products \
             SET name = ?1, sku = ?2, description = ?3, price = ?4, track_stock = ?5, \
                 stock_quantity = ?6, is_active = ?7, updated_at = ?8 \
             WHERE id = ?9 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&name)
            .bind(&sku)
            .bind(&description)
            .bind(price)
            .bind(track_stock)
            .bind(stock_quantity)
            .bind(is_active)
            .bind(Utc::now())
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sku_conflict(err.into(), &sku))?;

        debug!(product_id, "Product updated");
        Ok(product)
    }

    /// Deactivates a product. Idempotent. Historical order lines keep
    /// referencing it.
    pub async fn deactivate(&self, product_id: i64) -> DbResult<Product> {
        let sql = format!(
            "UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(Utc::now())
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::ProductNotFound { product_id })?;

        debug!(product_id, "Product deactivated");
        Ok(product)
    }

    /// Reserves stock outside an order, in its own immediate transaction.
    pub async fn reserve(&self, product_id: i64, quantity: i64) -> DbResult<Reservation> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;
        let reservation = reserve(&mut tx, product_id, quantity).await?;
        tx.commit().await?;
        Ok(reservation)
    }
}

/// Reserves `quantity` units of a product on the caller's transaction
/// connection.
///
/// The caller must hold a write transaction (`BEGIN IMMEDIATE`); this
/// function performs the read-compare-decrement without further locking.
pub(crate) async fn reserve(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
) -> DbResult<Reservation> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::ProductNotFound { product_id })?;

    if !product.track_stock {
        debug!(product_id, quantity, "Reserved untracked product");
        return Ok(Reservation { product });
    }

    let available = product.available();
    if available < quantity {
        return Err(DbError::InsufficientStock {
            product_id,
            requested: quantity,
            available,
        });
    }

    // Guarded decrement: the WHERE clause re-checks the quantity so stock
    // cannot go negative even if the surrounding transaction mode is wrong.
    let result = sqlx::query(
        "UPDATE products \
         SET stock_quantity = stock_quantity - ?1, updated_at = ?2 \
         WHERE id = ?3 AND stock_quantity >= ?1",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InsufficientStock {
            product_id,
            requested: quantity,
            available,
        });
    }

    debug!(product_id, quantity, available, "Stock reserved");
    Ok(Reservation { product })
}

fn map_sku_conflict(err: DbError, sku: &str) -> DbError {
    match err {
        DbError::UniqueViolation { constraint } if constraint.contains("products.sku") => {
            DbError::DuplicateSku {
                sku: sku.to_string(),
            }
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use minicrm_core::ErrorKind;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn keyboard(sku: &str, stock: i64) -> NewProduct {
        NewProduct {
            name: Some("Keyboard".to_string()),
            sku: Some(sku.to_string()),
            price: Some(Money::from_cents(19990)),
            stock_quantity: Some(stock),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let product = db.products().create(&keyboard("KB-001", 5)).await.unwrap();

        assert!(product.id > 0);
        assert!(product.track_stock);
        assert_eq!(product.stock_quantity, Some(5));
        assert_eq!(product.price, Money::from_cents(19990));

        let fetched = db.products().get(product.id).await.unwrap();
        assert_eq!(fetched.sku, "KB-001");
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_conflict() {
        let db = test_db().await;
        db.products().create(&keyboard("KB-001", 5)).await.unwrap();
        let err = db
            .products()
            .create(&keyboard("KB-001", 3))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err, DbError::DuplicateSku { ref sku } if sku == "KB-001"));
    }

    #[tokio::test]
    async fn test_untracked_product_has_no_quantity() {
        let db = test_db().await;
        let product = db
            .products()
            .create(&NewProduct {
                name: Some("Consulting".to_string()),
                sku: Some("SV-001".to_string()),
                price: Some(Money::from_cents(50000)),
                track_stock: Some(false),
                stock_quantity: Some(99),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!product.track_stock);
        assert_eq!(product.stock_quantity, None);
    }

    #[tokio::test]
    async fn test_patch_stock_coupling() {
        let db = test_db().await;
        let product = db.products().create(&keyboard("KB-001", 5)).await.unwrap();

        // turn tracking off: quantity nulled
        let untracked = db
            .products()
            .update(
                product.id,
                &ProductPatch {
                    track_stock: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(untracked.stock_quantity, None);

        // turn tracking back on with no quantity: defaults to 0
        let retracked = db
            .products()
            .update(
                product.id,
                &ProductPatch {
                    track_stock: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retracked.stock_quantity, Some(0));
    }

    #[tokio::test]
    async fn test_patch_can_change_sku() {
        let db = test_db().await;
        let product = db.products().create(&keyboard("KB-001", 5)).await.unwrap();

        let renamed = db
            .products()
            .update(
                product.id,
                &ProductPatch {
                    sku: Some("  KB-002  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.sku, "KB-002");
        assert_eq!(renamed.name, "Keyboard");
    }

    #[tokio::test]
    async fn test_patch_to_taken_sku_is_conflict() {
        let db = test_db().await;
        db.products().create(&keyboard("KB-001", 5)).await.unwrap();
        let other = db.products().create(&keyboard("KB-002", 5)).await.unwrap();

        let err = db
            .products()
            .update(
                other.id,
                &ProductPatch {
                    sku: Some("KB-001".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err, DbError::DuplicateSku { ref sku } if sku == "KB-001"));

        // unchanged on failure
        let after = db.products().get(other.id).await.unwrap();
        assert_eq!(after.sku, "KB-002");
    }

    #[tokio::test]
    async fn test_patch_rejects_blank_sku() {
        let db = test_db().await;
        let product = db.products().create(&keyboard("KB-001", 5)).await.unwrap();

        let err = db
            .products()
            .update(
                product.id,
                &ProductPatch {
                    sku: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let db = test_db().await;
        let product = db.products().create(&keyboard("KB-001", 3)).await.unwrap();

        let reservation = db.products().reserve(product.id, 2).await.unwrap();
        assert_eq!(reservation.unit_price(), Money::from_cents(19990));

        let after = db.products().get(product.id).await.unwrap();
        assert_eq!(after.stock_quantity, Some(1));
    }

    #[tokio::test]
    async fn test_reserve_shortfall_reports_requested_and_available() {
        let db = test_db().await;
        let product = db.products().create(&keyboard("KB-001", 1)).await.unwrap();

        let err = db.products().reserve(product.id, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.details().unwrap(),
            serde_json::json!({ "productId": product.id, "requested": 2, "available": 1 })
        );

        // no mutation on failure
        let after = db.products().get(product.id).await.unwrap();
        assert_eq!(after.stock_quantity, Some(1));
    }

    #[tokio::test]
    async fn test_reserve_untracked_never_fails_on_stock() {
        let db = test_db().await;
        let product = db
            .products()
            .create(&NewProduct {
                name: Some("Download".to_string()),
                sku: Some("DL-001".to_string()),
                price: Some(Money::from_cents(999)),
                track_stock: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        db.products().reserve(product.id, 1000).await.unwrap();
        let after = db.products().get(product.id).await.unwrap();
        assert_eq!(after.stock_quantity, None);
    }

    #[tokio::test]
    async fn test_reserve_missing_or_inactive_product() {
        let db = test_db().await;
        let err = db.products().reserve(999, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let product = db.products().create(&keyboard("KB-001", 5)).await.unwrap();
        db.products().deactivate(product.id).await.unwrap();
        let err = db.products().reserve(product.id, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
