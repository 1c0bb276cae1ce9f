//! # Order Repository
//!
//! The order-creation workflow, status transitions, and order reads.
//!
//! ## Creation Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     create(&CreateOrderInput)                           │
//! │                                                                         │
//! │  1. Pure validation (minicrm-core)     ← no connection touched yet     │
//! │       │  items non-empty, ids/quantities positive,                     │
//! │       │  identity resolved (customerId XOR guest)                      │
//! │       ▼                                                                 │
//! │  2. BEGIN IMMEDIATE                    ← takes SQLite's writer lock;   │
//! │       │                                  competing creations queue on  │
//! │       │                                  busy_timeout                  │
//! │       ▼                                                                 │
//! │  3. Registered? load active customer, resolve shipping address         │
//! │       │         (payload wins, profile address is the fallback)        │
//! │       ▼                                                                 │
//! │  4. INSERT order header (status pending, total 0)                      │
//! │       ▼                                                                 │
//! │  5. For each line, in input order:                                     │
//! │       reserve stock ── fail ──▶ ROLLBACK: no order row, every          │
//! │       │                         earlier decrement undone               │
//! │       INSERT item (price snapshot, exact line_total)                   │
//! │       ▼                                                                 │
//! │  6. UPDATE total, read detail back on the same connection, COMMIT      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Retried calls create new orders; there is no idempotency key.

use chrono::{DateTime, Utc};
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{customer, product};
use minicrm_core::payload::{CreateOrderInput, OrderFilter, OrderRequest, OrderRequestIdentity};
use minicrm_core::validation::validate_order_input;
use minicrm_core::{
    Money, Order, OrderDetail, OrderIdentity, OrderItem, OrderLineDetail, OrderStatus, Product,
    ValidationError, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};

const ORDER_COLUMNS: &str = "id, customer_id, guest_first_name, guest_last_name, guest_email, \
     guest_phone, shipping_address, status, total_amount, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price, line_total, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, name, sku, description, price, track_stock, \
     stock_quantity, is_active, created_at, updated_at";

/// Raw orders row; identity lives in nullable sibling columns and is folded
/// into the `OrderIdentity` sum type on read.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: Option<i64>,
    guest_first_name: Option<String>,
    guest_last_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    shipping_address: String,
    status: OrderStatus,
    total_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> DbResult<Order> {
        let identity = match (self.customer_id, self.guest_first_name) {
            (Some(customer_id), None) => OrderIdentity::Registered { customer_id },
            (None, Some(first_name)) => OrderIdentity::Guest {
                guest: minicrm_core::GuestContact {
                    first_name,
                    last_name: self.guest_last_name,
                    email: self.guest_email,
                    phone: self.guest_phone,
                },
            },
            // unreachable while the table CHECK holds
            _ => {
                return Err(DbError::Internal(format!(
                    "order {} violates the identity constraint",
                    self.id
                )))
            }
        };
        Ok(Order {
            id: self.id,
            identity,
            shipping_address: self.shipping_address,
            status: self.status,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order atomically: identity resolution, per-line stock
    /// reservation with price snapshots, and total computation all commit
    /// together or not at all.
    pub async fn create(&self, input: &CreateOrderInput) -> DbResult<OrderDetail> {
        let request = validate_order_input(input)?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let detail = match create_in_tx(&mut tx, &request).await {
            Ok(detail) => detail,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Order rollback failed");
                }
                return Err(err);
            }
        };
        tx.commit().await?;

        info!(
            order_id = detail.order.id,
            lines = detail.items.len(),
            total = %detail.order.total_amount,
            guest = detail.order.identity.is_guest(),
            "Order created"
        );
        Ok(detail)
    }

    /// Changes an order's status.
    ///
    /// Any status may move to any other; the only gates are that `status`
    /// parses to one of the five values and the order exists.
    pub async fn update_status(&self, order_id: i64, status: &str) -> DbResult<OrderDetail> {
        let status = OrderStatus::parse(status)?;

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(Utc::now())
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::OrderNotFound { order_id });
        }

        info!(order_id, status = %status, "Order status updated");
        fetch_detail(&mut conn, order_id).await
    }

    /// Fetches an order with its items, product references, and (for
    /// registered orders) the customer record.
    pub async fn get_detail(&self, order_id: i64) -> DbResult<OrderDetail> {
        let mut conn = self.pool.acquire().await?;
        fetch_detail(&mut conn, order_id).await
    }

    /// Lists order headers, newest first, with optional status and
    /// customer filters.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE (?1 IS NULL OR status = ?1) \
               AND (?2 IS NULL OR customer_id = ?2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.status)
            .bind(filter.customer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }
}

/// The transactional body of order creation. The caller owns the
/// transaction and rolls back on any Err.
async fn create_in_tx(conn: &mut SqliteConnection, request: &OrderRequest) -> DbResult<OrderDetail> {
    let now = Utc::now();

    // Identity and shipping resolution. The customer read happens inside
    // the transaction so a concurrent deactivation can't slip in between.
    let (customer_id, guest, shipping_address) = match &request.identity {
        OrderRequestIdentity::Registered { customer_id } => {
            let customer = customer::fetch_active(conn, *customer_id).await?;
            let shipping = request
                .shipping_address
                .clone()
                .or_else(|| {
                    customer
                        .address
                        .as_deref()
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                })
                .ok_or_else(|| ValidationError::Required {
                    field: "shippingAddress".to_string(),
                })?;
            (Some(*customer_id), None, shipping)
        }
        OrderRequestIdentity::Guest { guest } => {
            let shipping = request
                .shipping_address
                .clone()
                .ok_or_else(|| ValidationError::Required {
                    field: "shippingAddress".to_string(),
                })?;
            (None, Some(guest.clone()), shipping)
        }
    };

    let order_id: i64 = sqlx::query_scalar(
        "INSERT INTO orders \
         (customer_id, guest_first_name, guest_last_name, guest_email, guest_phone, \
          shipping_address, status, total_amount, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', 0, ?7, ?7) \
         RETURNING id",
    )
    .bind(customer_id)
    .bind(guest.as_ref().map(|g| g.first_name.clone()))
    .bind(guest.as_ref().and_then(|g| g.last_name.clone()))
    .bind(guest.as_ref().and_then(|g| g.email.clone()))
    .bind(guest.as_ref().and_then(|g| g.phone.clone()))
    .bind(&shipping_address)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    let mut total = Money::zero();
    for (index, line) in request.lines.iter().enumerate() {
        let reservation = product::reserve(conn, line.product_id, line.quantity).await?;
        let unit_price = reservation.unit_price();
        let line_total = unit_price
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(|| amount_overflow(&format!("items[{index}].quantity")))?;

        sqlx::query(
            "INSERT INTO order_items \
             (order_id, product_id, quantity, unit_price, line_total, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(unit_price)
        .bind(line_total)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        total = total
            .checked_add(line_total)
            .ok_or_else(|| amount_overflow("items"))?;
    }

    sqlx::query("UPDATE orders SET total_amount = ?1 WHERE id = ?2")
        .bind(total)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    fetch_detail(conn, order_id).await
}

/// Quantities are bounded by validation, but prices are not, so a line or
/// order total can still exceed `i64` cents. Surfaced as a typed error;
/// the caller rolls the transaction back.
fn amount_overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

/// Materializes an order on the given connection (works both inside the
/// creation transaction and on a plain pooled connection).
async fn fetch_detail(conn: &mut SqliteConnection, order_id: i64) -> DbResult<OrderDetail> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let order = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::OrderNotFound { order_id })?
        .into_order()?;

    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY id");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(item.product_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(DbError::ProductNotFound {
                product_id: item.product_id,
            })?;
        lines.push(OrderLineDetail { item, product });
    }

    let customer = match order.identity.customer_id() {
        Some(customer_id) => Some(customer::fetch_any(conn, customer_id).await?),
        None => None,
    };

    Ok(OrderDetail {
        order,
        items: lines,
        customer,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use minicrm_core::payload::{
        CreateOrderInput, GuestInput, NewCustomer, NewProduct, OrderFilter, OrderLineInput,
    };
    use minicrm_core::{ErrorKind, Money, OrderStatus};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_customer(db: &Database, address: Option<&str>) -> i64 {
        db.customers()
            .create(&NewCustomer {
                first_name: Some("Ali".to_string()),
                address: address.map(str::to_string),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> i64 {
        db.products()
            .create(&NewProduct {
                name: Some(format!("Product {sku}")),
                sku: Some(sku.to_string()),
                price: Some(Money::from_cents(price_cents)),
                stock_quantity: Some(stock),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    fn line(product_id: i64, quantity: i64) -> OrderLineInput {
        OrderLineInput {
            product_id: Some(product_id),
            quantity: Some(quantity),
        }
    }

    #[tokio::test]
    async fn test_two_units_at_fifty_totals_one_hundred() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, Some("Kadıköy")).await;
        let product_id = seed_product(&db, "KB-001", 5000, 3).await;

        let detail = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(customer_id),
                items: vec![line(product_id, 2)],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.total_amount.to_string(), "100.00");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].item.line_total, Money::from_cents(10000));
        assert_eq!(detail.order.total_amount, detail.items_total());

        let product = db.products().get(product_id).await.unwrap();
        assert_eq!(product.stock_quantity, Some(1));
    }

    #[tokio::test]
    async fn test_unit_price_is_a_snapshot() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, Some("Kadıköy")).await;
        let product_id = seed_product(&db, "KB-001", 5000, 3).await;

        let detail = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(customer_id),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap();

        // reprice after the order
        db.products()
            .update(
                product_id,
                &minicrm_core::payload::ProductPatch {
                    price: Some(Money::from_cents(9900)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reread = db.orders().get_detail(detail.order.id).await.unwrap();
        assert_eq!(reread.items[0].item.unit_price, Money::from_cents(5000));
        assert_eq!(reread.order.total_amount, Money::from_cents(5000));
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_conflict_with_details() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, Some("Kadıköy")).await;
        let product_id = seed_product(&db, "KB-001", 5000, 1).await;

        let err = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(customer_id),
                items: vec![line(product_id, 2)],
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.details().unwrap(),
            serde_json::json!({ "productId": product_id, "requested": 2, "available": 1 })
        );

        // nothing written
        let product = db.products().get(product_id).await.unwrap();
        assert_eq!(product.stock_quantity, Some(1));
        assert!(db.orders().list(&OrderFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_mid_order_rolls_everything_back() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, Some("Kadıköy")).await;
        let ok_product = seed_product(&db, "KB-001", 5000, 5).await;

        // second line references a missing product
        let err = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(customer_id),
                items: vec![line(ok_product, 2), line(9999, 1)],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // line 1's decrement was undone, no order row survives
        let product = db.products().get(ok_product).await.unwrap();
        assert_eq!(product.stock_quantity, Some(5));
        assert!(db.orders().list(&OrderFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_order_on_untracked_product() {
        let db = test_db().await;
        let product_id = db
            .products()
            .create(&NewProduct {
                name: Some("Download".to_string()),
                sku: Some("DL-001".to_string()),
                price: Some(Money::from_cents(999)),
                track_stock: Some(false),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        let detail = db
            .orders()
            .create(&CreateOrderInput {
                guest: Some(GuestInput {
                    first_name: Some("Ayşe".to_string()),
                    email: Some("ayse@example.com".to_string()),
                    ..Default::default()
                }),
                shipping_address: Some("İstiklal Cad. 1".to_string()),
                items: vec![line(product_id, 3)],
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(detail.order.identity.is_guest());
        assert!(detail.customer.is_none());
        assert_eq!(detail.order.total_amount, Money::from_cents(2997));

        let product = db.products().get(product_id).await.unwrap();
        assert_eq!(product.stock_quantity, None);
    }

    #[tokio::test]
    async fn test_huge_quantity_is_a_typed_error_not_a_panic() {
        let db = test_db().await;
        let product_id = db
            .products()
            .create(&NewProduct {
                name: Some("Download".to_string()),
                sku: Some("DL-001".to_string()),
                price: Some(Money::from_cents(1000)),
                track_stock: Some(false),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        // untracked product, so no stock ceiling stops this earlier
        let err = db
            .orders()
            .create(&CreateOrderInput {
                guest: Some(GuestInput {
                    first_name: Some("Ayşe".to_string()),
                    ..Default::default()
                }),
                shipping_address: Some("İstiklal Cad. 1".to_string()),
                items: vec![line(product_id, i64::MAX)],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(db.orders().list(&OrderFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_line_total_overflow_rolls_back() {
        let db = test_db().await;
        // an absurd but accepted price; a within-cap quantity overflows cents
        let product_id = db
            .products()
            .create(&NewProduct {
                name: Some("Bullion".to_string()),
                sku: Some("AU-001".to_string()),
                price: Some(Money::from_cents(i64::MAX / 2)),
                track_stock: Some(false),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        let err = db
            .orders()
            .create(&CreateOrderInput {
                guest: Some(GuestInput {
                    first_name: Some("Ayşe".to_string()),
                    ..Default::default()
                }),
                shipping_address: Some("İstiklal Cad. 1".to_string()),
                items: vec![line(product_id, 1_000_000)],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(db.orders().list(&OrderFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shipping_address_falls_back_to_profile() {
        let db = test_db().await;
        let with_address = seed_customer(&db, Some("Moda Cad. 7")).await;
        let without_address = seed_customer(&db, None).await;
        let product_id = seed_product(&db, "KB-001", 5000, 10).await;

        let detail = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(with_address),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(detail.order.shipping_address, "Moda Cad. 7");

        let err = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(without_address),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_inactive_customer_cannot_order() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, Some("Kadıköy")).await;
        db.customers().deactivate(customer_id).await.unwrap();
        let product_id = seed_product(&db, "KB-001", 5000, 10).await;

        let err = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(customer_id),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_status_update_permissive_and_validated() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, Some("Kadıköy")).await;
        let product_id = seed_product(&db, "KB-001", 5000, 10).await;
        let order_id = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(customer_id),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap()
            .order
            .id;

        // pending straight to delivered is allowed
        let delivered = db.orders().update_status(order_id, "delivered").await.unwrap();
        assert_eq!(delivered.order.status, OrderStatus::Delivered);

        // and back to cancelled
        let cancelled = db.orders().update_status(order_id, "cancelled").await.unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);

        // unknown status names the allowed set and changes nothing
        let err = db.orders().update_status(order_id, "teleported").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let details = err.details().unwrap();
        let allowed: Vec<String> = details["allowed"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            allowed,
            vec!["pending", "preparing", "shipped", "delivered", "cancelled"]
        );
        let unchanged = db.orders().get_detail(order_id).await.unwrap();
        assert_eq!(unchanged.order.status, OrderStatus::Cancelled);

        // missing order
        let err = db.orders().update_status(9999, "shipped").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_customer() {
        let db = test_db().await;
        let ali = seed_customer(&db, Some("Kadıköy")).await;
        let veli = seed_customer(&db, Some("Moda")).await;
        let product_id = seed_product(&db, "KB-001", 5000, 10).await;

        let first = db
            .orders()
            .create(&CreateOrderInput {
                customer_id: Some(ali),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap();
        db.orders()
            .create(&CreateOrderInput {
                customer_id: Some(veli),
                items: vec![line(product_id, 1)],
                ..Default::default()
            })
            .await
            .unwrap();
        db.orders()
            .update_status(first.order.id, "shipped")
            .await
            .unwrap();

        let shipped = db
            .orders()
            .list(&OrderFilter {
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(shipped.len(), 1);
        assert_eq!(shipped[0].id, first.order.id);

        let alis = db
            .orders()
            .list(&OrderFilter {
                customer_id: Some(ali),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alis.len(), 1);

        let all = db.orders().list(&OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_orders_over_last_unit() {
        // file-backed database so both tasks share it through the pool
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")))
            .await
            .unwrap();

        let ayse = seed_customer(&db, Some("Kadıköy")).await;
        let fatma = seed_customer(&db, Some("Moda")).await;
        let product_id = seed_product(&db, "KB-001", 5000, 1).await;

        let order_for = |customer_id: i64| {
            let orders = db.orders();
            async move {
                orders
                    .create(&CreateOrderInput {
                        customer_id: Some(customer_id),
                        items: vec![line(product_id, 1)],
                        ..Default::default()
                    })
                    .await
            }
        };

        let (first, second) = tokio::join!(order_for(ayse), order_for(fatma));

        let results = [first, second];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one order may win the last unit");
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert_eq!(
            loser.as_ref().unwrap_err().kind(),
            ErrorKind::Conflict,
            "the loser reports a stock conflict"
        );

        let product = db.products().get(product_id).await.unwrap();
        assert_eq!(product.stock_quantity, Some(0), "stock never goes negative");
        assert_eq!(
            db.orders().list(&OrderFilter::default()).await.unwrap().len(),
            1
        );
    }
}
