//! # Domain Types
//!
//! Core entities of MiniCRM.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐         │
//! │  │   Customer    │   │    Product    │   │     Order     │         │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │         │
//! │  │  id           │   │  id           │   │  id           │         │
//! │  │  first_name   │   │  sku (unique) │   │  identity     │         │
//! │  │  email?       │   │  price        │   │  status       │         │
//! │  │  is_active    │   │  track_stock  │   │  total_amount │         │
//! │  └───────────────┘   │  stock_qty?   │   └───────┬───────┘         │
//! │                      └───────────────┘           │ 1..N            │
//! │                                          ┌───────┴───────┐         │
//! │  OrderIdentity = Registered(customerId)  │   OrderItem   │         │
//! │                | Guest(contact)          │  unit_price   │         │
//! │                                          │  line_total   │         │
//! │  "exactly one of" lives in the type,     └───────────────┘         │
//! │  not in runtime null checks.                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// Customers are never hard-deleted; `is_active = false` removes them from
/// default listings and from new order attribution while historical orders
/// keep the reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    /// Stored lowercase; import dedup matches on this.
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable item.
///
/// `stock_quantity` is meaningful only while `track_stock` is true; untracked
/// products reserve as if stock were infinite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Business identifier; uniqueness is a hard constraint.
    pub sku: String,
    pub description: Option<String>,
    pub price: Money,
    pub track_stock: bool,
    pub stock_quantity: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units currently available for reservation.
    ///
    /// A tracked product with NULL stock counts as zero, matching the
    /// committed-state invariant.
    pub fn available(&self) -> i64 {
        self.stock_quantity.unwrap_or(0)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
///
/// No transition-adjacency restriction is enforced: any status may move to
/// any other. Deliberately permissive, matching the observed product
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status a caller may set, in canonical order.
    pub const ALLOWED: [&'static str; 5] =
        ["pending", "preparing", "shipped", "delivered", "cancelled"];

    /// Canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a caller-supplied status, rejecting anything outside the
    /// allowed set with an error that names all five values.
    pub fn parse(raw: &str) -> ValidationResult<OrderStatus> {
        match raw.trim() {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: Self::ALLOWED.to_vec(),
            }),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Identity
// =============================================================================

/// Contact details carried by a guest order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestContact {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Who an order belongs to: a registered customer or a one-off guest.
///
/// Exactly one of the two holds at any time — never both, never neither.
/// The sum type makes the invariant unrepresentable to violate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum OrderIdentity {
    #[serde(rename_all = "camelCase")]
    Registered { customer_id: i64 },
    Guest { guest: GuestContact },
}

impl OrderIdentity {
    /// The customer id for registered orders, None for guests.
    pub fn customer_id(&self) -> Option<i64> {
        match self {
            OrderIdentity::Registered { customer_id } => Some(*customer_id),
            OrderIdentity::Guest { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, OrderIdentity::Guest { .. })
    }
}

// =============================================================================
// Order & OrderItem
// =============================================================================

/// An order header.
///
/// `total_amount` equals the sum of the items' line totals at every
/// committed state; only `status` mutates after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(flatten)]
    pub identity: OrderIdentity,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order.
///
/// `unit_price` is the price captured at reservation time and never changes
/// afterwards, even if the product is repriced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price × quantity`, exact in cents.
    pub line_total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Materialized Views
// =============================================================================

/// An order line joined with the product it references.
///
/// The product may be inactive by the time the order is read; the reference
/// is kept for historical integrity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDetail {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: Product,
}

/// A fully materialized order: header, items with product references, and
/// the customer record for registered orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLineDetail>,
    pub customer: Option<Customer>,
}

impl OrderDetail {
    /// Recomputed sum of line totals; equals `order.total_amount` for any
    /// committed order.
    pub fn items_total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.item.line_total)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
