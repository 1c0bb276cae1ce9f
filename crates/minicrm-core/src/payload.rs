//! # Request Payloads
//!
//! Deserialized caller input, before validation. These structs mirror the
//! JSON wire shapes; [`crate::validation`] turns them into normalized
//! request types that the store layer trusts.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{GuestContact, OrderStatus};

// =============================================================================
// Orders
// =============================================================================

/// Raw order-creation payload.
///
/// Identity is ambiguous at this stage: `customer_id` and `guest` may both
/// be present, both absent, or anything in between. Validation resolves
/// that into a single [`crate::types::OrderIdentity`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub customer_id: Option<i64>,
    pub guest: Option<GuestInput>,
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
}

/// Guest contact block as submitted by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: Option<i64>,
    pub quantity: Option<i64>,
}

/// A validated, normalized order request.
///
/// Every field here has passed structural validation; what remains to check
/// (existence, stock, active flags) requires the store and happens inside
/// the creation transaction.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub identity: OrderRequestIdentity,
    /// Present when the caller supplied an address; registered customers
    /// may fall back to their stored address instead.
    pub shipping_address: Option<String>,
    pub lines: Vec<OrderRequestLine>,
}

/// Identity of a validated order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRequestIdentity {
    Registered { customer_id: i64 },
    Guest { guest: GuestContact },
}

/// A validated order line: positive id, positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRequestLine {
    pub product_id: i64,
    pub quantity: i64,
}

/// Status-change payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusInput {
    pub status: Option<String>,
}

/// Listing filters for orders. All optional; absent filters match all.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Customers
// =============================================================================

/// Payload for registering a customer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Partial customer update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Products
// =============================================================================

/// Payload for creating a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub track_stock: Option<bool>,
    pub stock_quantity: Option<i64>,
}

/// Partial product update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub track_stock: Option<bool>,
    pub stock_quantity: Option<i64>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.track_stock.is_none()
            && self.stock_quantity.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Serializable Error Body
// =============================================================================

/// The wire shape every failed operation reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
