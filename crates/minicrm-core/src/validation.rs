//! # Input Validation
//!
//! Structural validation and normalization of caller payloads. Everything
//! here is pure: no store access, no clock, no I/O. Checks that need the
//! database (existence, stock, active flags) happen later, inside the
//! transaction.
//!
//! ## Validation Pipeline
//! ```text
//! CreateOrderInput                    OrderRequest
//! ┌──────────────────┐               ┌──────────────────┐
//! │ customer_id?     │   validate    │ identity (one of)│
//! │ guest?           │ ────────────▶ │ shipping_address?│
//! │ shipping_address?│               │ lines (non-empty,│
//! │ items (raw)      │   Err(..) ─┐  │   all positive)  │
//! └──────────────────┘            │  └──────────────────┘
//!                                 ▼
//!                         ValidationError
//!                     (VALIDATION, pre-transaction)
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::payload::{
    CreateOrderInput, CustomerPatch, NewCustomer, NewProduct, OrderRequest, OrderRequestIdentity,
    OrderRequestLine,
};
use crate::types::GuestContact;

/// Maximum order lines accepted in a single request. Requests over the
/// cap fail with `OutOfRange` naming the bound.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum units of one product per order line. Bounds line totals well
/// inside `i64` cents for any sane price.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

// =============================================================================
// Primitives
// =============================================================================

/// Trims a text field, mapping empty/whitespace-only input to `None`.
pub fn normalize_optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Lowercases and trims an email, rejecting obviously malformed shapes.
///
/// Deliberately liberal: one `@`, non-empty local part, a dot in the domain.
/// Deliverability is not this layer's problem.
pub fn normalize_email(raw: &str) -> ValidationResult<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@').ok_or_else(|| invalid_email())?;
    if local.is_empty() || domain.len() < 3 || !domain.contains('.') || domain.contains('@') {
        return Err(invalid_email());
    }
    Ok(email)
}

fn invalid_email() -> ValidationError {
    ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "not a valid email address".to_string(),
    }
}

/// Rejects non-positive entity ids.
pub fn validate_positive_id(field: &str, value: i64) -> ValidationResult<i64> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(value)
}

// =============================================================================
// Orders
// =============================================================================

/// Validates and normalizes an order-creation payload.
///
/// Identity resolution: an explicit `customerId` wins; otherwise a guest
/// block with `firstName` is required. Guest orders must carry a shipping
/// address in the payload — there is no profile to fall back to.
pub fn validate_order_input(input: &CreateOrderInput) -> ValidationResult<OrderRequest> {
    let identity = resolve_identity(input)?;
    let shipping_address = normalize_optional_text(input.shipping_address.as_deref());

    if input.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }
    if input.items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    let mut lines = Vec::with_capacity(input.items.len());
    for (index, item) in input.items.iter().enumerate() {
        let product_id = item.product_id.ok_or_else(|| ValidationError::Required {
            field: format!("items[{index}].productId"),
        })?;
        let quantity = item.quantity.ok_or_else(|| ValidationError::Required {
            field: format!("items[{index}].quantity"),
        })?;
        let quantity = validate_positive_id(&format!("items[{index}].quantity"), quantity)?;
        if quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: format!("items[{index}].quantity"),
                min: 1,
                max: MAX_LINE_QUANTITY,
            });
        }
        lines.push(OrderRequestLine {
            product_id: validate_positive_id(&format!("items[{index}].productId"), product_id)?,
            quantity,
        });
    }

    if matches!(identity, OrderRequestIdentity::Guest { .. }) && shipping_address.is_none() {
        return Err(ValidationError::Required {
            field: "shippingAddress".to_string(),
        });
    }

    Ok(OrderRequest {
        identity,
        shipping_address,
        lines,
    })
}

fn resolve_identity(input: &CreateOrderInput) -> ValidationResult<OrderRequestIdentity> {
    if let Some(customer_id) = input.customer_id {
        return Ok(OrderRequestIdentity::Registered {
            customer_id: validate_positive_id("customerId", customer_id)?,
        });
    }

    let guest = input.guest.as_ref().ok_or_else(|| ValidationError::Required {
        field: "customerId or guest".to_string(),
    })?;
    let first_name =
        normalize_optional_text(guest.first_name.as_deref()).ok_or_else(|| {
            ValidationError::Required {
                field: "guest.firstName".to_string(),
            }
        })?;
    let email = match guest.email.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(normalize_email(raw)?),
        _ => None,
    };

    Ok(OrderRequestIdentity::Guest {
        guest: GuestContact {
            first_name,
            last_name: normalize_optional_text(guest.last_name.as_deref()),
            email,
            phone: normalize_optional_text(guest.phone.as_deref()),
        },
    })
}

// =============================================================================
// Customers
// =============================================================================

/// A customer payload after normalization, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCustomer {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Validates a customer-creation payload: `firstName` is the only hard
/// requirement; everything else is trimmed with empty collapsing to NULL.
pub fn validate_new_customer(input: &NewCustomer) -> ValidationResult<ValidCustomer> {
    let first_name =
        normalize_optional_text(input.first_name.as_deref()).ok_or_else(|| {
            ValidationError::Required {
                field: "firstName".to_string(),
            }
        })?;
    let email = match input.email.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(normalize_email(raw)?),
        _ => None,
    };
    Ok(ValidCustomer {
        first_name,
        last_name: normalize_optional_text(input.last_name.as_deref()),
        email,
        phone: normalize_optional_text(input.phone.as_deref()),
        address: normalize_optional_text(input.address.as_deref()),
    })
}

/// Validates a customer patch in place, normalizing populated fields.
pub fn validate_customer_patch(patch: &CustomerPatch) -> ValidationResult<CustomerPatch> {
    let mut normalized = patch.clone();
    if let Some(first_name) = &normalized.first_name {
        if first_name.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "firstName".to_string(),
            });
        }
        normalized.first_name = Some(first_name.trim().to_string());
    }
    if let Some(email) = &normalized.email {
        normalized.email = Some(normalize_email(email)?);
    }
    normalized.last_name = normalized
        .last_name
        .as_deref()
        .map(|v| v.trim().to_string());
    normalized.phone = normalized.phone.as_deref().map(|v| v.trim().to_string());
    normalized.address = normalized.address.as_deref().map(|v| v.trim().to_string());
    Ok(normalized)
}

// =============================================================================
// Products
// =============================================================================

/// A product payload after normalization, ready to insert.
#[derive(Debug, Clone)]
pub struct ValidProduct {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: crate::money::Money,
    pub track_stock: bool,
    pub stock_quantity: Option<i64>,
}

/// Validates a product-creation payload.
///
/// Stock coupling: tracked products default a missing quantity to 0;
/// untracked products carry no quantity at all.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<ValidProduct> {
    let name = normalize_optional_text(input.name.as_deref()).ok_or_else(|| {
        ValidationError::Required {
            field: "name".to_string(),
        }
    })?;
    let sku = normalize_optional_text(input.sku.as_deref()).ok_or_else(|| {
        ValidationError::Required {
            field: "sku".to_string(),
        }
    })?;
    let price = input.price.ok_or_else(|| ValidationError::Required {
        field: "price".to_string(),
    })?;
    if price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    let track_stock = input.track_stock.unwrap_or(true);
    let stock_quantity = if track_stock {
        let quantity = input.stock_quantity.unwrap_or(0);
        if quantity < 0 {
            return Err(ValidationError::MustBePositive {
                field: "stockQuantity".to_string(),
            });
        }
        Some(quantity)
    } else {
        None
    };

    Ok(ValidProduct {
        name,
        sku,
        description: normalize_optional_text(input.description.as_deref()),
        price,
        track_stock,
        stock_quantity,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
