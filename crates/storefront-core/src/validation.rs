//! # Validation Module
//!
//! Input validation for catalog and cart payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Wrong JSON types → 400 before reaching this module                │
//! │  └── Unknown keys ignored                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields must be truthy                                    │
//! │  └── Quantities and cart sizes stay in range                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Stores (storefront-db)                                       │
//! │  └── Existence checks (unknown product / cart → NotFound)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Truthiness
//! A required field counts as present only when it is "truthy": strings must
//! be non-blank and numbers must be non-zero. A product with `stock: 0` is
//! therefore rejected at create and update time.

use crate::error::ValidationError;
use crate::types::{ProductDraft, ProductFields};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Product Validators
// =============================================================================

/// Validates an inbound product payload into a draft.
///
/// ## Rules
/// - `title`, `description`, `code`, `category` must be non-blank strings
/// - `price` must be a finite number greater than zero
/// - `stock` must be greater than zero
/// - `status` defaults to `true`, `thumbnails` defaults to `[]`
///
/// Every missing field is reported at once, in declaration order.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_product_fields;
/// use storefront_core::ProductFields;
///
/// let err = validate_product_fields(&ProductFields::default()).unwrap_err();
/// assert!(err.to_string().starts_with("All fields are required"));
/// ```
pub fn validate_product_fields(fields: &ProductFields) -> ValidationResult<ProductDraft> {
    let mut missing = Vec::new();

    let title = required_text("title", &fields.title, &mut missing);
    let description = required_text("description", &fields.description, &mut missing);
    let code = required_text("code", &fields.code, &mut missing);

    let price = match fields.price {
        Some(p) if p.is_nan() || p == 0.0 => {
            missing.push("price".to_string());
            0.0
        }
        Some(p) => p,
        None => {
            missing.push("price".to_string());
            0.0
        }
    };

    let stock = match fields.stock {
        Some(s) if s > 0 => s,
        _ => {
            missing.push("stock".to_string());
            0
        }
    };

    let category = required_text("category", &fields.category, &mut missing);

    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { fields: missing });
    }

    if !price.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if price < 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(ProductDraft {
        title,
        description,
        code,
        price,
        status: fields.status.unwrap_or(true),
        stock,
        category,
        thumbnails: fields.thumbnails.clone().unwrap_or_default(),
    })
}

fn required_text(name: &str, value: &Option<String>, missing: &mut Vec<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_quantity;
///
/// assert!(validate_quantity(3).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY as i64 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that a cart can take one more distinct line.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates a caller-supplied cart id.
///
/// Ids are opaque, but must be non-blank and URL-safe. The id is checked
/// exactly as it will be stored, so surrounding whitespace is rejected.
pub fn validate_cart_id(id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "cartId".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::InvalidFormat {
            field: "cartId".to_string(),
            reason: "must be at most 64 characters".to_string(),
        });
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "cartId".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ProductFields {
        ProductFields {
            title: Some("Yerba".into()),
            description: Some("1kg".into()),
            code: Some("Y-1".into()),
            price: Some(7.5),
            status: None,
            stock: Some(20),
            category: Some("grocery".into()),
            thumbnails: None,
        }
    }

    #[test]
    fn test_complete_payload_gets_defaults() {
        let draft = validate_product_fields(&complete()).unwrap();
        assert!(draft.status);
        assert!(draft.thumbnails.is_empty());
        assert_eq!(draft.title, "Yerba");
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let fields = ProductFields {
            title: Some("   ".into()),
            stock: Some(0),
            ..complete()
        };
        let err = validate_product_fields(&fields).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                fields: vec!["title".into(), "stock".into()]
            }
        );
    }

    #[test]
    fn test_price_rules() {
        let zero = ProductFields { price: Some(0.0), ..complete() };
        assert!(matches!(
            validate_product_fields(&zero),
            Err(ValidationError::MissingFields { .. })
        ));

        let negative = ProductFields { price: Some(-1.0), ..complete() };
        assert!(matches!(
            validate_product_fields(&negative),
            Err(ValidationError::MustBePositive { .. })
        ));

        let infinite = ProductFields { price: Some(f64::INFINITY), ..complete() };
        assert!(matches!(
            validate_product_fields(&infinite),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_explicit_status_is_kept() {
        let fields = ProductFields { status: Some(false), ..complete() };
        assert!(!validate_product_fields(&fields).unwrap().status);
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_cart_id() {
        assert!(validate_cart_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_cart_id("guest_7").is_ok());
        assert!(validate_cart_id("").is_err());
        assert!(validate_cart_id("has space").is_err());
        assert!(validate_cart_id(" abc").is_err());
        assert!(validate_cart_id("abc\t").is_err());
        assert!(validate_cart_id("   ").is_err());
        assert!(validate_cart_id(&"a".repeat(65)).is_err());
    }
}
