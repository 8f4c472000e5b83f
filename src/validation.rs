//! Input validation for dispense requests.
//!
//! Checks structural integrity of line items and stock lots before any
//! allocation runs. Detects:
//! - Duplicate line indices or lot IDs
//! - Empty item IDs
//! - Zero-quantity demand lines
//! - Per-item demand that overflows a unit count
//! - Lots filed under the wrong item

use crate::models::{LineItem, StockLot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID or index.
    DuplicateId,
    /// An item ID is empty.
    MissingItem,
    /// A line item asks for zero units.
    ZeroQuantity,
    /// Lines for one item add up to more units than can be counted.
    QuantityOverflow,
    /// A lot was supplied for a different item than the demand.
    ItemMismatch,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the line items of one prescription.
///
/// Checks:
/// 1. No duplicate line indices
/// 2. Every line names an item
/// 3. Every line requests at least one unit
/// 4. Lines for the same item sum to at most `u32::MAX` units
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_line_items(items: &[LineItem]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut indices = HashSet::new();
    let mut totals: HashMap<&str, u32> = HashMap::new();
    let mut overflowed = HashSet::new();

    for item in items {
        if !indices.insert(item.index) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate line index: {}", item.index),
            ));
        }

        if item.item_id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingItem,
                format!("Line {} has no item", item.index),
            ));
        }

        if item.quantity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroQuantity,
                format!("Line {} ('{}') requests zero units", item.index, item.item_id),
            ));
        }

        let total = totals.entry(item.item_id.as_str()).or_insert(0);
        match total.checked_add(item.quantity) {
            Some(sum) => *total = sum,
            None => {
                if overflowed.insert(item.item_id.as_str()) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::QuantityOverflow,
                        format!("Demand for '{}' exceeds {} units", item.item_id, u32::MAX),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates lots loaded for one item.
///
/// Checks:
/// 1. No duplicate lot IDs
/// 2. Every lot belongs to `item_id`
pub fn validate_lots(item_id: &str, lots: &[StockLot]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut lot_ids = HashSet::new();

    for lot in lots {
        if !lot_ids.insert(lot.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate lot ID: {}", lot.id),
            ));
        }

        if lot.item_id != item_id {
            errors.push(ValidationError::new(
                ValidationErrorKind::ItemMismatch,
                format!(
                    "Lot '{}' holds '{}', expected '{}'",
                    lot.id, lot.item_id, item_id
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<LineItem> {
        vec![
            LineItem::new(0, "amoxicillin", 21),
            LineItem::new(1, "ibuprofen", 10),
        ]
    }

    #[test]
    fn test_valid_items() {
        assert!(validate_line_items(&sample_items()).is_ok());
        assert!(validate_line_items(&[]).is_ok());
    }

    #[test]
    fn test_duplicate_index() {
        let items = vec![LineItem::new(0, "a", 1), LineItem::new(0, "b", 1)];
        let errors = validate_line_items(&items).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_zero_quantity() {
        let items = vec![LineItem::new(0, "a", 0)];
        let errors = validate_line_items(&items).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::ZeroQuantity);
    }

    #[test]
    fn test_missing_item() {
        let items = vec![LineItem::new(0, "  ", 3)];
        let errors = validate_line_items(&items).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingItem);
    }

    #[test]
    fn test_item_total_overflow() {
        let items = vec![
            LineItem::new(0, "a", u32::MAX),
            LineItem::new(1, "b", 5),
            LineItem::new(2, "a", 1),
            LineItem::new(3, "a", 1),
        ];
        let errors = validate_line_items(&items).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::QuantityOverflow);

        let at_limit = vec![LineItem::new(0, "a", u32::MAX - 1), LineItem::new(1, "a", 1)];
        assert!(validate_line_items(&at_limit).is_ok());
    }

    #[test]
    fn test_multiple_errors() {
        let items = vec![LineItem::new(0, "", 0), LineItem::new(0, "x", 1)];
        let errors = validate_line_items(&items).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn test_valid_lots() {
        let lots = vec![
            StockLot::new("L1", "a", 5, 100),
            StockLot::new("L2", "a", 0, 200),
        ];
        assert!(validate_lots("a", &lots).is_ok());
    }

    #[test]
    fn test_lot_item_mismatch() {
        let lots = vec![StockLot::new("L1", "b", 5, 100)];
        let errors = validate_lots("a", &lots).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::ItemMismatch);
    }

    #[test]
    fn test_duplicate_lot_id() {
        let lots = vec![
            StockLot::new("L1", "a", 5, 100),
            StockLot::new("L1", "a", 3, 100),
        ];
        let errors = validate_lots("a", &lots).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("lot")));
    }
}
