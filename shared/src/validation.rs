//! Gates run before a stock row joins an operation line or before a quantity
//! or serial entry is committed
//!
//! Every gate either passes or returns a typed [`ValidationError`]; none of
//! them touches the document.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{
    serial_quantity, Allocation, Document, LicensePlateNumber, OperationLine, SerialOffset,
    StockFilter, StockRecord,
};
use crate::remote::RemoteDataService;
use crate::residual::ResidualQuantity;
use crate::serial::{compute_ending_serial, is_sequential, SerialRange};
use crate::types::{StockId, WizardKind};

// ============================================================================
// Quantity Validations
// ============================================================================

/// Quantity must be positive and fit in what the current operation may still take
pub fn validate_quantity(
    stock_id: StockId,
    quantity: Decimal,
    residual: &ResidualQuantity,
) -> Result<(), ValidationError> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::QuantityNotPositive);
    }
    let available = residual.remaining();
    if quantity > available {
        return Err(ValidationError::QuantityExceedsResidual {
            stock_id,
            requested: quantity,
            available,
        });
    }
    Ok(())
}

/// Serial-tracked quantities are whole units
pub fn validate_serial_quantity(quantity: Decimal) -> Result<u64, ValidationError> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::QuantityNotPositive);
    }
    serial_quantity(quantity).ok_or(ValidationError::FractionalSerialQuantity(quantity))
}

pub fn validate_conversion_factor(factor: Decimal) -> Result<(), ValidationError> {
    if factor <= Decimal::ZERO {
        return Err(ValidationError::InvalidConversionFactor);
    }
    Ok(())
}

// ============================================================================
// Destination Validations
// ============================================================================

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// The wizard's mandatory destination fields, plus the lot of lot-managed products
pub fn validate_mandatory_destination(
    kind: WizardKind,
    allocation: &Allocation,
    lot_managed: bool,
) -> Result<(), ValidationError> {
    let required = kind.destination_requirements();
    if required.location && is_blank(&allocation.location) {
        return Err(ValidationError::MissingDestinationField { field: "location" });
    }
    if required.license_plate_number && is_blank(&allocation.license_plate_number) {
        return Err(ValidationError::MissingDestinationField {
            field: "licensePlateNumber",
        });
    }
    if lot_managed && is_blank(&allocation.lot) {
        return Err(ValidationError::MissingDestinationField { field: "lot" });
    }
    Ok(())
}

/// Lines already headed for `destination`: the current operation's lines and
/// any line with an allocation targeting it
fn lines_bound_for<'a>(
    document: &'a Document,
    destination: &'a LicensePlateNumber,
) -> impl Iterator<Item = &'a OperationLine> {
    document.lines().iter().filter(move |line| {
        line.line_number == document.current_operation
            || line.targets_license_plate_number(&destination.code)
    })
}

/// In-memory half of the single-product rule
pub fn check_single_product_in_lines(
    destination: &LicensePlateNumber,
    document: &Document,
    product: &str,
) -> Result<(), ValidationError> {
    if !destination.is_single_product {
        return Ok(());
    }
    match lines_bound_for(document, destination).find(|line| line.product != product) {
        Some(line) => Err(ValidationError::SingleProductViolation {
            license_plate_number: destination.code.clone(),
            expected: line.product.clone(),
            found: product.to_string(),
        }),
        None => Ok(()),
    }
}

/// A single-product destination may only ever hold `product`
///
/// Document lines are checked first; the remote lookup for stock already
/// stored on the destination only runs when they agree.
pub async fn validate_single_product<R: RemoteDataService + ?Sized>(
    remote: &R,
    destination: &LicensePlateNumber,
    document: &Document,
    product: &str,
) -> Result<(), ValidationError> {
    if !destination.is_single_product {
        return Ok(());
    }
    check_single_product_in_lines(destination, document, product)?;

    let filter = StockFilter::on_license_plate_number(&destination.code).excluding_product(product);
    let existing = remote.read_stock(&filter).await?;
    if let Some(other) = existing.first() {
        tracing::debug!(
            "LPN {} already holds product {}, rejecting {}",
            destination.code,
            other.product,
            product
        );
        return Err(ValidationError::SingleProductViolation {
            license_plate_number: destination.code.clone(),
            expected: other.product.clone(),
            found: product.to_string(),
        });
    }
    Ok(())
}

/// In-memory half of the single-lot rule
pub fn check_single_lot_in_lines(
    destination: &LicensePlateNumber,
    document: &Document,
    lot: &str,
) -> Result<(), ValidationError> {
    if !destination.is_single_lot {
        return Ok(());
    }
    let conflicting = lines_bound_for(document, destination)
        .flat_map(OperationLine::lots)
        .find(|existing| *existing != lot);
    match conflicting {
        Some(existing) => Err(ValidationError::SingleLotViolation {
            license_plate_number: destination.code.clone(),
            expected: existing.to_string(),
            found: lot.to_string(),
        }),
        None => Ok(()),
    }
}

/// A single-lot destination may only ever hold `lot`
pub async fn validate_single_lot<R: RemoteDataService + ?Sized>(
    remote: &R,
    destination: &LicensePlateNumber,
    document: &Document,
    lot: &str,
) -> Result<(), ValidationError> {
    if !destination.is_single_lot {
        return Ok(());
    }
    check_single_lot_in_lines(destination, document, lot)?;

    let filter = StockFilter::on_license_plate_number(&destination.code).excluding_lot(lot);
    let existing = remote.read_stock(&filter).await?;
    if let Some(other) = existing.iter().find(|r| r.lot.is_some()) {
        return Err(ValidationError::SingleLotViolation {
            license_plate_number: destination.code.clone(),
            expected: other.lot.clone().unwrap_or_default(),
            found: lot.to_string(),
        });
    }
    Ok(())
}

/// Both destination rules for a stock record about to go to `destination`
///
/// Both in-memory checks run before either remote lookup.
pub async fn validate_destination<R: RemoteDataService + ?Sized>(
    remote: &R,
    destination: &LicensePlateNumber,
    document: &Document,
    record: &StockRecord,
) -> Result<(), ValidationError> {
    let lot = record.lot.as_deref();
    check_single_product_in_lines(destination, document, &record.product)?;
    if let Some(lot) = lot {
        check_single_lot_in_lines(destination, document, lot)?;
    }

    validate_single_product(remote, destination, document, &record.product).await?;
    if let Some(lot) = lot {
        validate_single_lot(remote, destination, document, lot).await?;
    }
    Ok(())
}

// ============================================================================
// Serial Number Validations
// ============================================================================

/// The serials actually found on a serial-tracked record must be contiguous
pub async fn validate_stock_sequence<R: RemoteDataService + ?Sized>(
    remote: &R,
    record: &StockRecord,
) -> Result<(), ValidationError> {
    if !record.is_serial_tracked() {
        return Ok(());
    }
    let quantity = validate_serial_quantity(record.quantity_in_packing_unit)?;
    let stock_id = record.stock_id;

    let first = match record.serial_number.as_deref().filter(|s| !s.is_empty()) {
        Some(serial) => serial.to_string(),
        None => remote
            .read_serial_number(&record.product, stock_id, SerialOffset::First)
            .await?
            .ok_or(ValidationError::SerialNumberMissing { stock_id })?
            .code,
    };
    let last = remote
        .read_serial_number(&record.product, stock_id, SerialOffset::Last)
        .await?
        .ok_or(ValidationError::SerialNumberMissing { stock_id })?
        .code;

    if !is_sequential(&first, &last, quantity) {
        tracing::debug!(
            "Stock {} serials {}..{} are not contiguous for {} units",
            stock_id,
            first,
            last,
            quantity
        );
        return Err(ValidationError::NonSequentialStock { stock_id });
    }
    Ok(())
}

/// Every serial range already committed for `product`, across all operations
pub fn committed_serial_ranges(document: &Document, product: &str) -> Vec<SerialRange> {
    document
        .lines()
        .iter()
        .filter(|line| line.product == product)
        .flat_map(|line| line.stock_details.iter())
        .filter_map(|allocation| allocation.serial_range())
        .filter_map(Result::ok)
        .map(|(start, end)| SerialRange { start, end })
        .collect()
}

fn ensure_disjoint(
    document: &Document,
    product: &str,
    range: &SerialRange,
) -> Result<(), ValidationError> {
    match committed_serial_ranges(document, product)
        .into_iter()
        .find(|existing| existing.overlaps(range))
    {
        Some(existing) => Err(ValidationError::SerialRangeOverlap {
            start: range.start.clone(),
            end: range.end.clone(),
            existing_start: existing.start,
            existing_end: existing.end,
        }),
        None => Ok(()),
    }
}

/// A user-entered serial range: the ending serial must match the quantity and
/// the range must not overlap anything committed for the product
pub fn validate_serial_range(
    document: &Document,
    product: &str,
    start: &str,
    end: &str,
    quantity: Decimal,
) -> Result<SerialRange, ValidationError> {
    let units = validate_serial_quantity(quantity)?;
    let expected = compute_ending_serial(start, units)?;
    if expected != end {
        return Err(ValidationError::SerialRangeMismatch {
            entered: end.to_string(),
            expected,
        });
    }
    let range = SerialRange {
        start: start.to_string(),
        end: expected,
    };
    ensure_disjoint(document, product, &range)?;
    Ok(range)
}

/// The range implied by an allocation must not overlap committed ranges
pub fn validate_serial_allocation(
    document: &Document,
    product: &str,
    allocation: &Allocation,
) -> Result<(), ValidationError> {
    let Some(start) = allocation.starting_serial() else {
        return Ok(());
    };
    let units = validate_serial_quantity(allocation.quantity_in_packing_unit)?;
    let range = SerialRange::from_start(start, units)?;
    ensure_disjoint(document, product, &range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LicensePlateNumberStatus;

    fn lpn(single_product: bool, single_lot: bool) -> LicensePlateNumber {
        LicensePlateNumber {
            code: "LPN1".to_string(),
            is_single_product: single_product,
            is_single_lot: single_lot,
            location: None,
            status: LicensePlateNumberStatus::Free,
        }
    }

    fn document_with(product: &str, serial: Option<&str>, quantity: i64) -> Document {
        let mut document = Document::new("alice");
        let mut line = OperationLine::new(StockId(1), 0, product);
        let mut allocation =
            Allocation::new(Decimal::from(quantity), "UN", Decimal::ONE).with_lot("L1");
        allocation.serial_number = serial.map(str::to_string);
        line.stock_details.push(allocation);
        document.lines_mut().push(line);
        document
    }

    fn residual(origin: i64, current: i64) -> ResidualQuantity {
        ResidualQuantity {
            origin_quantity: Decimal::from(origin),
            consumed_by_other_operations: Decimal::ZERO,
            allocated_in_current_operation: Decimal::from(current),
            displayed: Decimal::from(current),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(StockId(1), Decimal::from(4), &residual(10, 6)).is_ok());
        assert_eq!(
            validate_quantity(StockId(1), Decimal::ZERO, &residual(10, 0)),
            Err(ValidationError::QuantityNotPositive)
        );
        assert!(matches!(
            validate_quantity(StockId(1), Decimal::from(5), &residual(10, 6)),
            Err(ValidationError::QuantityExceedsResidual { .. })
        ));
    }

    #[test]
    fn test_validate_serial_quantity() {
        assert_eq!(validate_serial_quantity(Decimal::from(3)), Ok(3));
        assert!(validate_serial_quantity(Decimal::new(25, 1)).is_err());
        assert!(validate_serial_quantity(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_mandatory_destination() {
        let bare = Allocation::new(Decimal::ONE, "UN", Decimal::ONE);
        assert_eq!(
            validate_mandatory_destination(WizardKind::LpnGrouping, &bare, false),
            Err(ValidationError::MissingDestinationField {
                field: "licensePlateNumber"
            })
        );
        assert_eq!(
            validate_mandatory_destination(WizardKind::StockChange, &bare, false),
            Err(ValidationError::MissingDestinationField { field: "location" })
        );
        let placed = bare.clone().with_location("A-01");
        assert!(validate_mandatory_destination(WizardKind::StockChange, &placed, false).is_ok());
        assert_eq!(
            validate_mandatory_destination(WizardKind::StockChange, &placed, true),
            Err(ValidationError::MissingDestinationField { field: "lot" })
        );
    }

    #[test]
    fn test_single_product_in_lines() {
        let document = document_with("P1", None, 2);
        assert!(check_single_product_in_lines(&lpn(true, false), &document, "P1").is_ok());
        assert!(check_single_product_in_lines(&lpn(false, false), &document, "P2").is_ok());
        assert!(matches!(
            check_single_product_in_lines(&lpn(true, false), &document, "P2"),
            Err(ValidationError::SingleProductViolation { .. })
        ));
    }

    #[test]
    fn test_single_lot_in_lines() {
        let document = document_with("P1", None, 2);
        assert!(check_single_lot_in_lines(&lpn(false, true), &document, "L1").is_ok());
        assert!(matches!(
            check_single_lot_in_lines(&lpn(false, true), &document, "L2"),
            Err(ValidationError::SingleLotViolation { .. })
        ));
    }

    #[test]
    fn test_serial_range_mismatch() {
        let document = Document::new("alice");
        assert_eq!(
            validate_serial_range(&document, "P1", "SN0001", "SN0004", Decimal::from(5)),
            Err(ValidationError::SerialRangeMismatch {
                entered: "SN0004".to_string(),
                expected: "SN0005".to_string()
            })
        );
    }

    #[test]
    fn test_serial_range_overlap_rejected() {
        let document = document_with("P1", Some("SN0001"), 5);
        assert!(matches!(
            validate_serial_range(&document, "P1", "SN0004", "SN0008", Decimal::from(5)),
            Err(ValidationError::SerialRangeOverlap { .. })
        ));
        let five = Decimal::from(5);
        assert!(validate_serial_range(&document, "P1", "SN0006", "SN0010", five).is_ok());
        // Other products do not compete for the same serials
        assert!(validate_serial_range(&document, "P2", "SN0004", "SN0008", five).is_ok());
    }

    #[test]
    fn test_committed_ranges_skip_unserialized() {
        let document = document_with("P1", None, 5);
        assert!(committed_serial_ranges(&document, "P1").is_empty());
    }
}
