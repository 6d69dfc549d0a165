//! Operation lines: one stock record's contribution to a document

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Allocation;
use crate::types::StockId;

/// One stock record's contribution to one operation of the document
///
/// `(stock_id, line_number)` is unique within a document; `line_number` is the
/// index of the operation the line belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLine {
    pub stock_id: StockId,
    pub line_number: u32,
    pub product: String,
    #[serde(default)]
    pub stock_details: Vec<Allocation>,
    /// Lot of the stock record the line draws from (not submitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    /// Site echoed from the stock record (not submitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_site: Option<String>,
    /// Quantity shown on the stock card (not submitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_quantity: Option<Decimal>,
}

impl OperationLine {
    pub fn new(stock_id: StockId, line_number: u32, product: impl Into<String>) -> Self {
        Self {
            stock_id,
            line_number,
            product: product.into(),
            stock_details: Vec::new(),
            lot: None,
            stock_site: None,
            displayed_quantity: None,
        }
    }

    /// Whether this line is the `(stock_id, line_number)` entry
    pub fn is(&self, stock_id: StockId, line_number: u32) -> bool {
        self.stock_id == stock_id && self.line_number == line_number
    }

    /// Sum of the packing unit quantities of every allocation
    pub fn allocated_quantity(&self) -> Decimal {
        self.stock_details
            .iter()
            .map(|a| a.quantity_in_packing_unit)
            .sum()
    }

    /// Sum of the stock unit quantities of every allocation
    pub fn allocated_stock_quantity(&self) -> Decimal {
        self.stock_details
            .iter()
            .map(|a| a.quantity_in_stock_unit)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stock_details.is_empty()
    }

    /// Source lot of the line, then the lots carried by its allocations
    pub fn lots(&self) -> impl Iterator<Item = &str> {
        self.lot
            .as_deref()
            .into_iter()
            .chain(self.stock_details.iter().filter_map(|a| a.lot.as_deref()))
    }

    /// Whether any allocation targets the given destination license plate number
    pub fn targets_license_plate_number(&self, code: &str) -> bool {
        self.stock_details
            .iter()
            .any(|a| a.license_plate_number.as_deref() == Some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocated_quantity_sums_details() {
        let mut line = OperationLine::new(StockId(7), 0, "P1");
        line.stock_details
            .push(Allocation::new(Decimal::from(2), "UN", Decimal::ONE));
        line.stock_details
            .push(Allocation::new(Decimal::from(3), "BOX", Decimal::from(10)));
        assert_eq!(line.allocated_quantity(), Decimal::from(5));
        assert_eq!(line.allocated_stock_quantity(), Decimal::from(32));
    }

    #[test]
    fn test_empty_line_has_zero_quantity() {
        let line = OperationLine::new(StockId(7), 0, "P1");
        assert!(line.is_empty());
        assert_eq!(line.allocated_quantity(), Decimal::ZERO);
    }

    #[test]
    fn test_lots_include_source_lot() {
        let mut line = OperationLine::new(StockId(7), 0, "P1");
        assert_eq!(line.lots().count(), 0);

        line.lot = Some("L1".to_string());
        line.stock_details
            .push(Allocation::new(Decimal::ONE, "UN", Decimal::ONE).with_lot("L2"));
        assert_eq!(line.lots().collect::<Vec<_>>(), vec!["L1", "L2"]);
    }
}
