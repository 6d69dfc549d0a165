//! Residual quantity of stock records across the operations of a document

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{OperationLine, StockRecord};
use crate::types::StockId;

/// How much of a stock record is still allocatable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidualQuantity {
    /// Record quantity minus what other operations of the document took
    pub origin_quantity: Decimal,
    pub consumed_by_other_operations: Decimal,
    pub allocated_in_current_operation: Decimal,
    /// Quantity shown on the stock card.
    ///
    /// Serial-tracked records count down from `origin_quantity`; other records
    /// show the running total carved out by the current operation.
    pub displayed: Decimal,
}

impl ResidualQuantity {
    /// Quantity the current operation may still take
    pub fn remaining(&self) -> Decimal {
        (self.origin_quantity - self.allocated_in_current_operation).max(Decimal::ZERO)
    }
}

/// Computes residual quantities, memoizing each record's origin quantity per
/// operation until the record is invalidated
#[derive(Debug, Clone, Default)]
pub struct ResidualQuantityCalculator {
    origins: HashMap<(StockId, u32), Decimal>,
}

impl ResidualQuantityCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Residual of `record` for `current_operation` given every document line
    pub fn compute(
        &mut self,
        record: &StockRecord,
        lines: &[OperationLine],
        current_operation: u32,
    ) -> ResidualQuantity {
        let consumed_by_other_operations: Decimal = lines
            .iter()
            .filter(|line| {
                line.stock_id == record.stock_id && line.line_number != current_operation
            })
            .map(OperationLine::allocated_quantity)
            .sum();

        let origin_quantity = *self
            .origins
            .entry((record.stock_id, current_operation))
            .or_insert_with(|| {
                (record.quantity_in_packing_unit - consumed_by_other_operations)
                    .max(Decimal::ZERO)
            });

        let allocated_in_current_operation = lines
            .iter()
            .find(|line| line.is(record.stock_id, current_operation))
            .map(OperationLine::allocated_quantity)
            .unwrap_or(Decimal::ZERO);

        let displayed = if record.is_serial_tracked() {
            origin_quantity - allocated_in_current_operation
        } else {
            allocated_in_current_operation
        };

        ResidualQuantity {
            origin_quantity,
            consumed_by_other_operations,
            allocated_in_current_operation,
            displayed: displayed.max(Decimal::ZERO).min(origin_quantity),
        }
    }

    /// Forget every memoized origin of a stock record
    pub fn invalidate(&mut self, stock_id: StockId) {
        self.origins.retain(|(id, _), _| *id != stock_id);
    }

    pub fn clear(&mut self) {
        self.origins.clear();
    }

    pub fn is_cached(&self, stock_id: StockId, operation: u32) -> bool {
        self.origins.contains_key(&(stock_id, operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Allocation;
    use crate::types::SerialNumberManagementMode;

    fn record(quantity: i64, mode: SerialNumberManagementMode) -> StockRecord {
        StockRecord {
            stock_id: StockId(1),
            product: "P1".to_string(),
            quantity_in_packing_unit: Decimal::from(quantity),
            packing_unit: "UN".to_string(),
            packing_unit_to_stock_unit_conversion_factor: Decimal::ONE,
            serial_number_management_mode: mode,
            lot: None,
            location: None,
            license_plate_number: None,
            stock_site: None,
            serial_number: None,
        }
    }

    fn line(operation: u32, quantities: &[i64]) -> OperationLine {
        let mut line = OperationLine::new(StockId(1), operation, "P1");
        for q in quantities {
            line.stock_details
                .push(Allocation::new(Decimal::from(*q), "UN", Decimal::ONE));
        }
        line
    }

    #[test]
    fn test_other_operation_reduces_origin() {
        let mut calculator = ResidualQuantityCalculator::new();
        let lines = vec![line(0, &[4])];
        let residual = calculator.compute(
            &record(10, SerialNumberManagementMode::NotManaged),
            &lines,
            1,
        );
        assert_eq!(residual.origin_quantity, Decimal::from(6));
        assert_eq!(residual.consumed_by_other_operations, Decimal::from(4));
        assert_eq!(residual.remaining(), Decimal::from(6));
    }

    #[test]
    fn test_plain_stock_displays_running_total() {
        let mut calculator = ResidualQuantityCalculator::new();
        let lines = vec![line(0, &[2, 3])];
        let residual = calculator.compute(
            &record(10, SerialNumberManagementMode::NotManaged),
            &lines,
            0,
        );
        assert_eq!(residual.displayed, Decimal::from(5));
        assert_eq!(residual.remaining(), Decimal::from(5));
    }

    #[test]
    fn test_serial_stock_counts_down() {
        let mut calculator = ResidualQuantityCalculator::new();
        let lines = vec![line(0, &[2, 3])];
        let residual = calculator.compute(
            &record(10, SerialNumberManagementMode::GlobalReceivedIssued),
            &lines,
            0,
        );
        assert_eq!(residual.displayed, Decimal::from(5));

        let lines = vec![line(0, &[2])];
        let residual = calculator.compute(
            &record(10, SerialNumberManagementMode::GlobalReceivedIssued),
            &lines,
            0,
        );
        assert_eq!(residual.displayed, Decimal::from(8));
    }

    #[test]
    fn test_origin_is_memoized_until_invalidated() {
        let mut calculator = ResidualQuantityCalculator::new();
        let plain = record(10, SerialNumberManagementMode::NotManaged);
        calculator.compute(&plain, &[], 1);
        assert!(calculator.is_cached(StockId(1), 1));

        // A later read of the record does not move the cached origin
        let reread = record(3, SerialNumberManagementMode::NotManaged);
        let residual = calculator.compute(&reread, &[], 1);
        assert_eq!(residual.origin_quantity, Decimal::from(10));

        calculator.invalidate(StockId(1));
        assert!(!calculator.is_cached(StockId(1), 1));
        let residual = calculator.compute(&reread, &[], 1);
        assert_eq!(residual.origin_quantity, Decimal::from(3));
    }

    #[test]
    fn test_displayed_is_capped_and_never_negative() {
        let mut calculator = ResidualQuantityCalculator::new();
        let lines = vec![line(0, &[8]), line(1, &[5])];
        let residual = calculator.compute(
            &record(10, SerialNumberManagementMode::NotManaged),
            &lines,
            1,
        );
        assert_eq!(residual.origin_quantity, Decimal::from(2));
        assert_eq!(residual.displayed, Decimal::from(2));
        assert_eq!(residual.remaining(), Decimal::ZERO);
    }
}
