//! Allocation: one quantity chunk taken from a stock record

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::serial::{compute_ending_serial, SerialRangeError};

/// A quantity carved out of a stock record for one operation line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub quantity_in_packing_unit: Decimal,
    pub packing_unit: String,
    pub packing_unit_to_stock_unit_conversion_factor: Decimal,
    /// Always `quantity_in_packing_unit * packing_unit_to_stock_unit_conversion_factor`
    #[serde(default)]
    pub quantity_in_stock_unit: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    /// Starting serial of a contiguous range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate_number: Option<String>,
}

impl Allocation {
    /// Create an allocation, deriving the stock unit quantity
    pub fn new(
        quantity_in_packing_unit: Decimal,
        packing_unit: impl Into<String>,
        conversion_factor: Decimal,
    ) -> Self {
        Self {
            quantity_in_packing_unit,
            packing_unit: packing_unit.into(),
            packing_unit_to_stock_unit_conversion_factor: conversion_factor,
            quantity_in_stock_unit: quantity_in_packing_unit * conversion_factor,
            lot: None,
            serial_number: None,
            location: None,
            license_plate_number: None,
        }
    }

    pub fn with_lot(mut self, lot: impl Into<String>) -> Self {
        self.lot = Some(lot.into());
        self
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_license_plate_number(mut self, lpn: impl Into<String>) -> Self {
        self.license_plate_number = Some(lpn.into());
        self
    }

    /// Recompute the stock unit quantity after the packing quantity changed
    pub fn recompute_stock_quantity(&mut self) {
        self.quantity_in_stock_unit =
            self.quantity_in_packing_unit * self.packing_unit_to_stock_unit_conversion_factor;
    }

    /// Starting serial, ignoring blank values
    pub fn starting_serial(&self) -> Option<&str> {
        self.serial_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The `[start, end]` serial range this allocation implies, if it carries one
    pub fn serial_range(&self) -> Option<Result<(String, String), SerialRangeError>> {
        let start = self.starting_serial()?;
        let quantity = match serial_quantity(self.quantity_in_packing_unit) {
            Some(q) => q,
            None => return Some(Err(SerialRangeError::InvalidQuantity)),
        };
        Some(compute_ending_serial(start, quantity).map(|end| (start.to_string(), end)))
    }
}

/// Convert a decimal quantity to a serial unit count
///
/// Serialized stock is counted in whole units: fractional or non-positive
/// quantities yield `None`.
pub fn serial_quantity(quantity: Decimal) -> Option<u64> {
    if quantity <= Decimal::ZERO || quantity.fract() != Decimal::ZERO {
        return None;
    }
    u64::try_from(quantity.trunc()).ok()
}
