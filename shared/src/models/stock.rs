//! Read-only master data records served by the remote service

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LicensePlateNumberStatus, SerialNumberManagementMode, StockId};

/// Snapshot of a stock record as read from the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub stock_id: StockId,
    pub product: String,
    pub quantity_in_packing_unit: Decimal,
    pub packing_unit: String,
    #[serde(default = "one")]
    pub packing_unit_to_stock_unit_conversion_factor: Decimal,
    #[serde(default)]
    pub serial_number_management_mode: SerialNumberManagementMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

fn one() -> Decimal {
    Decimal::ONE
}

impl StockRecord {
    pub fn is_serial_tracked(&self) -> bool {
        self.serial_number_management_mode.tracks_ranges()
    }
}

/// Filter for stock queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Only records whose product differs from this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_not: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_not: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl StockFilter {
    pub fn on_license_plate_number(code: impl Into<String>) -> Self {
        Self {
            license_plate_number: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn excluding_product(mut self, product: impl Into<String>) -> Self {
        self.product_not = Some(product.into());
        self
    }

    pub fn excluding_lot(mut self, lot: impl Into<String>) -> Self {
        self.lot_not = Some(lot.into());
        self
    }

    /// Whether a record satisfies this filter
    pub fn matches(&self, record: &StockRecord) -> bool {
        fn eq(wanted: &Option<String>, actual: Option<&str>) -> bool {
            wanted.as_deref().map_or(true, |w| actual == Some(w))
        }
        fn ne(excluded: &Option<String>, actual: Option<&str>) -> bool {
            excluded.as_deref().map_or(true, |x| actual != Some(x))
        }

        eq(&self.stock_site, record.stock_site.as_deref())
            && eq(&self.product, Some(record.product.as_str()))
            && ne(&self.product_not, Some(record.product.as_str()))
            && ne(&self.lot_not, record.lot.as_deref())
            && eq(
                &self.license_plate_number,
                record.license_plate_number.as_deref(),
            )
            && eq(&self.location, record.location.as_deref())
    }
}

/// Which end of a stock record's serial numbers to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialOffset {
    /// First serial of the record (`+1`)
    First,
    /// Last serial of the record (`-1`)
    Last,
}

impl SerialOffset {
    pub fn signed(&self) -> i32 {
        match self {
            SerialOffset::First => 1,
            SerialOffset::Last => -1,
        }
    }
}

/// A serial number master record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialNumber {
    pub code: String,
}

/// A license plate number master record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePlateNumber {
    pub code: String,
    #[serde(default)]
    pub is_single_product: bool,
    #[serde(default)]
    pub is_single_lot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub status: LicensePlateNumberStatus,
}

/// A packing unit of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingUnit {
    pub code: String,
    pub packing_unit_to_stock_unit_conversion_factor: Decimal,
}

/// Product settings at a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSite {
    pub product: String,
    #[serde(default)]
    pub serial_number_management_mode: SerialNumberManagementMode,
    #[serde(default)]
    pub is_lot_managed: bool,
    #[serde(default)]
    pub packing_units: Vec<PackingUnit>,
    pub stock_unit: String,
}

impl ProductSite {
    /// Conversion factor of a packing unit; the stock unit converts at 1
    pub fn conversion_factor(&self, packing_unit: &str) -> Option<Decimal> {
        if packing_unit == self.stock_unit {
            return Some(Decimal::ONE);
        }
        self.packing_units
            .iter()
            .find(|unit| unit.code == packing_unit)
            .map(|unit| unit.packing_unit_to_stock_unit_conversion_factor)
    }
}
