//! WebAssembly bindings for the stock wizards
//!
//! Provides client-side access to:
//! - Serial number range computations
//! - A `WizardSession` driving one wizard's document, persisted in
//!   `window.sessionStorage`
//!
//! Errors surface as JavaScript `Error`s whose `name` is the stable error code.

use serde::de::DeserializeOwned;
use stock_wizard_shared::{
    check_single_lot_in_lines, check_single_product_in_lines, committed_serial_ranges, serial,
    Allocation, LicensePlateNumber, LoadOutcome, SessionError, StockId, StockRecord,
    TransactionBuilder, ValidationError, WizardError, WizardKind,
};
use wasm_bindgen::prelude::*;

mod storage;

pub use storage::BrowserSessionStore;

fn js_error(code: &str, message: &str) -> JsValue {
    let error = js_sys::Error::new(message);
    error.set_name(code);
    error.into()
}

fn wizard_error(err: impl Into<WizardError>) -> JsValue {
    let err = err.into();
    js_error(err.code(), &err.to_string())
}

fn parse_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json)
        .map_err(|e| js_error("INVALID_INPUT", &format!("Invalid {} JSON: {}", what, e)))
}

/// Wizard from its storage key (`mobile-lpnGrouping`) or name (`lpnGrouping`)
pub fn parse_wizard_kind(name: &str) -> Option<WizardKind> {
    WizardKind::from_storage_key(name)
        .or_else(|| serde_json::from_value(serde_json::Value::String(name.to_string())).ok())
}

pub fn parse_stock_id(id: &str) -> Option<StockId> {
    id.trim().parse::<i64>().ok().map(StockId)
}

// ============================================================================
// Serial numbers
// ============================================================================

/// Last serial of the range of `quantity` units starting at `start`
#[wasm_bindgen(js_name = computeEndingSerial)]
pub fn compute_ending_serial(start: &str, quantity: u32) -> Result<String, JsValue> {
    serial::compute_ending_serial(start, u64::from(quantity))
        .map_err(|e| wizard_error(ValidationError::from(e)))
}

#[wasm_bindgen(js_name = serialRangesOverlap)]
pub fn serial_ranges_overlap(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    serial::ranges_overlap(a_start, a_end, b_start, b_end)
}

#[wasm_bindgen(js_name = isSequential)]
pub fn is_sequential(first: &str, last: &str, quantity: u32) -> bool {
    serial::is_sequential(first, last, u64::from(quantity))
}

// ============================================================================
// Wizard session
// ============================================================================

/// One wizard's in-progress document
#[wasm_bindgen]
pub struct WizardSession {
    builder: TransactionBuilder<BrowserSessionStore>,
    outcome: LoadOutcome,
}

#[wasm_bindgen]
impl WizardSession {
    /// Resume the stored document of a wizard for `username`, or start a new one
    #[wasm_bindgen(constructor)]
    pub fn open(kind: &str, username: &str) -> Result<WizardSession, JsValue> {
        let kind = parse_wizard_kind(kind)
            .ok_or_else(|| js_error("UNKNOWN_WIZARD", &format!("Unknown wizard {}", kind)))?;
        let store = BrowserSessionStore::from_window().map_err(wizard_error)?;
        let (builder, outcome) =
            TransactionBuilder::open(store, kind, username).map_err(wizard_error)?;
        tracing::debug!("Opened {} session: {:?}", kind, outcome);
        Ok(Self { builder, outcome })
    }

    #[wasm_bindgen(getter)]
    pub fn resumed(&self) -> bool {
        self.outcome == LoadOutcome::Resumed
    }

    /// Why the stored document was discarded on open, if it was
    #[wasm_bindgen(getter, js_name = staleReason)]
    pub fn stale_reason(&self) -> Option<String> {
        match &self.outcome {
            LoadOutcome::Reinitialized(reason) => Some(reason.to_string()),
            _ => None,
        }
    }

    #[wasm_bindgen(getter, js_name = currentOperation)]
    pub fn current_operation(&self) -> u32 {
        self.builder.current_operation()
    }

    /// The document in its stored shape
    #[wasm_bindgen(js_name = documentJson)]
    pub fn document_json(&self) -> Result<String, JsValue> {
        self.builder
            .document()
            .to_value(self.builder.kind())
            .map(|value| value.to_string())
            .map_err(|e| wizard_error(SessionError::from(e)))
    }

    /// Residual of a stock record for the current operation
    pub fn residual(&mut self, record_json: &str) -> Result<String, JsValue> {
        let record: StockRecord = parse_json("stock record", record_json)?;
        let residual = self.builder.residual(&record);
        let value = serde_json::json!({
            "originQuantity": residual.origin_quantity,
            "consumedByOtherOperations": residual.consumed_by_other_operations,
            "allocatedInCurrentOperation": residual.allocated_in_current_operation,
            "displayed": residual.displayed,
            "remaining": residual.remaining(),
        });
        Ok(value.to_string())
    }

    /// In-memory single-product and single-lot checks against a destination
    #[wasm_bindgen(js_name = checkDestination)]
    pub fn check_destination(&self, lpn_json: &str, record_json: &str) -> Result<(), JsValue> {
        let destination: LicensePlateNumber = parse_json("license plate number", lpn_json)?;
        let record: StockRecord = parse_json("stock record", record_json)?;
        let document = self.builder.document();

        check_single_product_in_lines(&destination, document, &record.product)
            .map_err(wizard_error)?;
        if let Some(lot) = record.lot.as_deref() {
            check_single_lot_in_lines(&destination, document, lot).map_err(wizard_error)?;
        }
        Ok(())
    }

    /// Select a stock row; returns the index of its line
    pub fn select(&mut self, record_json: &str) -> Result<usize, JsValue> {
        let record: StockRecord = parse_json("stock record", record_json)?;
        self.builder.select_record(&record).map_err(wizard_error)
    }

    #[wasm_bindgen(js_name = addAllocation)]
    pub fn add_allocation(
        &mut self,
        record_json: &str,
        allocation_json: &str,
        lot_managed: bool,
    ) -> Result<(), JsValue> {
        let record: StockRecord = parse_json("stock record", record_json)?;
        let allocation: Allocation = parse_json("allocation", allocation_json)?;
        self.builder
            .add_allocation(&record, allocation, lot_managed)
            .map_err(wizard_error)
    }

    /// Allocate the typed serial range `start..=end`; returns its ending serial
    #[wasm_bindgen(js_name = addSerialRange)]
    pub fn add_serial_range(
        &mut self,
        record_json: &str,
        start: &str,
        end: &str,
        allocation_json: &str,
        lot_managed: bool,
    ) -> Result<String, JsValue> {
        let record: StockRecord = parse_json("stock record", record_json)?;
        let allocation: Allocation = parse_json("allocation", allocation_json)?;
        self.builder
            .add_serial_range(&record, start, end, allocation, lot_managed)
            .map(|range| range.end)
            .map_err(wizard_error)
    }

    pub fn unselect(&mut self, stock_id: &str) -> Result<bool, JsValue> {
        let stock_id = stock_id_arg(stock_id)?;
        self.builder.unselect(stock_id).map_err(wizard_error)
    }

    /// Delete the allocation at `position` of line `(stock_id, line_number)`
    #[wasm_bindgen(js_name = deleteAllocation)]
    pub fn delete_allocation(
        &mut self,
        stock_id: &str,
        line_number: u32,
        position: usize,
    ) -> Result<bool, JsValue> {
        let stock_id = stock_id_arg(stock_id)?;
        let mut seen = 0;
        let removed = self
            .builder
            .delete_allocation(stock_id, line_number, |_| {
                seen += 1;
                seen == position + 1
            })
            .map_err(wizard_error)?;
        Ok(removed.is_some())
    }

    #[wasm_bindgen(js_name = advanceOperation)]
    pub fn advance_operation(&mut self) -> Result<u32, JsValue> {
        self.builder.advance_operation().map_err(wizard_error)
    }

    #[wasm_bindgen(js_name = revertLast)]
    pub fn revert_last(&mut self) -> Result<bool, JsValue> {
        self.builder.revert_last().map_err(wizard_error)
    }

    #[wasm_bindgen(js_name = rememberSelection)]
    pub fn remember_selection(&mut self, name: &str, value_json: &str) -> Result<(), JsValue> {
        let value: serde_json::Value = parse_json("selection", value_json)?;
        self.builder
            .remember_selection(name, value)
            .map_err(wizard_error)
    }

    #[wasm_bindgen(js_name = forgetSelection)]
    pub fn forget_selection(&mut self, name: &str) -> Result<(), JsValue> {
        self.builder.forget_selection(name).map_err(wizard_error)
    }

    /// First starting serial of `wanted` units on a record whose serials start
    /// at `first`, skipping ranges already taken for the product
    #[wasm_bindgen(js_name = nextFreeSerial)]
    pub fn next_free_serial(
        &self,
        product: &str,
        first: &str,
        available: u32,
        wanted: u32,
    ) -> Option<String> {
        let taken = committed_serial_ranges(self.builder.document(), product);
        serial::next_free_serial_start(first, u64::from(available), u64::from(wanted), &taken)
    }

    /// Re-save the document; returns the stored JSON
    pub fn reconcile(&mut self) -> Result<String, JsValue> {
        self.builder.reconcile().map_err(wizard_error)
    }

    /// Submission payload of the document
    #[wasm_bindgen(js_name = flattenJson)]
    pub fn flatten_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.builder.flatten())
            .map_err(|e| wizard_error(SessionError::from(e)))
    }

    /// Drop the stored document (cancel, or after a created submission)
    pub fn discard(&mut self) -> Result<(), JsValue> {
        self.builder.discard().map_err(wizard_error)
    }
}

fn stock_id_arg(id: &str) -> Result<StockId, JsValue> {
    parse_stock_id(id)
        .ok_or_else(|| js_error("INVALID_INPUT", &format!("Invalid stock id {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wizard_kind() {
        assert_eq!(
            parse_wizard_kind("mobile-lpnGrouping"),
            Some(WizardKind::LpnGrouping)
        );
        assert_eq!(
            parse_wizard_kind("miscellaneousReceipt"),
            Some(WizardKind::MiscellaneousReceipt)
        );
        assert_eq!(parse_wizard_kind("mobile-unknown"), None);
    }

    #[test]
    fn test_parse_stock_id() {
        assert_eq!(parse_stock_id(" 42 "), Some(StockId(42)));
        assert_eq!(parse_stock_id("4x"), None);
    }

    #[test]
    fn test_serial_bindings() {
        assert_eq!(compute_ending_serial("SN0001", 5).unwrap(), "SN0005");
        assert!(serial_ranges_overlap("SN0001", "SN0005", "SN0004", "SN0008"));
        assert!(!serial_ranges_overlap("SN0001", "SN0005", "XY0001", "XY0005"));
        assert!(is_sequential("A0098", "A0102", 5));
    }
}
