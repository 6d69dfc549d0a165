//! The in-progress transaction of one wizard and its stored JSON shape

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::OperationLine;
use crate::error::StaleReason;
use crate::types::{LicensePlateNumberOperationMode, StockId, WizardKind};

/// Prefix of the keys echoing user selections needed to resume mid-wizard
pub const SELECTION_PREFIX: &str = "selected";

/// Header of the operation document, stored under the wizard's operations field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationHeader {
    #[serde(default)]
    pub id: String,
    pub stock_change_lines: Vec<OperationLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate_number_operation_mode: Option<LicensePlateNumberOperationMode>,
}

/// The whole in-progress transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub header: OperationHeader,
    pub username: String,
    /// Index into `header.stock_change_lines` of the active line
    pub current_line: Option<usize>,
    pub current_operation: u32,
    pub started: bool,
    /// `selected*` echoes, keyed by their full storage name
    pub selections: BTreeMap<String, Value>,
}

impl Document {
    /// Create an empty document for a user
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn lines(&self) -> &[OperationLine] {
        &self.header.stock_change_lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<OperationLine> {
        &mut self.header.stock_change_lines
    }

    /// Position of the `(stock_id, line_number)` line
    pub fn position(&self, stock_id: StockId, line_number: u32) -> Option<usize> {
        self.lines()
            .iter()
            .position(|line| line.is(stock_id, line_number))
    }

    pub fn find_line(&self, stock_id: StockId, line_number: u32) -> Option<&OperationLine> {
        self.lines().iter().find(|line| line.is(stock_id, line_number))
    }

    /// Lines of the current operation
    pub fn current_operation_lines(&self) -> impl Iterator<Item = &OperationLine> {
        let operation = self.current_operation;
        self.lines()
            .iter()
            .filter(move |line| line.line_number == operation)
    }

    /// The active line, if any
    pub fn current_line(&self) -> Option<&OperationLine> {
        self.current_line.and_then(|index| self.lines().get(index))
    }

    /// First `(stock_id, line_number)` pair appearing twice, if any
    pub fn duplicate_line(&self) -> Option<(StockId, u32)> {
        let mut seen = HashSet::new();
        self.lines()
            .iter()
            .map(|line| (line.stock_id, line.line_number))
            .find(|key| !seen.insert(*key))
    }

    // ========================================================================
    // Stored shape
    // ========================================================================

    /// Build the stored JSON value for a wizard
    ///
    /// `serde_json::Map` keeps keys ordered, so the same document always
    /// produces the same bytes.
    pub fn to_value(&self, kind: WizardKind) -> Result<Value, serde_json::Error> {
        let mut map = Map::new();
        map.insert(
            kind.operations_field().to_string(),
            serde_json::to_value(&self.header)?,
        );
        map.insert("username".to_string(), Value::String(self.username.clone()));
        map.insert(
            "currentLine".to_string(),
            serde_json::to_value(self.current_line)?,
        );
        map.insert(
            "currentOperation".to_string(),
            Value::from(self.current_operation),
        );
        map.insert("started".to_string(), Value::Bool(self.started));
        for (key, value) in &self.selections {
            map.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(map))
    }

    /// Parse a stored value, rejecting anything whose shape does not match
    pub fn from_value(kind: WizardKind, value: Value) -> Result<Self, StaleReason> {
        let Value::Object(mut map) = value else {
            return Err(StaleReason::Malformed("document is not an object".to_string()));
        };

        let username = match map.remove("username") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(StaleReason::MissingUsername),
        };

        let operations = map
            .remove(kind.operations_field())
            .ok_or(StaleReason::MissingOperations(kind.operations_field()))?;
        if operations.get("stockChangeLines").is_none() {
            return Err(StaleReason::MissingLines);
        }
        let header: OperationHeader = serde_json::from_value(operations)
            .map_err(|e| StaleReason::Malformed(e.to_string()))?;

        let current_line = match map.remove("currentLine") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<usize>(value)
                    .map_err(|e| StaleReason::Malformed(format!("currentLine: {e}")))?,
            ),
        };
        let current_operation = match map.remove("currentOperation") {
            None | Some(Value::Null) => 0,
            Some(value) => serde_json::from_value::<u32>(value)
                .map_err(|e| StaleReason::Malformed(format!("currentOperation: {e}")))?,
        };
        let started = matches!(map.remove("started"), Some(Value::Bool(true)));

        let selections = map
            .into_iter()
            .filter(|(key, _)| key.starts_with(SELECTION_PREFIX))
            .collect();

        let document = Self {
            header,
            username,
            current_line,
            current_operation,
            started,
            selections,
        };

        if let Some((stock_id, line_number)) = document.duplicate_line() {
            return Err(StaleReason::DuplicateLine {
                stock_id,
                line_number,
            });
        }
        if document
            .current_line
            .is_some_and(|index| index >= document.lines().len())
        {
            return Err(StaleReason::Malformed(
                "currentLine points past the last line".to_string(),
            ));
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Allocation;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn sample() -> Document {
        let mut document = Document::new("alice");
        let mut line = OperationLine::new(StockId(10), 0, "P1");
        line.stock_details
            .push(Allocation::new(Decimal::from(4), "UN", Decimal::ONE));
        document.header.stock_change_lines.push(line);
        document.current_line = Some(0);
        document.started = true;
        document
            .selections
            .insert("selectedLocation".to_string(), json!("A-01"));
        document
    }

    #[test]
    fn test_stored_shape_uses_operations_field() {
        let value = sample().to_value(WizardKind::StockChange).unwrap();
        assert!(value.get("stockChange").is_some());
        assert!(value["stockChange"]["stockChangeLines"].is_array());
        assert_eq!(value["username"], "alice");
        assert_eq!(value["selectedLocation"], "A-01");
    }

    #[test]
    fn test_value_restores_document() {
        let document = sample();
        let value = document.to_value(WizardKind::LpnGrouping).unwrap();
        let restored = Document::from_value(WizardKind::LpnGrouping, value).unwrap();
        assert_eq!(restored, document);
    }

    #[test]
    fn test_missing_lines_is_stale() {
        let value = json!({ "username": "alice", "stockChange": { "id": "" } });
        assert_eq!(
            Document::from_value(WizardKind::StockChange, value),
            Err(StaleReason::MissingLines)
        );
    }

    #[test]
    fn test_other_wizard_blob_is_stale() {
        let value = sample().to_value(WizardKind::StockChange).unwrap();
        assert_eq!(
            Document::from_value(WizardKind::MiscellaneousReceipt, value),
            Err(StaleReason::MissingOperations("miscellaneousReceipt"))
        );
    }

    #[test]
    fn test_duplicate_lines_are_rejected() {
        let mut document = sample();
        let line = document.lines()[0].clone();
        document.header.stock_change_lines.push(line);
        let value = document.to_value(WizardKind::StockChange).unwrap();
        assert_eq!(
            Document::from_value(WizardKind::StockChange, value),
            Err(StaleReason::DuplicateLine {
                stock_id: StockId(10),
                line_number: 0
            })
        );
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let mut value = sample().to_value(WizardKind::StockChange).unwrap();
        value["somethingElse"] = json!(1);
        let restored = Document::from_value(WizardKind::StockChange, value).unwrap();
        assert_eq!(restored.selections.len(), 1);
    }
}
