//! Error taxonomy of the stock wizards
//!
//! Every failure the core can produce maps to a stable upper-snake code the
//! screen layer turns into a localized message.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::serial::SerialRangeError;
use crate::types::StockId;

// ============================================================================
// Validation failures
// ============================================================================

/// A rejected selection or entry. Never mutates the document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Quantity must be positive")]
    QuantityNotPositive,

    #[error("Quantity {requested} exceeds the {available} still available on stock {stock_id}")]
    QuantityExceedsResidual {
        stock_id: StockId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Serial-managed quantity must be a whole number: {0}")]
    FractionalSerialQuantity(Decimal),

    #[error("Packing unit conversion factor must be positive")]
    InvalidConversionFactor,

    #[error("Mandatory destination field missing: {field}")]
    MissingDestinationField { field: &'static str },

    #[error(
        "License plate number {license_plate_number} only accepts product {expected}, got {found}"
    )]
    SingleProductViolation {
        license_plate_number: String,
        expected: String,
        found: String,
    },

    #[error("License plate number {license_plate_number} only accepts lot {expected}, got {found}")]
    SingleLotViolation {
        license_plate_number: String,
        expected: String,
        found: String,
    },

    #[error("Serial numbers of stock {stock_id} are not sequential")]
    NonSequentialStock { stock_id: StockId },

    #[error("Serial number missing on stock {stock_id}")]
    SerialNumberMissing { stock_id: StockId },

    #[error("Ending serial {entered} does not match {expected} for the entered quantity")]
    SerialRangeMismatch { entered: String, expected: String },

    #[error(
        "Serial range {start}-{end} overlaps the allocated range {existing_start}-{existing_end}"
    )]
    SerialRangeOverlap {
        start: String,
        end: String,
        existing_start: String,
        existing_end: String,
    },

    #[error("Invalid serial number: {0}")]
    InvalidSerial(#[from] SerialRangeError),

    #[error("Stock {stock_id} is not selected in the current operation")]
    LineNotSelected { stock_id: StockId },

    #[error("Lookup failed during validation: {0}")]
    Remote(String),
}

impl ValidationError {
    /// Stable code the UI maps to a localized message
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::QuantityNotPositive => "QUANTITY_NOT_POSITIVE",
            ValidationError::QuantityExceedsResidual { .. } => "QUANTITY_EXCEEDS_RESIDUAL",
            ValidationError::FractionalSerialQuantity(_) => "FRACTIONAL_SERIAL_QUANTITY",
            ValidationError::InvalidConversionFactor => "INVALID_CONVERSION_FACTOR",
            ValidationError::MissingDestinationField { .. } => "MISSING_DESTINATION_FIELD",
            ValidationError::SingleProductViolation { .. } => "SINGLE_PRODUCT_VIOLATION",
            ValidationError::SingleLotViolation { .. } => "SINGLE_LOT_VIOLATION",
            ValidationError::NonSequentialStock { .. } => "SERIAL_NOT_SEQUENTIAL",
            ValidationError::SerialNumberMissing { .. } => "SERIAL_NUMBER_MISSING",
            ValidationError::SerialRangeMismatch { .. } => "SERIAL_RANGE_MISMATCH",
            ValidationError::SerialRangeOverlap { .. } => "SERIAL_RANGE_OVERLAP",
            ValidationError::InvalidSerial(_) => "INVALID_SERIAL",
            ValidationError::LineNotSelected { .. } => "LINE_NOT_SELECTED",
            ValidationError::Remote(_) => "VALIDATION_LOOKUP_FAILED",
        }
    }
}

impl From<RemoteError> for ValidationError {
    fn from(err: RemoteError) -> Self {
        ValidationError::Remote(err.to_string())
    }
}

// ============================================================================
// Session staleness
// ============================================================================

/// Why a stored document was discarded on load
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    #[error("no document stored")]
    Missing,

    #[error("document belongs to user {found}, not {expected}")]
    ForeignUser { expected: String, found: String },

    #[error("document has no username")]
    MissingUsername,

    #[error("document has no {0} field")]
    MissingOperations(&'static str),

    #[error("document has no stock change lines")]
    MissingLines,

    #[error("stock {stock_id} appears twice in operation {line_number}")]
    DuplicateLine { stock_id: StockId, line_number: u32 },

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Failures of the session storage layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Stale session: {0}")]
    Stale(StaleReason),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Could not serialize document: {0}")]
    Serialization(String),

    #[error("A session needs a username")]
    MissingUsername,
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

// ============================================================================
// Remote service failures
// ============================================================================

/// Failure talking to the remote data service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote service unreachable: {0}")]
    Transport(String),

    #[error("Remote service returned errors: {0}")]
    Query(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

// ============================================================================
// Screen boundary taxonomy
// ============================================================================

/// Every failure surfaced to a wizard screen
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Transport(#[from] RemoteError),
}

impl WizardError {
    pub fn code(&self) -> &'static str {
        match self {
            WizardError::Validation(err) => err.code(),
            WizardError::Session(SessionError::Stale(_)) => "STALE_SESSION",
            WizardError::Session(SessionError::MissingUsername) => "MISSING_USERNAME",
            WizardError::Session(_) => "SESSION_STORAGE_ERROR",
            WizardError::Transport(_) => "TRANSPORT_ERROR",
        }
    }

    /// Whether the user may retry in place rather than discard the document
    ///
    /// Business rejections are not errors: they come back as
    /// `SubmissionOutcome::Rejected` with the document still stored.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WizardError::Transport(_))
    }
}

/// Result type alias for wizard operations
pub type WizardResult<T> = Result<T, WizardError>;
