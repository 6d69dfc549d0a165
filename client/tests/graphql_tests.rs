//! GraphQL client tests
//!
//! Tests for response decoding and configuration including:
//! - Query data and error envelopes
//! - Submission diagnoses and created ids
//! - Error mapping onto the remote service taxonomy

use rust_decimal::Decimal;
use serde::Deserialize;
use stock_wizard_client::*;
use stock_wizard_shared::{
    RemoteError, SerialNumberManagementMode, StockRecord, SubmissionOutcome, WizardKind,
};

// ============================================================================
// Query decoding
// ============================================================================

#[cfg(test)]
mod decode_tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct StockData {
        stock: Vec<StockRecord>,
    }

    #[test]
    fn test_decode_stock_records() {
        let body = r#"{
            "data": {
                "stock": [{
                    "stockId": "42",
                    "product": "P1",
                    "quantityInPackingUnit": "12.5",
                    "packingUnit": "KG",
                    "serialNumberManagementMode": "globalReceivedIssued",
                    "lot": "LOT7",
                    "serialNumber": "SN0001"
                }]
            }
        }"#;

        let data: StockData = decode_response(body).unwrap();
        let record = &data.stock[0];
        assert_eq!(record.stock_id.value(), 42);
        assert_eq!(record.quantity_in_packing_unit, Decimal::new(125, 1));
        assert_eq!(record.packing_unit_to_stock_unit_conversion_factor, Decimal::ONE);
        assert_eq!(
            record.serial_number_management_mode,
            SerialNumberManagementMode::GlobalReceivedIssued
        );
        assert!(record.is_serial_tracked());
    }

    #[test]
    fn test_decode_graphql_errors() {
        let body = r#"{
            "data": null,
            "errors": [{ "message": "Unknown product", "path": ["stock", 0, "product"] }]
        }"#;

        let err = decode_response::<StockData>(body).unwrap_err();
        match &err {
            ClientError::GraphQl(errors) => {
                assert_eq!(errors[0].message, "Unknown product");
                assert_eq!(errors[0].path, vec!["stock", "0", "product"]);
            }
            other => panic!("expected GraphQL errors, got {other:?}"),
        }
        assert!(matches!(RemoteError::from(err), RemoteError::Query(_)));
    }

    #[test]
    fn test_decode_missing_data() {
        let err = decode_response::<StockData>(r#"{ "data": null }"#).unwrap_err();
        assert!(matches!(err, ClientError::MissingData));
    }

    #[test]
    fn test_decode_malformed_body() {
        let err = decode_response::<StockData>("<html>").unwrap_err();
        assert!(matches!(RemoteError::from(err), RemoteError::Decode(_)));
    }
}

// ============================================================================
// Submission decoding
// ============================================================================

#[cfg(test)]
mod submission_tests {
    use super::*;

    #[test]
    fn test_created_with_warning() {
        let body = r#"{
            "data": { "stockChange": { "create": { "id": "SCH0042" } } },
            "extensions": { "diagnoses": [{ "severity": 2, "message": "Lot expires soon" }] }
        }"#;

        let response = decode_submission(WizardKind::StockChange, body).unwrap();
        assert_eq!(response.id.as_deref(), Some("SCH0042"));

        match SubmissionOutcome::from(response) {
            SubmissionOutcome::Created { id, warnings } => {
                assert_eq!(id, "SCH0042");
                assert_eq!(warnings[0].message, "Lot expires soon");
            }
            other => panic!("expected creation, got {other:?}"),
        }
    }

    #[test]
    fn test_business_errors_are_diagnoses() {
        let body = r#"{
            "data": { "lpnOperations": null },
            "errors": [
                {
                    "message": "Creation failed",
                    "extensions": { "diagnoses": [
                        { "severity": 3, "message": "Location A1 is blocked" },
                        { "severity": 1, "message": "Stock reserved" }
                    ] }
                },
                { "message": "Internal rule error" }
            ]
        }"#;

        let response = decode_submission(WizardKind::LpnSplitting, body).unwrap();
        assert_eq!(response.id, None);
        assert_eq!(response.diagnoses.len(), 3);
        assert_eq!(response.diagnoses[2].severity, 4);
        assert!(!SubmissionOutcome::from(response).is_created());
    }

    #[test]
    fn test_numeric_id() {
        let body = r#"{ "data": { "miscellaneousReceipt": { "create": { "id": 17 } } } }"#;
        let response = decode_submission(WizardKind::MiscellaneousReceipt, body).unwrap();
        assert_eq!(response.id.as_deref(), Some("17"));
    }

    #[test]
    fn test_empty_answer_is_an_error() {
        let err = decode_submission(WizardKind::StockChange, r#"{ "data": {} }"#).unwrap_err();
        assert!(matches!(err, ClientError::MissingData));
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;

    fn build(endpoint: &str, username: &str) -> Result<ClientConfig, ClientError> {
        let config = ::config::Config::builder()
            .set_default("environment", "test")?
            .set_default("remote.endpoint", endpoint)?
            .set_default("remote.timeout_secs", 30)?
            .set_default("session.site", "FR011")?
            .set_default("session.username", username)?
            .build()?;
        ClientConfig::from_config(config)
    }

    #[test]
    fn test_valid_config() {
        let config = build("https://x3.example.com/api", "alice").unwrap();
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.api_token, None);
        assert!(!config.is_production());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = build("not a url", "alice").unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_username_rejected() {
        let err = build("https://x3.example.com/api", "").unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = build("https://x3.example.com/api", "alice").unwrap();
        let remote = GraphQlRemote::new(&config.remote, WizardKind::LpnGrouping).unwrap();
        assert_eq!(remote.kind(), WizardKind::LpnGrouping);
    }
}
