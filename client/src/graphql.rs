//! GraphQL implementation of the remote data service
//!
//! Reads stock, serial number, license plate number and product site records
//! and submits finished documents over a single GraphQL endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use stock_wizard_shared::{
    Diagnosis, LicensePlateNumber, ProductSite, RemoteDataService, RemoteError, SerialNumber,
    SerialOffset, StockFilter, StockId, StockRecord, SubmissionPayload, SubmissionResponse,
    WizardKind,
};
use tracing::instrument;

use crate::config::RemoteConfig;
use crate::error::{ClientError, GraphQlError};
use crate::queries;

/// Severity given to a GraphQL error that carries no diagnosis of its own
const UNQUALIFIED_ERROR_SEVERITY: u8 = 4;

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorResponse>,
    #[serde(default)]
    extensions: Option<Extensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<Value>,
    #[serde(default)]
    extensions: Option<Extensions>,
}

#[derive(Debug, Default, Deserialize)]
struct Extensions {
    #[serde(default)]
    diagnoses: Vec<Diagnosis>,
}

impl From<GraphQlErrorResponse> for GraphQlError {
    fn from(error: GraphQlErrorResponse) -> Self {
        GraphQlError {
            message: error.message,
            path: error
                .path
                .into_iter()
                .map(|segment| match segment {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StockData {
    stock: Vec<StockRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerialNumberData {
    serial_number: Option<SerialNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LicensePlateNumberData {
    license_plate_number: Option<LicensePlateNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductSiteData {
    product_site: Option<ProductSite>,
}

/// Decode the body of a query response, failing on any GraphQL error
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    let response: GraphQlResponse<T> = serde_json::from_str(body)?;
    if !response.errors.is_empty() {
        return Err(ClientError::GraphQl(
            response.errors.into_iter().map(GraphQlError::from).collect(),
        ));
    }
    response.data.ok_or(ClientError::MissingData)
}

/// Decode the body of a creation mutation
///
/// Business rule violations come back as GraphQL errors; they are returned as
/// diagnoses rather than failures so the caller can tell them apart from
/// transport problems.
pub fn decode_submission(kind: WizardKind, body: &str) -> Result<SubmissionResponse, ClientError> {
    let response: GraphQlResponse<Value> = serde_json::from_str(body)?;

    let mut diagnoses = response.extensions.unwrap_or_default().diagnoses;
    for error in response.errors {
        match error.extensions {
            Some(extensions) if !extensions.diagnoses.is_empty() => {
                diagnoses.extend(extensions.diagnoses)
            }
            _ => diagnoses.push(Diagnosis {
                severity: UNQUALIFIED_ERROR_SEVERITY,
                message: error.message,
            }),
        }
    }

    let pointer = format!("/{}/create/id", kind.operations_field());
    let id = response
        .data
        .as_ref()
        .and_then(|data| data.pointer(&pointer))
        .and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    if id.is_none() && diagnoses.is_empty() {
        return Err(ClientError::MissingData);
    }
    Ok(SubmissionResponse { id, diagnoses })
}

/// Remote data service client for one wizard
#[derive(Debug, Clone)]
pub struct GraphQlRemote {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    kind: WizardKind,
}

impl GraphQlRemote {
    /// Create a client submitting documents of `kind`
    pub fn new(config: &RemoteConfig, kind: WizardKind) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            kind,
        })
    }

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Post a GraphQL document and return the raw response body
    async fn post(&self, query: &str, variables: Value) -> Result<String, ClientError> {
        let body = json!({
            "query": query,
            "variables": variables,
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Execute a query and decode its data
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, ClientError> {
        let body = self.post(query, variables).await?;
        decode_response(&body)
    }
}

#[async_trait(?Send)]
impl RemoteDataService for GraphQlRemote {
    #[instrument(skip(self))]
    async fn read_stock(&self, filter: &StockFilter) -> Result<Vec<StockRecord>, RemoteError> {
        let data: StockData = self
            .execute(queries::READ_STOCK, json!({ "filter": filter }))
            .await?;
        tracing::debug!("Read {} stock records", data.stock.len());
        Ok(data.stock)
    }

    #[instrument(skip(self))]
    async fn read_serial_number(
        &self,
        product: &str,
        stock_id: StockId,
        offset: SerialOffset,
    ) -> Result<Option<SerialNumber>, RemoteError> {
        let variables = json!({
            "product": product,
            "stockId": stock_id.to_string(),
            "offset": offset.signed(),
        });
        let data: SerialNumberData = self
            .execute(queries::READ_SERIAL_NUMBER, variables)
            .await?;
        Ok(data.serial_number)
    }

    #[instrument(skip(self))]
    async fn read_license_plate_number(
        &self,
        code: &str,
    ) -> Result<LicensePlateNumber, RemoteError> {
        let data: LicensePlateNumberData = self
            .execute(queries::READ_LICENSE_PLATE_NUMBER, json!({ "code": code }))
            .await?;
        data.license_plate_number
            .ok_or_else(|| ClientError::NotFound(format!("license plate number {code}")).into())
    }

    #[instrument(skip(self))]
    async fn read_product_site(
        &self,
        product: &str,
        site: &str,
    ) -> Result<ProductSite, RemoteError> {
        let data: ProductSiteData = self
            .execute(
                queries::READ_PRODUCT_SITE,
                json!({ "product": product, "site": site }),
            )
            .await?;
        data.product_site.ok_or_else(|| {
            ClientError::NotFound(format!("product {product} at site {site}")).into()
        })
    }

    #[instrument(
        skip(self, payload),
        fields(kind = %self.kind, lines = payload.stock_change_lines.len())
    )]
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionResponse, RemoteError> {
        let mutation = queries::create_mutation(self.kind);
        let data = serde_json::to_value(payload).map_err(ClientError::from)?;
        let body = self.post(&mutation, json!({ "data": data })).await?;
        let response = decode_submission(self.kind, &body)?;
        tracing::info!(
            "Submission answered with id {:?} and {} diagnoses",
            response.id,
            response.diagnoses.len()
        );
        Ok(response)
    }
}
