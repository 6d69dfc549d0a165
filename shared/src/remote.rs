//! Remote master data service consumed by the wizards

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{
    LicensePlateNumber, ProductSite, SerialNumber, SerialOffset, StockFilter, StockRecord,
    SubmissionPayload, SubmissionResponse,
};
use crate::types::StockId;

/// Read/query/mutate access to stock, serial number, license plate number and
/// product master records.
///
/// Calls are awaited from the UI event loop one at a time, so implementations
/// need not be `Send`.
#[async_trait(?Send)]
pub trait RemoteDataService {
    /// Stock records matching a filter
    async fn read_stock(&self, filter: &StockFilter) -> Result<Vec<StockRecord>, RemoteError>;

    /// First or last serial number of a stock record
    async fn read_serial_number(
        &self,
        product: &str,
        stock_id: StockId,
        offset: SerialOffset,
    ) -> Result<Option<SerialNumber>, RemoteError>;

    async fn read_license_plate_number(
        &self,
        code: &str,
    ) -> Result<LicensePlateNumber, RemoteError>;

    async fn read_product_site(
        &self,
        product: &str,
        site: &str,
    ) -> Result<ProductSite, RemoteError>;

    /// Submit a flattened operation document
    async fn submit(&self, payload: &SubmissionPayload)
        -> Result<SubmissionResponse, RemoteError>;
}
