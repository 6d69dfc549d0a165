//! GraphQL documents sent to the remote data service

use stock_wizard_shared::WizardKind;

// =============================================================================
// Read queries
// =============================================================================

/// Stock records matching a filter
pub const READ_STOCK: &str = r"
    query ReadStock($filter: StockFilter!) {
        stock(filter: $filter) {
            stockId
            product
            quantityInPackingUnit
            packingUnit
            packingUnitToStockUnitConversionFactor
            serialNumberManagementMode
            lot
            location
            licensePlateNumber
            stockSite
            serialNumber
        }
    }
";

/// First (`offset: 1`) or last (`offset: -1`) serial of a stock record
pub const READ_SERIAL_NUMBER: &str = r"
    query ReadSerialNumber($product: String!, $stockId: ID!, $offset: Int!) {
        serialNumber(product: $product, stockId: $stockId, offset: $offset) {
            code
        }
    }
";

pub const READ_LICENSE_PLATE_NUMBER: &str = r"
    query ReadLicensePlateNumber($code: String!) {
        licensePlateNumber(code: $code) {
            code
            isSingleProduct
            isSingleLot
            location
            status
        }
    }
";

pub const READ_PRODUCT_SITE: &str = r"
    query ReadProductSite($product: String!, $site: String!) {
        productSite(product: $product, site: $site) {
            product
            serialNumberManagementMode
            isLotManaged
            stockUnit
            packingUnits {
                code
                packingUnitToStockUnitConversionFactor
            }
        }
    }
";

// =============================================================================
// Mutations
// =============================================================================

/// Creation mutation of the document a wizard produces
///
/// The created id comes back under `data.<operationsField>.create.id`.
pub fn create_mutation(kind: WizardKind) -> String {
    format!(
        r"
    mutation Create($data: JSON!) {{
        {field} {{
            create(data: $data) {{
                id
            }}
        }}
    }}
",
        field = kind.operations_field()
    )
}
