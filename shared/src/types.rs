//! Common types used across the stock wizards

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a stock record
///
/// The remote service echoes stock ids as either JSON numbers or numeric
/// strings; both deserialize to the same value and compare numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StockId(pub i64);

impl StockId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for StockId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for StockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for StockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for StockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(StockId(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(StockId)
                .map_err(|_| de::Error::custom(format!("stock id is not numeric: {s:?}"))),
        }
    }
}

/// The wizards sharing the stock operation line builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardKind {
    LpnOperations,
    LpnGrouping,
    LpnSplitting,
    LpnUnlinking,
    MiscellaneousReceipt,
    StockChange,
}

impl WizardKind {
    pub const ALL: [WizardKind; 6] = [
        WizardKind::LpnOperations,
        WizardKind::LpnGrouping,
        WizardKind::LpnSplitting,
        WizardKind::LpnUnlinking,
        WizardKind::MiscellaneousReceipt,
        WizardKind::StockChange,
    ];

    /// Fixed session storage key holding this wizard's in-progress document
    pub fn storage_key(&self) -> &'static str {
        match self {
            WizardKind::LpnOperations => "mobile-lpnOperations",
            WizardKind::LpnGrouping => "mobile-lpnGrouping",
            WizardKind::LpnSplitting => "mobile-lpnSplitting",
            WizardKind::LpnUnlinking => "mobile-lpnUnlinking",
            WizardKind::MiscellaneousReceipt => "mobile-miscellaneousReceipt",
            WizardKind::StockChange => "mobile-stockChange",
        }
    }

    /// Name of the field wrapping the operation header inside the stored blob
    pub fn operations_field(&self) -> &'static str {
        match self {
            WizardKind::LpnOperations
            | WizardKind::LpnGrouping
            | WizardKind::LpnSplitting
            | WizardKind::LpnUnlinking => "lpnOperations",
            WizardKind::MiscellaneousReceipt => "miscellaneousReceipt",
            WizardKind::StockChange => "stockChange",
        }
    }

    /// Destination fields every allocation of this wizard must carry
    pub fn destination_requirements(&self) -> DestinationRequirements {
        match self {
            WizardKind::LpnGrouping => DestinationRequirements {
                location: false,
                license_plate_number: true,
            },
            WizardKind::LpnSplitting | WizardKind::LpnOperations => DestinationRequirements {
                location: true,
                license_plate_number: true,
            },
            WizardKind::LpnUnlinking
            | WizardKind::MiscellaneousReceipt
            | WizardKind::StockChange => DestinationRequirements {
                location: true,
                license_plate_number: false,
            },
        }
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.storage_key() == key)
    }
}

impl std::fmt::Display for WizardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardKind::LpnOperations => write!(f, "LPN operations"),
            WizardKind::LpnGrouping => write!(f, "LPN grouping"),
            WizardKind::LpnSplitting => write!(f, "LPN splitting"),
            WizardKind::LpnUnlinking => write!(f, "LPN unlinking"),
            WizardKind::MiscellaneousReceipt => write!(f, "Miscellaneous receipt"),
            WizardKind::StockChange => write!(f, "Stock change"),
        }
    }
}

/// Which destination fields are mandatory on an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationRequirements {
    pub location: bool,
    pub license_plate_number: bool,
}

/// Serial number management mode of a product at a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerialNumberManagementMode {
    #[default]
    NotManaged,
    Received,
    Issued,
    ReceivedIssued,
    GlobalReceivedIssued,
}

impl SerialNumberManagementMode {
    /// Serial ranges are only tracked per allocation in global received/issued mode
    pub fn tracks_ranges(&self) -> bool {
        matches!(self, SerialNumberManagementMode::GlobalReceivedIssued)
    }
}

/// Sub-mode of the LPN operations wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LicensePlateNumberOperationMode {
    Grouping,
    Splitting,
    Unlinking,
}

/// Status of a license plate number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LicensePlateNumberStatus {
    #[default]
    Free,
    InStock,
    InTransit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_id_accepts_number_and_string() {
        let a: StockId = serde_json::from_str("42").unwrap();
        let b: StockId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "42");
    }

    #[test]
    fn test_stock_id_rejects_text() {
        assert!(serde_json::from_str::<StockId>("\"abc\"").is_err());
    }

    #[test]
    fn test_storage_keys_are_unique() {
        for kind in WizardKind::ALL {
            assert_eq!(WizardKind::from_storage_key(kind.storage_key()), Some(kind));
        }
    }

    #[test]
    fn test_only_global_mode_tracks_ranges() {
        assert!(SerialNumberManagementMode::GlobalReceivedIssued.tracks_ranges());
        assert!(!SerialNumberManagementMode::ReceivedIssued.tracks_ranges());
        assert!(!SerialNumberManagementMode::NotManaged.tracks_ranges());
    }
}
