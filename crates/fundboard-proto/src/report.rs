use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One server-generated report as listed by the backend.  Never mutated
/// client-side; a refresh replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Unique key; also the argument of the content endpoint.
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fund_name: String,
    pub fund_code: FundCode,
    /// ISO `YYYY-MM-DD`, so lexicographic order is chronological order.
    pub date: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Asset code attached to a listed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundCode {
    Gold,
    Silver,
    /// Anything the backend adds later; sorts after gold like silver does.
    #[serde(other)]
    Other,
}

/// Asset a generation job can be triggered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Gold,
    Silver,
}

impl AssetKind {
    /// Path segment / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Gold => "gold",
            AssetKind::Silver => "silver",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Gold => "Gold",
            AssetKind::Silver => "Silver",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by `AssetKind::from_str` for anything other than gold/silver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAsset(pub String);

impl fmt::Display for UnknownAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown asset kind {:?} (expected gold or silver)", self.0)
    }
}

impl std::error::Error for UnknownAsset {}

impl FromStr for AssetKind {
    type Err = UnknownAsset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(AssetKind::Gold),
            "silver" => Ok(AssetKind::Silver),
            _ => Err(UnknownAsset(s.to_string())),
        }
    }
}
