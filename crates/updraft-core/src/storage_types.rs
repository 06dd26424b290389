use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Backing store kinds.
///
/// Defined in core because configuration selects the backend and the API
/// layer branches on it when deciding between streaming and redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Local,
    S3,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StoreBackend::Local),
            "s3" => Ok(StoreBackend::S3),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StoreBackend::Local => write!(f, "local"),
            StoreBackend::S3 => write!(f, "s3"),
        }
    }
}
