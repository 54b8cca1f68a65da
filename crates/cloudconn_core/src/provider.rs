//! Provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a provider backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Amazon Web Services.
    Aws,
    /// Google Cloud Platform.
    Gcp,
    /// Local filesystem.
    Local,
}

impl ProviderId {
    /// All known providers.
    pub const ALL: [ProviderId; 3] = [ProviderId::Aws, ProviderId::Gcp, ProviderId::Local];

    /// Lowercase identifier (`aws`, `gcp`, `local`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderId::Aws => "aws",
            ProviderId::Gcp => "gcp",
            ProviderId::Local => "local",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider identifier.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown provider '{0}' (expected one of: aws, gcp, local)")]
pub struct ParseProviderError(String);

impl FromStr for ProviderId {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == lowered)
            .ok_or_else(|| ParseProviderError(s.to_string()))
    }
}
