//! Defines the custom error types for the email-enrich pipeline.

use thiserror::Error;
use url::ParseError as UrlParseError;

/// The primary error type for the verification and enrichment pipeline.
///
/// Soft outcomes ("no ticket", "no candidate", "no answer in time") are never
/// represented here; they surface as `Ok(None)`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation,
    /// including missing provider credentials or base URLs.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., HTTP clients).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error parsing a URL.
    #[error("URL Parsing Error: {0}")]
    UrlParse(#[from] UrlParseError),

    /// The verification provider could not serve a batch (transport failure or non-2xx).
    #[error("Verification Provider Error: {0}")]
    VerificationProvider(String),

    /// The discovery provider could not be reached or answered unexpectedly.
    #[error("Discovery Provider Error: {0}")]
    DiscoveryProvider(String),

    /// The discovery account has run out of credits. No further searches
    /// can succeed in this session.
    #[error("Discovery Provider Out Of Credits: {0}")]
    InsufficientCredits(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = AppError::VerificationProvider("HTTP 503 from batch 2/3".into());
        assert_eq!(
            err.to_string(),
            "Verification Provider Error: HTTP 503 from batch 2/3"
        );
    }
}
