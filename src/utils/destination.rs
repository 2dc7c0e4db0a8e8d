//! Destination URL validation.
//!
//! Destinations are stored in their parsed, serialized form. That form
//! never contains control characters or raw non-ASCII bytes, so it is
//! always a legal `Location` header value.

use url::Url;

/// Maximum accepted destination length in bytes.
pub const MAX_DESTINATION_LENGTH: usize = 2048;

/// Reasons a destination is rejected.
#[derive(Debug, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Destination URL is required")]
    Empty,

    #[error("Destination URL exceeds {MAX_DESTINATION_LENGTH} characters")]
    TooLong,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("Destination URL must include a host")]
    MissingHost,
}

/// Validates a destination and returns the value to store.
///
/// # Rules
///
/// 1. Non-empty after trimming
/// 2. Parses as an absolute URL
/// 3. Scheme is `http` or `https`
/// 4. Has a host
/// 5. Serialized form is at most 2048 bytes
///
/// Rejects `javascript:`, `data:`, `file:` and similar schemes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     validate_destination(" https://example.org/page ").unwrap(),
///     "https://example.org/page"
/// );
/// assert!(validate_destination("example.org").is_err());
/// ```
pub fn validate_destination(input: &str) -> Result<String, UrlValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url = Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    let serialized = url.as_str();
    if serialized.len() > MAX_DESTINATION_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    Ok(serialized.to_string())
}
