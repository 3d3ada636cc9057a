//! Common constants used throughout the crate.
//!
//! Signing and verification must agree on these byte-for-byte, so they live in one spot.
//!
//! Tests that are testing the content of an error code or message should not use these constants;
//! they should use hard-coded strings so the tests are also testing for misspellings.
//!
//! Please keep this file organized alphabetically.

/// Body of the default tampered-link response.
pub(crate) const ACCESS_DENIED_BODY: &str =
    "<html><head><title>Access denied</title></head><body><h1>Access denied</h1></body></html>";

/// Default name of the query parameter carrying the checksum.
pub const DEFAULT_CHECKSUM_PARAM: &str = "_checksum";

/// Default port for `http` URLs.
pub(crate) const DEFAULT_HTTP_PORT: u16 = 80;

/// Default port for `https` URLs.
pub(crate) const DEFAULT_HTTPS_PORT: u16 = 443;

/// Scheme assumed when a URL to sign doesn't carry one.
pub(crate) const DEFAULT_SCHEME: &str = "http";

/// Default identifier of the handler invoked for tampered links.
pub const DEFAULT_TAMPERED_HANDLER: &str = "link_tampered";

/// Error code: ConfigurationError
pub(crate) const ERR_CODE_CONFIGURATION_ERROR: &str = "ConfigurationError";

/// Error code: InternalFailure
pub(crate) const ERR_CODE_INTERNAL_FAILURE: &str = "InternalFailure";

/// Error code: InvalidArgument
pub(crate) const ERR_CODE_INVALID_ARGUMENT: &str = "InvalidArgument";

/// Marker written before the additional data in the canonical form.
pub(crate) const MARKER_ADDITIONAL_DATA: &[u8] = b"\x04";

/// Marker written after each of the scheme, host, port, and path in the canonical form.
pub(crate) const MARKER_FIELD_END: &[u8] = b"\x00";

/// Marker written between a query parameter name and its first value in the canonical form.
pub(crate) const MARKER_NAME_END: &[u8] = b"\x02";

/// Marker written before each query parameter name in the canonical form.
pub(crate) const MARKER_NAME_START: &[u8] = b"\x01";

/// Marker written between successive values of a query parameter in the canonical form.
pub(crate) const MARKER_VALUE_SEPARATOR: &[u8] = b"\x03";

/// Error message: `"Illegal hex character in escape % pattern: %"`
pub(crate) const MSG_ILLEGAL_HEX_CHAR: &str = "Illegal hex character in escape % pattern: %";

/// Error message: `"Incomplete trailing escape % sequence"`
pub(crate) const MSG_INCOMPLETE_TRAILING_ESCAPE: &str = "Incomplete trailing escape % sequence";

/// Error message: `"A checksum secret is required"`
pub(crate) const MSG_MISSING_SECRET: &str = "A checksum secret is required";

/// Error message: `"Flat parameter list must contain an even number of elements"`
pub(crate) const MSG_ODD_FLAT_PARAMS: &str = "Flat parameter list must contain an even number of elements";

/// Error message: `"Unknown configuration option: "`
pub(crate) const MSG_UNKNOWN_OPTION: &str = "Unknown configuration option: ";

/// Error message: `"Unsupported digest algorithm: "`
pub(crate) const MSG_UNSUPPORTED_DIGEST: &str = "Unsupported digest algorithm: ";

/// Scheme name for plain HTTP.
pub(crate) const SCHEME_HTTP: &str = "http";

/// Scheme name for HTTPS.
pub(crate) const SCHEME_HTTPS: &str = "https";
