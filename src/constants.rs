//! Common constants used throughout the crate.
//!
//! Tests that are testing the content of an error code or message should not use these constants;
//! they should use hard-coded strings so the tests are also testing for misspellings.
//!
//! Please keep this file organized alphabetically.

/// Default HMAC hash algorithm name.
pub(crate) const DEFAULT_ALGORITHM: &str = "sha256";

/// Default validity window for a signed URL, in seconds (15 minutes).
pub(crate) const DEFAULT_EXPIRED_AFTER_SECONDS: u64 = 15 * 60;

/// Default clock-skew tolerance, in seconds.
pub(crate) const DEFAULT_OVERSIGHT: u64 = 30;

/// Default prefix applied to the signing query parameter names.
pub(crate) const DEFAULT_PREFIX: &str = "es1_";

/// Error code: MalformedUrl
pub(crate) const ERR_CODE_MALFORMED_URL: &str = "MalformedUrl";

/// Error code: UnsupportedAlgorithm
pub(crate) const ERR_CODE_UNSUPPORTED_ALGORITHM: &str = "UnsupportedAlgorithm";

/// Error message: `"Signed URL cannot be parsed: "`
pub(crate) const MSG_SIGNED_URL_UNPARSEABLE: &str = "Signed URL cannot be parsed: ";

/// Error message: `"URL must be absolute: "`
pub(crate) const MSG_URL_MUST_BE_ABSOLUTE: &str = "URL must be absolute: ";

/// Error message: `"Unsupported HMAC algorithm: "`
pub(crate) const MSG_UNSUPPORTED_ALGORITHM: &str = "Unsupported HMAC algorithm: ";

/// Characters used when generating a nonce.
pub(crate) const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a generated nonce.
pub(crate) const NONCE_LENGTH: usize = 10;

/// Query parameter suffix: algorithm
pub(crate) const PARAM_ALGORITHM: &str = "algorithm";

/// Query parameter suffix: nonce
pub(crate) const PARAM_NONCE: &str = "nonce";

/// Query parameter suffix: signature
pub(crate) const PARAM_SIGNATURE: &str = "signature";

/// Query parameter suffix: timestamp
pub(crate) const PARAM_TIMESTAMP: &str = "timestamp";
