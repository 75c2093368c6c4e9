use {
    crate::constants::*,
    http::status::StatusCode,
    scratchstack_errors::ServiceError,
    std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

/// Error returned when an attempt at signing a URL fails.
///
/// Verification never returns this; every verification failure is reported as `false`.
#[derive(Debug)]
#[non_exhaustive]
pub enum SigningError {
    /// The URL could not be parsed, or it is missing a scheme or host. Sample messages:
    /// `URL must be absolute: /posts?postId=15`
    /// `invalid uri character`
    MalformedUrl(/* message */ String),

    /// The HMAC hash algorithm is not known to this crate. Sample message:
    /// `Unsupported HMAC algorithm: whirlpool`
    UnsupportedAlgorithm(/* message */ String),
}

impl SigningError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedUrl(_) => ERR_CODE_MALFORMED_URL,
            Self::UnsupportedAlgorithm(_) => ERR_CODE_UNSUPPORTED_ALGORITHM,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            Self::MalformedUrl(_) => StatusCode::BAD_REQUEST,
            // The algorithm comes from the signer's own configuration.
            Self::UnsupportedAlgorithm(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServiceError for SigningError {
    fn error_code(&self) -> &'static str {
        SigningError::error_code(self)
    }

    fn http_status(&self) -> StatusCode {
        SigningError::http_status(self)
    }
}

impl Display for SigningError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::MalformedUrl(msg) => f.write_str(msg),
            Self::UnsupportedAlgorithm(msg) => f.write_str(msg),
        }
    }
}

impl Error for SigningError {}

impl From<http::uri::InvalidUri> for SigningError {
    fn from(e: http::uri::InvalidUri) -> SigningError {
        SigningError::MalformedUrl(e.to_string())
    }
}
