//! Signer configuration: the secret key, parameter prefix, algorithm, and time window.

use {
    crate::constants::*,
    derive_builder::Builder,
    std::fmt::{Debug, Formatter, Result as FmtResult},
};

/// Configuration for signing and verifying URLs.
///
/// Every field has a default, so `SignerConfig::default()` and `SignerConfig::builder().build()` both yield a usable
/// (if insecure, due to the empty secret key) configuration:
///
/// | field | default |
/// |---|---|
/// | `secret_key` | empty |
/// | `prefix` | `"es1_"` |
/// | `algorithm` | `"sha256"` |
/// | `expired_after_seconds` | 900 |
/// | `oversight` | 30 |
///
/// A [SignerConfigBuilder] doubles as a partial configuration for [SignerConfig::update].
#[derive(Builder, Clone)]
#[builder(derive(Debug))]
pub struct SignerConfig {
    /// The HMAC key.
    #[builder(setter(into), default)]
    secret_key: Vec<u8>,

    /// Prefix applied to the name of every signing query parameter.
    #[builder(setter(into), default = "DEFAULT_PREFIX.to_string()")]
    prefix: String,

    /// The HMAC hash algorithm name used when signing. This is not validated until a URL is signed.
    #[builder(setter(into), default = "DEFAULT_ALGORITHM.to_string()")]
    algorithm: String,

    /// How long a signed URL remains valid, in seconds.
    #[builder(default = "DEFAULT_EXPIRED_AFTER_SECONDS")]
    expired_after_seconds: u64,

    /// Clock-skew tolerance, in seconds, applied to both ends of the validity window.
    #[builder(default = "DEFAULT_OVERSIGHT")]
    oversight: u64,
}

impl SignerConfig {
    /// Create a builder for `SignerConfig`.
    #[inline]
    pub fn builder() -> SignerConfigBuilder {
        SignerConfigBuilder::default()
    }

    /// Merge a partial configuration into this one.
    ///
    /// Each field that was set on `partial` overwrites the current value; fields left unset keep their current value.
    pub fn update(&mut self, partial: SignerConfigBuilder) -> &mut Self {
        if let Some(prefix) = partial.prefix {
            self.prefix = prefix;
        }

        if let Some(secret_key) = partial.secret_key {
            self.secret_key = secret_key;
        }

        if let Some(expired_after_seconds) = partial.expired_after_seconds {
            self.expired_after_seconds = expired_after_seconds;
        }

        if let Some(algorithm) = partial.algorithm {
            self.algorithm = algorithm;
        }

        if let Some(oversight) = partial.oversight {
            self.oversight = oversight;
        }

        self
    }

    /// Retrieve the HMAC key.
    #[inline(always)]
    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }

    /// Retrieve the query parameter name prefix.
    #[inline(always)]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Retrieve the HMAC hash algorithm name used when signing.
    #[inline(always)]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Retrieve the validity window length, in seconds.
    #[inline(always)]
    pub fn expired_after_seconds(&self) -> u64 {
        self.expired_after_seconds
    }

    /// Retrieve the clock-skew tolerance, in seconds.
    #[inline(always)]
    pub fn oversight(&self) -> u64 {
        self.oversight
    }

    /// Return `name` with the configured prefix prepended.
    pub fn namespaced_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// The name of the signature query parameter.
    #[inline]
    pub fn signature_param(&self) -> String {
        self.namespaced_name(PARAM_SIGNATURE)
    }

    /// The name of the timestamp query parameter.
    #[inline]
    pub fn timestamp_param(&self) -> String {
        self.namespaced_name(PARAM_TIMESTAMP)
    }

    /// The name of the nonce query parameter.
    #[inline]
    pub fn nonce_param(&self) -> String {
        self.namespaced_name(PARAM_NONCE)
    }

    /// The name of the algorithm query parameter.
    #[inline]
    pub fn algorithm_param(&self) -> String {
        self.namespaced_name(PARAM_ALGORITHM)
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            secret_key: Vec::new(),
            prefix: DEFAULT_PREFIX.to_string(),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            expired_after_seconds: DEFAULT_EXPIRED_AFTER_SECONDS,
            oversight: DEFAULT_OVERSIGHT,
        }
    }
}

impl Debug for SignerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SignerConfig")
            .field("secret_key", &"<redacted>")
            .field("prefix", &self.prefix)
            .field("algorithm", &self.algorithm)
            .field("expired_after_seconds", &self.expired_after_seconds)
            .field("oversight", &self.oversight)
            .finish()
    }
}
