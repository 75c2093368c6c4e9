//! Signing and verification of URLs.
//!
//! A signed URL carries four extra query parameters, each named with the configured prefix (default `es1_`):
//!
//! | parameter | value |
//! |---|---|
//! | `<prefix>signature` | base64 of the lowercase hex HMAC digest |
//! | `<prefix>timestamp` | Unix seconds at signing time |
//! | `<prefix>nonce` | random string |
//! | `<prefix>algorithm` | HMAC hash name, e.g. `sha256` |
//!
//! The HMAC algorithm used during verification is the one named in the URL, not the verifier's configured default.
//! This lets a verifier accept URLs issued before its default changed. It is safe only because producing a valid
//! digest under any algorithm still requires the secret key.

use {
    crate::{
        canonical::ParsedUrl,
        constants::MSG_SIGNED_URL_UNPARSEABLE,
        crypto::{generate_nonce, HmacAlgorithm},
        QueryValue, SignerConfig, SignerConfigBuilder, SigningError,
    },
    base64::{
        alphabet,
        engine::{
            general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
            DecodePaddingMode,
        },
        Engine,
    },
    chrono::{DateTime, Utc},
    log::{debug, trace},
    qualifier_attr::qualifiers,
    std::str::FromStr,
    subtle::ConstantTimeEq,
};

/// Standard base64 decoder that does not care whether padding is present.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// URL-safe base64 decoder that does not care whether padding is present.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The result of checking a signed URL. Checks are performed in declaration order; the first failure wins.
///
/// Callers of [UrlSigner::verify] only see `true` (for [VerifyOutcome::Valid]) or `false`.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VerifyOutcome {
    /// The URL could not be parsed, or one of the signing parameters is absent or empty.
    ParamsMissing,

    /// The signature parameter is repeated or is not valid base64.
    SignatureMalformed,

    /// The recomputed signature does not match, or the named algorithm is unsupported.
    SignatureInvalid,

    /// The timestamp parameter is repeated or is not a decimal integer.
    TimestampMalformed,

    /// The timestamp is older than the validity window plus the clock-skew tolerance.
    Expired,

    /// The timestamp is further in the future than the clock-skew tolerance allows.
    NotYetValid,

    /// The signature and timestamp are valid.
    Valid,
}

impl VerifyOutcome {
    /// Indicates whether this is [VerifyOutcome::Valid].
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        *self == Self::Valid
    }
}

/// Signs URLs and verifies signed URLs.
///
/// The configuration can be changed with [UrlSigner::update]; this requires exclusive access, so a signer shared
/// across threads needs a lock around it if it is to be reconfigured at runtime.
#[derive(Clone, Debug, Default)]
pub struct UrlSigner {
    config: SignerConfig,
}

impl UrlSigner {
    /// Create a signer from a configuration.
    pub fn new(config: SignerConfig) -> Self {
        Self {
            config,
        }
    }

    /// Retrieve the current configuration.
    #[inline(always)]
    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Merge a partial configuration into the current one. See [SignerConfig::update].
    pub fn update(&mut self, partial: SignerConfigBuilder) -> &mut Self {
        self.config.update(partial);
        self
    }

    /// Sign `url` using the current time.
    ///
    /// # Errors
    /// Returns [SigningError::MalformedUrl] if `url` is not an absolute URL or the signed URL would be too long to
    /// parse, or [SigningError::UnsupportedAlgorithm] if the configured algorithm is unknown.
    pub fn sign(&self, url: &str) -> Result<String, SigningError> {
        self.sign_at(url, Utc::now())
    }

    /// Sign `url` as though it were signed at `timestamp`.
    pub fn sign_at(&self, url: &str, timestamp: DateTime<Utc>) -> Result<String, SigningError> {
        self.sign_with_nonce(url, timestamp, &generate_nonce())
    }

    /// Sign `url` with a fixed timestamp and nonce.

    #[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
    #[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
    fn sign_with_nonce(&self, url: &str, timestamp: DateTime<Utc>, nonce: &str) -> Result<String, SigningError> {
        let config = &self.config;
        let signature_param = config.signature_param();
        let mut parsed = ParsedUrl::parse(url)?;

        let query = parsed.query_mut();
        query.set(config.nonce_param(), nonce);
        query.set(config.timestamp_param(), timestamp.timestamp().to_string());
        query.set(config.algorithm_param(), config.algorithm());
        // Re-signing never carries over an old signature.
        query.remove(&signature_param);

        let expected = self.expected_signature(&parsed)?;
        parsed.query_mut().set(signature_param, STANDARD.encode(expected));

        let result = parsed.to_url_string();

        // Escaping the query can grow the URL past what the parser accepts; such a URL could never be verified.
        if let Err(e) = ParsedUrl::parse(&result) {
            debug!("sign_with_nonce: signed URL of {} bytes does not reparse: {}", result.len(), e);
            return Err(SigningError::MalformedUrl(format!("{}{}", MSG_SIGNED_URL_UNPARSEABLE, e)));
        }

        debug!("Signed URL with algorithm {} at {}", config.algorithm(), timestamp.timestamp());
        Ok(result)
    }

    /// Verify `url` against the current time.
    ///
    /// This never fails; a URL that is malformed, tampered with, signed with a different key, expired, or dated too
    /// far in the future all yield `false`. The reason is logged at the `debug` level.
    pub fn verify(&self, url: &str) -> bool {
        self.verify_at(url, Utc::now())
    }

    /// Verify `url` as though the current time were `server_timestamp`.
    pub fn verify_at(&self, url: &str, server_timestamp: DateTime<Utc>) -> bool {
        self.check_at(url, server_timestamp).is_valid()
    }

    /// Check `url` as though the current time were `server_timestamp`, returning the detailed outcome.

    #[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
    #[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
    fn check_at(&self, url: &str, server_timestamp: DateTime<Utc>) -> VerifyOutcome {
        let config = &self.config;

        let parsed = match ParsedUrl::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("check_at: unable to parse URL: {}", e);
                return VerifyOutcome::ParamsMissing;
            }
        };

        let query = parsed.query();
        let signature_param = config.signature_param();
        let timestamp_param = config.timestamp_param();

        for param in [&signature_param, &timestamp_param, &config.algorithm_param(), &config.nonce_param()] {
            if !query.get(param).map(QueryValue::is_present).unwrap_or(false) {
                debug!("check_at: missing required parameter {}", param);
                return VerifyOutcome::ParamsMissing;
            }
        }

        let Some(signature) = query.get(&signature_param).and_then(QueryValue::as_single) else {
            debug!("check_at: {} is repeated", signature_param);
            return VerifyOutcome::SignatureMalformed;
        };

        let signature = match STANDARD_LENIENT.decode(signature).or_else(|_| URL_SAFE_LENIENT.decode(signature)) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("check_at: {} is not valid base64: {}", signature_param, e);
                return VerifyOutcome::SignatureMalformed;
            }
        };

        let expected = match self.expected_signature(&parsed) {
            Ok(expected) => expected,
            Err(e) => {
                debug!("check_at: unable to compute signature: {}", e);
                return VerifyOutcome::SignatureInvalid;
            }
        };

        let is_equal: bool = signature.as_slice().ct_eq(expected.as_bytes()).into();
        if !is_equal {
            trace!("Signature mismatch: expected '{}', got '{}'", expected, String::from_utf8_lossy(&signature));
            return VerifyOutcome::SignatureInvalid;
        }

        let Some(timestamp) = query.get(&timestamp_param).and_then(QueryValue::as_single) else {
            debug!("check_at: {} is repeated", timestamp_param);
            return VerifyOutcome::TimestampMalformed;
        };

        let timestamp = match i64::from_str(timestamp.trim()) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                debug!("check_at: {} is not an integer: {}", timestamp_param, e);
                return VerifyOutcome::TimestampMalformed;
            }
        };

        check_time_window(timestamp, server_timestamp.timestamp(), config.expired_after_seconds(), config.oversight())
    }

    /// Compute the lowercase hex signature for `parsed` using the algorithm named in its own query parameters.
    fn expected_signature(&self, parsed: &ParsedUrl) -> Result<String, SigningError> {
        let config = &self.config;
        let algorithm_param = config.algorithm_param();
        let algorithm = match parsed.query().get(&algorithm_param) {
            Some(QueryValue::Single(name)) => HmacAlgorithm::from_str(name)?,
            _ => return Err(SigningError::UnsupportedAlgorithm(format!("{} must be a single value", algorithm_param))),
        };

        let canonical = parsed.canonical_string(&config.signature_param());
        algorithm.hmac_hex(config.secret_key(), canonical.as_bytes())
    }
}

impl From<SignerConfig> for UrlSigner {
    fn from(config: SignerConfig) -> Self {
        Self::new(config)
    }
}

/// Check a request timestamp against the validity window `[now - expired_after - oversight, now + oversight]`.
fn check_time_window(timestamp: i64, now: i64, expired_after: u64, oversight: u64) -> VerifyOutcome {
    let expired_after = i64::try_from(expired_after).unwrap_or(i64::MAX);
    let oversight = i64::try_from(oversight).unwrap_or(i64::MAX);
    let min_ts = now.saturating_sub(expired_after).saturating_sub(oversight);
    let max_ts = now.saturating_add(oversight);

    if timestamp < min_ts {
        debug!("check_time_window: timestamp {} is before minimum timestamp {}", timestamp, min_ts);
        VerifyOutcome::Expired
    } else if timestamp > max_ts {
        debug!("check_time_window: timestamp {} is after maximum timestamp {}", timestamp, max_ts);
        VerifyOutcome::NotYetValid
    } else {
        VerifyOutcome::Valid
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{check_time_window, UrlSigner, VerifyOutcome},
        crate::{canonical::ParsedUrl, QueryValue, SignerConfig, SignerConfigBuilder, SigningError},
        base64::{engine::general_purpose::STANDARD, Engine},
        chrono::{DateTime, Duration, Utc},
    };

    const SECRET: &str = "#6h-_hey";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).expect("failed to create DateTime")
    }

    fn signer(config: &mut SignerConfigBuilder) -> UrlSigner {
        UrlSigner::new(config.build().expect("failed to build SignerConfig"))
    }

    fn param<'a>(parsed: &'a ParsedUrl, key: &str) -> &'a str {
        parsed.query().get(key).and_then(QueryValue::as_single).expect("missing parameter")
    }

    #[test_log::test]
    fn test_known_answer_sha256() {
        let signer = signer(SignerConfig::builder().secret_key(SECRET));
        let url = signer.sign_with_nonce("https://example.com/posts?postId=15", at(1_700_000_000), "k3j1x9abcd").unwrap();
        assert_eq!(
            url,
            "https://example.com/posts?postId=15&es1_nonce=k3j1x9abcd&es1_timestamp=1700000000&es1_algorithm=sha256&es1_signature=NzBmZTQ1OGE2MDQ5MjE2M2M1N2RlZjFlZDRkMjhmMTE5YjMwZWRlNTkxZWY1N2RjMWM5ZTFlZTUzYjg0OThkMA%3D%3D"
        );
        assert_eq!(signer.check_at(&url, at(1_700_000_000)), VerifyOutcome::Valid);
    }

    #[test_log::test]
    fn test_known_answer_md5_repeated_keys() {
        let signer = signer(SignerConfig::builder().secret_key("E3").prefix("prfx_").algorithm("md5"));
        let url = signer
            .sign_with_nonce("https://Example.com:8443/a/b?z=1&a=x%20y&a=2&flag", at(1_573_826_535), "n0nce")
            .unwrap();
        assert_eq!(
            url,
            "https://example.com:8443/a/b?z=1&a=x%20y&a=2&flag=&prfx_nonce=n0nce&prfx_timestamp=1573826535&prfx_algorithm=md5&prfx_signature=NTgxOTY3ZjYzYWY5ZjI1ZjBhNzg2ZjY2NzBjYTZiMTE%3D"
        );
        assert!(signer.verify_at(&url, at(1_573_826_535)));
    }

    #[test_log::test]
    fn test_resign_replaces_parameters() {
        let signer = signer(SignerConfig::builder().secret_key(SECRET));
        let first = signer.sign_with_nonce("https://example.com/x?a=1", at(1_000), "first").unwrap();
        let second = signer.sign_with_nonce(&first, at(2_000), "second").unwrap();

        let parsed = ParsedUrl::parse(&second).unwrap();
        assert_eq!(parsed.query().len(), 5);
        assert_eq!(param(&parsed, "es1_nonce"), "second");
        assert_eq!(param(&parsed, "es1_timestamp"), "2000");
        assert_eq!(parsed.query().iter().last().map(|(k, _)| k), Some("es1_signature"));

        assert_eq!(signer.check_at(&second, at(2_000)), VerifyOutcome::Valid);
        assert_eq!(signer.check_at(&first, at(2_000)), VerifyOutcome::Expired);
    }

    #[test_log::test]
    fn test_sign_errors() {
        let signer = signer(SignerConfig::builder().algorithm("whirlpool"));
        match signer.sign("https://example.com/") {
            Err(SigningError::UnsupportedAlgorithm(msg)) => assert_eq!(msg, "Unsupported HMAC algorithm: whirlpool"),
            other => panic!("Expected UnsupportedAlgorithm; got {:?}", other),
        }

        let signer = UrlSigner::default();
        match signer.sign("/relative/path") {
            Err(SigningError::MalformedUrl(msg)) => assert_eq!(msg, "URL must be absolute: /relative/path"),
            other => panic!("Expected MalformedUrl; got {:?}", other),
        }
    }

    #[test_log::test]
    fn test_sign_oversized_url() {
        let signer = signer(SignerConfig::builder().secret_key(SECRET));
        let url = format!("https://example.com/p?q={}", "|".repeat(30_000));
        assert!(ParsedUrl::parse(&url).is_ok());

        match signer.sign_at(&url, at(1_700_000_000)) {
            Err(SigningError::MalformedUrl(msg)) => assert!(msg.starts_with("Signed URL cannot be parsed: "), "{}", msg),
            other => panic!("Expected MalformedUrl; got {:?}", other),
        }

        // Just under the limit once escaped still round-trips.
        let url = format!("https://example.com/p?q={}", "|".repeat(20_000));
        let signed = signer.sign_at(&url, at(1_700_000_000)).unwrap();
        assert!(signer.verify_at(&signed, at(1_700_000_000)));
    }

    #[test_log::test]
    fn test_outcome_ordering() {
        let signer = signer(SignerConfig::builder().secret_key(SECRET));
        let now = at(1_700_000_000);
        let url = signer.sign_with_nonce("https://example.com/posts?postId=15", now, "abc").unwrap();
        assert_eq!(signer.check_at(&url, now), VerifyOutcome::Valid);

        // Unparseable URLs and missing or empty parameters.
        assert_eq!(signer.check_at("not a url", now), VerifyOutcome::ParamsMissing);
        assert_eq!(signer.check_at("https://example.com/posts?postId=15", now), VerifyOutcome::ParamsMissing);
        let no_nonce = url.replace("es1_nonce=abc&", "");
        assert_eq!(signer.check_at(&no_nonce, now), VerifyOutcome::ParamsMissing);
        let empty_nonce = url.replace("es1_nonce=abc", "es1_nonce=");
        assert_eq!(signer.check_at(&empty_nonce, now), VerifyOutcome::ParamsMissing);

        // Repeated or undecodable signatures.
        let repeated = format!("{}&es1_signature=AAAA", url);
        assert_eq!(signer.check_at(&repeated, now), VerifyOutcome::SignatureMalformed);
        let undecodable = url.replace("es1_signature=", "es1_signature=%24%24%24");
        assert_eq!(signer.check_at(&undecodable, now), VerifyOutcome::SignatureMalformed);

        // Tampered values and unknown algorithms.
        let tampered = url.replace("postId=15", "postId=16");
        assert_eq!(signer.check_at(&tampered, now), VerifyOutcome::SignatureInvalid);
        let bad_alg = url.replace("es1_algorithm=sha256", "es1_algorithm=whirlpool");
        assert_eq!(signer.check_at(&bad_alg, now), VerifyOutcome::SignatureInvalid);
        let repeated_alg = format!("{}&es1_algorithm=md5", url);
        assert_eq!(signer.check_at(&repeated_alg, now), VerifyOutcome::SignatureInvalid);

        // Time window.
        assert_eq!(signer.check_at(&url, now + Duration::seconds(931)), VerifyOutcome::Expired);
        assert_eq!(signer.check_at(&url, now - Duration::seconds(31)), VerifyOutcome::NotYetValid);
    }

    #[test_log::test]
    fn test_malformed_timestamp() {
        let signer = signer(SignerConfig::builder().secret_key(SECRET));
        let url = signer.sign_with_nonce("https://example.com/?ts=x", at(0), "n").unwrap();

        // Only a holder of the secret can produce this, but the timestamp must still be an integer.
        let mut forged = ParsedUrl::parse(&url).unwrap();
        forged.query_mut().set("es1_timestamp", "soon");
        let expected = signer.expected_signature(&forged).unwrap();
        forged.query_mut().set("es1_signature", STANDARD.encode(expected));
        assert_eq!(signer.check_at(&forged.to_url_string(), at(0)), VerifyOutcome::TimestampMalformed);

        let mut forged = ParsedUrl::parse(&url).unwrap();
        forged.query_mut().set("es1_timestamp", QueryValue::Multiple(vec!["0".to_string(), "1".to_string()]));
        let expected = signer.expected_signature(&forged).unwrap();
        forged.query_mut().set("es1_signature", STANDARD.encode(expected));
        assert_eq!(signer.check_at(&forged.to_url_string(), at(0)), VerifyOutcome::TimestampMalformed);
    }

    #[test_log::test]
    fn test_lenient_base64() {
        let signer = signer(SignerConfig::builder().secret_key(SECRET));
        let now = at(1_700_000_000);
        let url = signer.sign_with_nonce("https://example.com/posts?postId=15", now, "k3j1x9abcd").unwrap();
        let unpadded = url.replace("%3D%3D", "");
        assert_eq!(signer.check_at(&unpadded, now), VerifyOutcome::Valid);
    }

    #[test_log::test]
    fn test_time_window() {
        // Window is [now - E - O, now + O].
        assert_eq!(check_time_window(100, 100, 4, 0), VerifyOutcome::Valid);
        assert_eq!(check_time_window(100, 104, 4, 0), VerifyOutcome::Valid);
        assert_eq!(check_time_window(100, 105, 4, 0), VerifyOutcome::Expired);
        assert_eq!(check_time_window(100, 106, 4, 2), VerifyOutcome::Valid);
        assert_eq!(check_time_window(100, 107, 4, 2), VerifyOutcome::Expired);
        assert_eq!(check_time_window(102, 100, 4, 2), VerifyOutcome::Valid);
        assert_eq!(check_time_window(103, 100, 4, 2), VerifyOutcome::NotYetValid);
        assert_eq!(check_time_window(101, 100, 0, 0), VerifyOutcome::NotYetValid);
        assert_eq!(check_time_window(i64::MIN, 0, u64::MAX, u64::MAX), VerifyOutcome::Valid);
        assert_eq!(check_time_window(i64::MAX, i64::MAX, 0, u64::MAX), VerifyOutcome::Valid);
    }

    #[test_log::test]
    fn test_update() {
        let mut signer = UrlSigner::from(SignerConfig::default());
        signer
            .update(SignerConfig::builder().secret_key(SECRET).clone())
            .update(SignerConfig::builder().oversight(2).clone());
        assert_eq!(signer.config().secret_key(), SECRET.as_bytes());
        assert_eq!(signer.config().oversight(), 2);
        assert_eq!(signer.config().expired_after_seconds(), 900);
    }
}
