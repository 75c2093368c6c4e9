use {
    crate::{constants::*, SigningError},
    hmac::{Hmac, Mac},
    md5::Md5,
    rand::Rng,
    sha1::Sha1,
    sha2::{Sha224, Sha256, Sha384, Sha512},
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// HMAC hash algorithms that can be named in the algorithm query parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HmacAlgorithm {
    /// HMAC-MD5.
    Md5,
    /// HMAC-SHA1.
    Sha1,
    /// HMAC-SHA224.
    Sha224,
    /// HMAC-SHA256.
    Sha256,
    /// HMAC-SHA384.
    Sha384,
    /// HMAC-SHA512.
    Sha512,
}

/// Run one HMAC computation over the given digest type.
macro_rules! hmac_digest {
    ($digest:ty, $key:expr, $message:expr) => {{
        // HMAC accepts keys of any length; longer keys are hashed first.
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($key)
            .map_err(|e| SigningError::UnsupportedAlgorithm(format!("HMAC error: {}", e)))?;
        mac.update($message);
        mac.finalize().into_bytes().to_vec()
    }};
}

impl HmacAlgorithm {
    /// The lowercase name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Compute the HMAC of `message` under `key`.
    pub fn hmac(&self, key: &[u8], message: &[u8]) -> Result<Vec<u8>, SigningError> {
        let digest = match self {
            Self::Md5 => hmac_digest!(Md5, key, message),
            Self::Sha1 => hmac_digest!(Sha1, key, message),
            Self::Sha224 => hmac_digest!(Sha224, key, message),
            Self::Sha256 => hmac_digest!(Sha256, key, message),
            Self::Sha384 => hmac_digest!(Sha384, key, message),
            Self::Sha512 => hmac_digest!(Sha512, key, message),
        };
        Ok(digest)
    }

    /// Compute the lowercase hex encoding of the HMAC of `message` under `key`.
    #[inline(always)]
    pub fn hmac_hex(&self, key: &[u8], message: &[u8]) -> Result<String, SigningError> {
        Ok(hex::encode(self.hmac(key, message)?))
    }
}

impl FromStr for HmacAlgorithm {
    type Err = SigningError;

    /// Look up an algorithm by name. Names are matched without regard to ASCII case.
    fn from_str(name: &str) -> Result<Self, SigningError> {
        const ALL: [HmacAlgorithm; 6] = [
            HmacAlgorithm::Md5,
            HmacAlgorithm::Sha1,
            HmacAlgorithm::Sha224,
            HmacAlgorithm::Sha256,
            HmacAlgorithm::Sha384,
            HmacAlgorithm::Sha512,
        ];

        ALL.into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SigningError::UnsupportedAlgorithm(format!("{}{}", MSG_UNSUPPORTED_ALGORITHM, name)))
    }
}

impl Display for HmacAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Generate a random nonce. Nonces only diversify the output and are never checked for reuse.
pub(crate) fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LENGTH).map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char).collect()
}
