//! The `scratchstack_url_signature` crate produces and verifies signed, time-limited URLs.
//!
//! Signing takes an absolute HTTP(S) URL and returns the same URL with four extra query parameters: a nonce, a
//! timestamp, the HMAC algorithm name, and an HMAC signature over a canonical form of the URL. Anyone holding the same
//! secret key can later verify that the URL was issued by a trusted party, has not been modified, and has not expired.
//!
//! This crate does not encrypt URLs, distribute or rotate keys, or prevent replay: a captured URL remains valid until
//! it expires.
//!
//! # Example
//! ```rust
//! use scratchstack_url_signature::{SignerConfig, UrlSigner};
//!
//! let config = SignerConfig::builder()
//!     .secret_key("my-secret-key")
//!     .expired_after_seconds(60)
//!     .build()
//!     .unwrap();
//! let signer = UrlSigner::new(config);
//!
//! let url = signer.sign("https://example.com/posts?postId=15").unwrap();
//! assert!(url.starts_with("https://example.com/posts?postId=15&es1_nonce="));
//! assert!(signer.verify(&url));
//! assert!(!signer.verify(&url.replace("postId=15", "postId=16")));
//! ```
//!
//! # Verification failures
//! [UrlSigner::verify] returns only `true` or `false`; it does not reveal whether a URL was tampered with, expired, or
//! malformed. The reason is logged through the [`log`](https://docs.rs/log) facade at the `debug` level.
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod canonical;
mod config;
mod constants;
mod crypto;
mod error;
mod signature;

pub use crate::{
    canonical::{ParsedUrl, QueryParameters, QueryValue},
    config::{SignerConfig, SignerConfigBuilder, SignerConfigBuilderError},
    crypto::HmacAlgorithm,
    error::SigningError,
    signature::UrlSigner,
};

#[cfg(any(doc, feature = "unstable"))]
pub use crate::signature::VerifyOutcome;
