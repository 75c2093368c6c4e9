#![no_main]
use {
    arbitrary::Arbitrary,
    chrono::{DateTime, Utc},
    libfuzzer_sys::fuzz_target,
    scratchstack_url_signature::{SignerConfig, UrlSigner},
};

#[derive(Arbitrary, Debug)]
struct VerifyInput {
    url: String,
    prefix: String,
    secret_key: Vec<u8>,
    expired_after_seconds: u64,
    oversight: u64,
    server_timestamp: i64,
    resign: bool,
}

fuzz_target!(|data: VerifyInput| {
    let Some(config) = SignerConfig::builder()
        .prefix(data.prefix)
        .secret_key(data.secret_key)
        .expired_after_seconds(data.expired_after_seconds)
        .oversight(data.oversight)
        .build()
        .ok()
    else {
        return;
    };

    let signer = UrlSigner::new(config);
    let server_timestamp = DateTime::<Utc>::from_timestamp(data.server_timestamp % 100_000_000_000, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());

    // Verification must never panic, whatever the input.
    let _ = signer.verify_at(&data.url, server_timestamp);

    // Anything that can be signed must verify at the signing time.
    if data.resign {
        if let Ok(signed) = signer.sign_at(&data.url, server_timestamp) {
            assert!(signer.verify_at(&signed, server_timestamp), "failed to verify {}", signed);
        }
    }
});
