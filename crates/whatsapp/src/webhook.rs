//! Webhook authentication: `X-Hub-Signature-256` HMAC verification and the
//! `hub.challenge` subscription handshake.

use {
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::warn,
};

type HmacSha256 = Hmac<Sha256>;

/// Verify the `X-Hub-Signature-256` header (`sha256=<hex>`) against the raw
/// request body. Comparison happens on the decoded digest bytes, in
/// constant time.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix("sha256=") else {
        warn!("signature header missing sha256= prefix");
        return false;
    };

    let claimed = match hex::decode(hex_digest) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!("signature header is not valid hex");
            return false;
        },
    };

    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to key HMAC from app secret");
            return false;
        },
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    constant_time_eq(&claimed, computed.as_slice())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify the webhook subscription handshake (GET request).
///
/// Meta sends `hub.mode=subscribe`, `hub.verify_token=<configured token>`
/// and `hub.challenge=<nonce>`; the challenge is echoed back on success.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    if mode? == "subscribe" && token? == verify_token {
        challenge.map(ToString::to_string)
    } else {
        None
    }
}
