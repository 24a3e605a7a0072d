//! Webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify a Cal.com webhook signature using HMAC-SHA256.
///
/// When no secret is configured, verification is skipped and the request is
/// accepted; a warning is logged so the insecure development default stays
/// visible. A configured secret with a missing header rejects the request.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Hex-encoded signature from the `x-cal-signature-256` header
/// * `secret` - Webhook signing secret, if configured
///
/// # Returns
/// `true` if the signature is valid (or verification is skipped), `false` otherwise
#[must_use]
pub fn verify_webhook_signature(
    body: &[u8],
    signature: Option<&str>,
    secret: Option<&str>,
) -> bool {
    let Some(secret) = secret else {
        warn!("CALCOM_WEBHOOK_SECRET not set - skipping signature verification");
        return true;
    };

    let Some(signature) = signature else {
        warn!("Missing x-cal-signature-256 header");
        return false;
    };

    // Decode the hex signature
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };

    // Compute HMAC-SHA256
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}
