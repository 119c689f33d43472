//! Webhook event parsing and signature verification.
//!
//! Implements Stripe's signing scheme: the `Stripe-Signature` header
//! carries `t=<unix>,v1=<hex hmac>` and the signed payload is
//! `"{t}.{body}"` keyed with the endpoint's webhook secret.
//! <https://docs.stripe.com/webhooks/signature>

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use super::StripeError;
use super::client::CheckoutSession;

/// Replay window for webhook deliveries (5 minutes).
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// A webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

/// The object inside an event. Only checkout sessions are acted on;
/// everything else is acknowledged and dropped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EventObject {
    CheckoutSession(CheckoutSession),
    Other(serde_json::Value),
}

impl Event {
    /// Parse a verified payload into an event.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::MalformedPayload` on invalid JSON.
    pub fn parse(payload: &str) -> Result<Self, StripeError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The checkout session carried by this event, if it is one.
    #[must_use]
    pub const fn checkout_session(&self) -> Option<&CheckoutSession> {
        match &self.data.object {
            EventObject::CheckoutSession(session) => Some(session),
            EventObject::Other(_) => None,
        }
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` for a malformed header, a
/// stale timestamp, or a signature mismatch.
pub fn verify_signature(
    header: &str,
    body: &str,
    webhook_secret: &SecretString,
    now_unix: i64,
) -> Result<(), StripeError> {
    let (timestamp, signatures) = parse_header(header)?;

    if (now_unix - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let signed_payload = format!("{timestamp}.{body}");
    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.expose_secret().as_bytes())
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    // The header may carry several v1 signatures during secret rotation
    if signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature(
            "signature mismatch".to_string(),
        ))
    }
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    StripeError::InvalidSignature("invalid timestamp".to_string())
                })?);
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "missing v1 signature".to_string(),
        ));
    }

    Ok((timestamp, signatures))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(timestamp: i64, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{body}").as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(now, body);
        assert!(verify_signature(&header, body, &SecretString::from(SECRET), now).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let now = 1_700_000_000;
        let header = sign(now, r#"{"id":"evt_1"}"#);
        let result = verify_signature(&header, r#"{"id":"evt_2"}"#, &SecretString::from(SECRET), now);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = r#"{"id":"evt_1"}"#;
        let signed_at = 1_700_000_000;
        let header = sign(signed_at, body);
        let result = verify_signature(
            &header,
            body,
            &SecretString::from(SECRET),
            signed_at + TIMESTAMP_TOLERANCE_SECS + 1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rotated_secret_extra_signatures() {
        let body = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let valid = sign(now, body);
        // Prepend a stale signature from an old secret
        let header = format!("t={now},v1={},{}", "0".repeat(64), &valid[valid.find("v1=").unwrap()..]);
        assert!(verify_signature(&header, body, &SecretString::from(SECRET), now).is_ok());
    }

    #[test]
    fn test_malformed_header_rejected() {
        let result = verify_signature("garbage", "{}", &SecretString::from(SECRET), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_event_parse_checkout_session() {
        let payload = r#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "url": null,
                "payment_status": "paid",
                "amount_total": 1999,
                "metadata": { "user_id": "7" }
            } }
        }"#;

        let event = Event::parse(payload).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        let session = event.checkout_session().unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert!(session.is_paid());
    }
}
