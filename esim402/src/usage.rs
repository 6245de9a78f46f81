//! Verification and classification of provider usage webhooks.
//!
//! The provider signs each webhook body with HMAC-SHA256 under a shared
//! secret and sends the base64 digest in the `x-signature` header. When no
//! secret is configured verification is skipped entirely.
//!
//! Accepted events are classified into [`UsageAlert`]s. Dispatching
//! notifications for those alerts is left to the caller.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::proto::UsageEvent;

type HmacSha256 = Hmac<Sha256>;

/// Fraction of the allotment after which a bundle counts as running low.
pub const LOW_DATA_THRESHOLD: f64 = 0.8;

/// Provider alert tag for a fully used bundle.
pub const DEPLETED_ALERT: &str = "depleted";

/// Errors produced while accepting a webhook.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Signature missing, undecodable, or not matching the body.
    #[error("Invalid signature")]
    InvalidSignature,
    /// Body is not a valid usage event.
    #[error("malformed usage event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Signal derived from a usage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageAlert {
    /// At least [`LOW_DATA_THRESHOLD`] of the allotment is used.
    LowData,
    /// The provider reported the bundle as depleted.
    Depleted,
}

/// A verified usage event with its derived signals.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    /// The event as sent by the provider.
    pub event: UsageEvent,
    /// `(initial - remaining) / initial`; zero for unlimited or empty bundles.
    pub usage_ratio: f64,
    /// Signals raised by this event.
    pub alerts: Vec<UsageAlert>,
}

impl UsageReport {
    /// Classifies an event.
    #[must_use]
    pub fn classify(event: UsageEvent) -> Self {
        let usage_ratio = usage_ratio(&event);
        let mut alerts = Vec::new();
        if usage_ratio >= LOW_DATA_THRESHOLD {
            alerts.push(UsageAlert::LowData);
        }
        if event.alert_type == DEPLETED_ALERT {
            alerts.push(UsageAlert::Depleted);
        }
        Self {
            event,
            usage_ratio,
            alerts,
        }
    }

    /// Usage as a whole percentage, rounded half away from zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn usage_percentage(&self) -> i64 {
        (self.usage_ratio * 100.0).round() as i64
    }

    /// Returns `true` if `alert` was raised.
    #[must_use]
    pub fn has_alert(&self, alert: UsageAlert) -> bool {
        self.alerts.contains(&alert)
    }
}

fn usage_ratio(event: &UsageEvent) -> f64 {
    let bundle = &event.bundle;
    if bundle.unlimited || bundle.initial_quantity <= 0.0 {
        return 0.0;
    }
    (bundle.initial_quantity - bundle.remaining_quantity) / bundle.initial_quantity
}

/// Verifies webhook signatures against an optional shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl WebhookVerifier {
    /// Creates a verifier. `None` or an empty secret disables verification.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
        }
    }

    /// Returns `true` if signatures are checked.
    #[must_use]
    pub const fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks `signature` (base64 HMAC-SHA256) against `body`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidSignature`] if a secret is configured and
    /// the signature is absent, not valid base64, or does not match.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), WebhookError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        let provided = signature
            .and_then(|s| BASE64_STANDARD.decode(s.trim()).ok())
            .ok_or(WebhookError::InvalidSignature)?;
        let mut mac = new_mac(secret)?;
        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| WebhookError::InvalidSignature)
    }

    /// Verifies, parses, and classifies a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidSignature`] before parsing if
    /// verification fails, or [`WebhookError::Malformed`] if the body is not
    /// a usage event.
    pub fn process(&self, body: &[u8], signature: Option<&str>) -> Result<UsageReport, WebhookError> {
        self.verify(body, signature)?;
        let event: UsageEvent = serde_json::from_slice(body)?;
        let report = UsageReport::classify(event);

        #[cfg(feature = "telemetry")]
        {
            let bundle = &report.event.bundle;
            tracing::info!(
                iccid = %report.event.iccid,
                alert_type = %report.event.alert_type,
                bundle = %bundle.name,
                remaining = bundle.remaining_quantity,
                initial = bundle.initial_quantity,
                "eSIM usage update"
            );
            if report.has_alert(UsageAlert::LowData) {
                tracing::warn!(iccid = %report.event.iccid, bundle = %bundle.name, "Data plan is 80% used");
            }
            if report.has_alert(UsageAlert::Depleted) {
                tracing::warn!(iccid = %report.event.iccid, bundle = %bundle.name, "Data plan is fully depleted");
            }
        }

        Ok(report)
    }
}

/// Computes the base64 HMAC-SHA256 signature the provider sends for `body`.
///
/// # Errors
///
/// Never fails for HMAC, which accepts keys of any length; the error is kept
/// to avoid panicking on a future key-length rule.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = new_mac(secret.as_bytes())?;
    mac.update(body);
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

fn new_mac(secret: &[u8]) -> Result<HmacSha256, WebhookError> {
    HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn body(initial: f64, remaining: f64, alert: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "iccid": "8944000000000000001",
            "alertType": alert,
            "bundle": {
                "id": "b-1",
                "reference": "r-1",
                "name": "esim_1GB_7D_FR_V2",
                "description": "1GB France",
                "initialQuantity": initial,
                "remainingQuantity": remaining,
                "startTime": "2026-10-01T00:00:00Z",
                "endTime": "2026-10-08T00:00:00Z",
                "unlimited": false
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_accepts_matching_signature() {
        let verifier = WebhookVerifier::new(Some(SECRET));
        let raw = body(10.0, 5.0, "utilisation");
        let signature = sign(SECRET, &raw).unwrap();
        assert!(verifier.verify(&raw, Some(&signature)).is_ok());
    }

    #[test]
    fn test_rejects_any_single_byte_mutation() {
        let verifier = WebhookVerifier::new(Some(SECRET));
        let raw = body(10.0, 5.0, "utilisation");
        let signature = sign(SECRET, &raw).unwrap();

        for i in 0..raw.len() {
            let mut mutated = raw.clone();
            mutated[i] ^= 0x01;
            assert!(
                verifier.verify(&mutated, Some(&signature)).is_err(),
                "body byte {i}"
            );
        }
        for i in 0..signature.len() {
            let mut mutated = signature.clone().into_bytes();
            mutated[i] = if mutated[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(
                verifier.verify(&raw, Some(&mutated)).is_err(),
                "signature byte {i}"
            );
        }
    }

    #[test]
    fn test_rejects_missing_signature_when_enforcing() {
        let verifier = WebhookVerifier::new(Some(SECRET));
        let raw = body(10.0, 5.0, "");
        assert!(matches!(
            verifier.process(&raw, None),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn test_no_secret_accepts_anything() {
        let verifier = WebhookVerifier::new(None);
        assert!(!verifier.is_enforcing());
        let raw = body(10.0, 5.0, "");
        assert!(verifier.verify(&raw, None).is_ok());
        assert!(verifier.verify(&raw, Some("garbage")).is_ok());
        assert!(WebhookVerifier::new(Some("")).verify(&raw, None).is_ok());
    }

    #[test]
    fn test_signature_checked_before_parsing() {
        let verifier = WebhookVerifier::new(Some(SECRET));
        assert!(matches!(
            verifier.process(b"not json", Some("AAAA")),
            Err(WebhookError::InvalidSignature)
        ));
        assert!(matches!(
            WebhookVerifier::new(None).process(b"not json", None),
            Err(WebhookError::Malformed(_))
        ));
    }

    #[test]
    fn test_eighty_percent_is_low_data() {
        let report = WebhookVerifier::new(None)
            .process(&body(10.0, 2.0, "utilisation"), None)
            .unwrap();
        assert!((report.usage_ratio - 0.8).abs() < 1e-12);
        assert_eq!(report.usage_percentage(), 80);
        assert_eq!(report.alerts, vec![UsageAlert::LowData]);
    }

    #[test]
    fn test_depleted_alert() {
        let report = WebhookVerifier::new(None)
            .process(&body(5.0, 0.0, "depleted"), None)
            .unwrap();
        assert!(report.has_alert(UsageAlert::Depleted));
        assert!(report.has_alert(UsageAlert::LowData));
        assert_eq!(report.usage_percentage(), 100);
    }

    #[test]
    fn test_light_usage_raises_nothing() {
        let report = WebhookVerifier::new(None)
            .process(&body(10.0, 9.0, "utilisation"), None)
            .unwrap();
        assert!(report.alerts.is_empty());
        assert_eq!(report.usage_percentage(), 10);
    }

    #[test]
    fn test_zero_initial_quantity_does_not_divide() {
        let report = WebhookVerifier::new(None)
            .process(&body(0.0, 0.0, ""), None)
            .unwrap();
        assert!(report.usage_ratio.abs() < f64::EPSILON);
        assert!(report.alerts.is_empty());
    }
}
