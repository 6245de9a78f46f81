//! HTTP constants for the storefront's x402 exchange.
//!
//! Header names are lowercase so they can build a `HeaderName` directly.

/// Scheme and prefix of a payment credential in the `authorization` header.
pub const CREDENTIAL_PREFIX: &str = "Bearer x402-";

/// Request header carrying the payment credential (client → server).
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Challenge summary in RFC 7235 form (server → client).
pub const WWW_AUTHENTICATE_HEADER: &str = "www-authenticate";

/// Flag header set on every 402 response.
pub const X_PAYMENT_REQUIRED_HEADER: &str = "x-payment-required";

/// Amount due in minor units.
pub const X_PAYMENT_AMOUNT_HEADER: &str = "x-payment-amount";

/// Currency of the amount due.
pub const X_PAYMENT_CURRENCY_HEADER: &str = "x-payment-currency";

/// Address that must receive the payment.
pub const X_PAYMENT_RECIPIENT_HEADER: &str = "x-payment-recipient";

/// Header carrying the HMAC of a provider usage webhook.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-signature";

/// `error` field of a 402 body.
pub const PAYMENT_REQUIRED_ERROR: &str = "Payment Required";

/// `message` field of a 402 body.
pub const PAYMENT_REQUIRED_MESSAGE: &str = "This endpoint requires x402 payment to access";
