//! Server-side purchase plumbing.
//!
//! - [`fulfillment`] - typed client for the eSIM provider, behind the [`Fulfillment`] trait
//! - [`paygate`] - decides whether a purchase is paid and builds the 402 otherwise
//! - [`orchestrator`] - validate → commit sequencing for paid purchases
//!
//! A purchase handler prices the bundle, asks the [`Paygate`] whether the
//! request carries a credential, and either returns the [`PaymentRequired`]
//! response or hands the quote to the [`OrderOrchestrator`].

pub mod error;
pub mod fulfillment;
pub mod orchestrator;
pub mod paygate;

pub use error::{OrderError, VerificationError};
pub use fulfillment::{Fulfillment, FulfillmentClient, FulfillmentError};
pub use orchestrator::{OrderOrchestrator, qr_code_url};
pub use paygate::{PaymentCredential, PaymentRequired, Paygate};
