//! Human verification subsystem.
//!
//! # Design Decisions
//! - Fail closed: any transport error, timeout or malformed reply rejects
//! - No retries; the client resubmits with a fresh token
//! - The verifier is a trait so the orchestrator can be tested without the
//!   external service

pub mod hcaptcha;

use async_trait::async_trait;

pub use hcaptcha::HCaptchaVerifier;

/// Proof-of-humanity check for a client-supplied token.
#[async_trait]
pub trait HumanVerifier: Send + Sync {
    /// Returns true only when the verification service accepted the token.
    async fn verify(&self, token: &str) -> bool;
}
