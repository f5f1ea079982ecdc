//! hCaptcha-compatible site verification client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::schema::{CaptchaConfig, TEST_CAPTCHA_SECRET};
use crate::observability::metrics;
use crate::verification::HumanVerifier;

/// Body returned by the `siteverify` endpoint.
#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verifies tokens against an hCaptcha-style `siteverify` endpoint.
pub struct HCaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl HCaptchaVerifier {
    /// Create a verifier with an explicit secret.
    pub fn new(verify_url: impl Into<String>, secret: impl Into<String>, timeout: Duration) -> Self {
        // Building only fails when the TLS backend cannot initialise; fall
        // back to a client without our timeout rather than refusing to start.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to build verification client, using defaults");
                reqwest::Client::new()
            });

        Self {
            client,
            verify_url: verify_url.into(),
            secret: secret.into(),
        }
    }

    /// Create a verifier reading the secret from the configured environment
    /// variable, falling back to the provider's public test secret.
    pub fn from_config(config: &CaptchaConfig) -> Self {
        let secret = match std::env::var(&config.secret_env) {
            Ok(secret) if !secret.trim().is_empty() => secret.trim().to_string(),
            _ => {
                tracing::warn!(
                    env = %config.secret_env,
                    "Captcha secret not set, using the public test secret"
                );
                TEST_CAPTCHA_SECRET.to_string()
            }
        };

        Self::new(
            config.verify_url.clone(),
            secret,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn site_verify(&self, token: &str) -> Result<SiteVerifyResponse, reqwest::Error> {
        self.client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await?
            .error_for_status()?
            .json::<SiteVerifyResponse>()
            .await
    }
}

#[async_trait]
impl HumanVerifier for HCaptchaVerifier {
    async fn verify(&self, token: &str) -> bool {
        let passed = match self.site_verify(token).await {
            Ok(reply) if reply.success => true,
            Ok(reply) => {
                tracing::info!(error_codes = ?reply.error_codes, "Captcha rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Captcha verification failed");
                false
            }
        };

        metrics::record_verification(passed);
        passed
    }
}

impl std::fmt::Debug for HCaptchaVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HCaptchaVerifier")
            .field("verify_url", &self.verify_url)
            .finish_non_exhaustive()
    }
}
