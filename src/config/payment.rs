//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Sandbox gateway base URL; production uses `openapi.zalopay.vn`.
const SANDBOX_ENDPOINT: &str = "https://sb-openapi.zalopay.vn";

/// Payment configuration (ZaloPay gateway)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Use the in-process mock provider instead of the real gateway.
    /// Development convenience; rejected in production.
    #[serde(default)]
    pub use_mock: bool,

    /// Merchant application id assigned by the gateway
    #[serde(default)]
    pub app_id: String,

    /// Order signing key. Never logged.
    #[serde(default = "default_secret")]
    pub key1: SecretString,

    /// Callback verification key. Never logged.
    #[serde(default = "default_secret")]
    pub key2: SecretString,

    /// Gateway base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Public URL the gateway POSTs payment results to
    pub callback_url: Option<String>,
}

impl PaymentConfig {
    /// Whether the configured endpoint is the sandbox gateway
    pub fn is_sandbox(&self) -> bool {
        self.endpoint.contains("sb-openapi")
    }

    /// Validate payment configuration
    ///
    /// The mock provider and the sandbox gateway are both rejected in
    /// production; real credentials are required whenever the mock is off.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.use_mock {
            if *environment == Environment::Production {
                return Err(ValidationError::MockPaymentInProduction);
            }
            return Ok(());
        }

        if self.app_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__APP_ID"));
        }
        if self.key1.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__KEY1"));
        }
        if self.key2.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__KEY2"));
        }

        if let Some(url) = &self.callback_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidCallbackUrl);
            }
        }

        if *environment == Environment::Production && self.is_sandbox() {
            return Err(ValidationError::SandboxPaymentInProduction);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            use_mock: false,
            app_id: String::new(),
            key1: SecretString::new(String::new()),
            key2: SecretString::new(String::new()),
            endpoint: default_endpoint(),
            callback_url: None,
        }
    }
}

fn default_endpoint() -> String {
    SANDBOX_ENDPOINT.to_string()
}

fn default_secret() -> SecretString {
    SecretString::new(String::new())
}
