//! ZaloPay payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the ZaloPay v2 gateway.
//! Handles one-shot order creation and payment callback verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signatures on both legs: `key1` signs outgoing orders,
//!   `key2` authenticates incoming callbacks
//! - Constant-time mac comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Keys handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = ZaloPayConfig::new("2553", key1, key2)
//!     .with_callback_url("https://api.example.com/api/payments/zalopay/callback");
//! let adapter = ZaloPayAdapter::new(config);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{CallbackEvent, CreateOrderRequest, PaymentError, PaymentOrder, PaymentProvider};

use super::gateway_types::{
    hex_decode, hex_encode, EmbeddedOrderData, ZaloPayCallback, ZaloPayCallbackData,
    ZaloPayCreateResponse,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for callback events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Sandbox gateway endpoint. Production uses `openapi.zalopay.vn`.
const DEFAULT_ENDPOINT: &str = "https://sb-openapi.zalopay.vn";

/// ZaloPay gateway configuration.
#[derive(Clone)]
pub struct ZaloPayConfig {
    /// Merchant application id assigned by the gateway.
    app_id: String,

    /// Order signing key (signs `/v2/create` requests).
    key1: SecretString,

    /// Callback verification key (authenticates gateway callbacks).
    key2: SecretString,

    /// Gateway base URL.
    endpoint: String,

    /// Public URL the gateway POSTs payment results to. Empty means the
    /// gateway falls back to the URL registered with the merchant account.
    callback_url: String,
}

impl ZaloPayConfig {
    /// Create a new gateway configuration pointing at the sandbox.
    pub fn new(
        app_id: impl Into<String>,
        key1: impl Into<String>,
        key2: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            key1: SecretString::new(key1.into()),
            key2: SecretString::new(key2.into()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            callback_url: String::new(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `ZALOPAY_APP_ID`
    /// - `ZALOPAY_KEY1`
    /// - `ZALOPAY_KEY2`
    /// - `ZALOPAY_ENDPOINT` (optional, defaults to sandbox)
    /// - `ZALOPAY_CALLBACK_URL` (optional)
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let app_id = std::env::var("ZALOPAY_APP_ID")?;
        let key1 = std::env::var("ZALOPAY_KEY1")?;
        let key2 = std::env::var("ZALOPAY_KEY2")?;
        let endpoint =
            std::env::var("ZALOPAY_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let callback_url = std::env::var("ZALOPAY_CALLBACK_URL").unwrap_or_default();

        Ok(Self {
            app_id,
            key1: SecretString::new(key1),
            key2: SecretString::new(key2),
            endpoint,
            callback_url,
        })
    }

    /// Set a custom gateway endpoint (production or a test double).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the callback URL sent with each order.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    /// Whether this configuration points at the sandbox gateway.
    pub fn is_sandbox(&self) -> bool {
        self.endpoint.contains("sb-openapi")
    }
}

/// ZaloPay payment provider adapter.
///
/// Implements `PaymentProvider` for ZaloPay v2 gateway integration.
pub struct ZaloPayAdapter {
    config: ZaloPayConfig,
    http_client: reqwest::Client,
}

impl ZaloPayAdapter {
    /// Create a new ZaloPay adapter with the given configuration.
    pub fn new(config: ZaloPayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Authenticate a callback envelope using HMAC-SHA256 over `data`.
    ///
    /// # Security
    ///
    /// Uses constant-time comparison to prevent timing attacks. The `data`
    /// string must not be trusted until this check passes.
    fn verify_mac(&self, callback: &ZaloPayCallback) -> Result<(), PaymentError> {
        let provided = hex_decode(&callback.mac)
            .ok_or_else(|| PaymentError::invalid_callback("Malformed mac encoding"))?;

        let mut mac = HmacSha256::new_from_slice(self.config.key2.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(callback.data.as_bytes());
        let expected = mac.finalize().into_bytes();

        let expected_bytes: &[u8] = expected.as_slice();
        if expected_bytes.ct_eq(provided.as_slice()).unwrap_u8() != 1 {
            tracing::warn!("Callback mac mismatch - rejecting payload");
            return Err(PaymentError::invalid_callback("Invalid mac"));
        }

        Ok(())
    }

    /// Validate the callback timestamp to prevent replay attacks.
    fn check_freshness(&self, data: &ZaloPayCallbackData) -> Result<(), PaymentError> {
        let now = Utc::now().timestamp();
        let event_time = data.server_time / 1000;
        let age = now - event_time;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = event_time,
                current_time = now,
                age_secs = age,
                "Callback event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_callback(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = event_time,
                current_time = now,
                "Callback event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_callback("Event timestamp in future"));
        }

        Ok(())
    }

    /// Sign a payload with the given key, returning lowercase hex.
    fn hmac_hex(key: &SecretString, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        hex_encode(&mac.finalize().into_bytes())
    }
}

/// Build a merchant transaction id for a new order.
///
/// The gateway requires the id to be prefixed with the creation date as
/// `yymmdd` and unique within that day.
fn new_app_trans_id(now: DateTime<Utc>) -> String {
    format!("{}_{}", now.format("%y%m%d"), uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl PaymentProvider for ZaloPayAdapter {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<PaymentOrder, PaymentError> {
        let url = format!("{}/v2/create", self.config.endpoint);

        let now = Utc::now();
        let app_time = now.timestamp_millis();
        let app_trans_id = new_app_trans_id(now);
        let app_user = request.user_id.as_str().to_string();
        let item = "[]";

        let embed_data = serde_json::to_string(&EmbeddedOrderData {
            user_id: request.user_id.as_str().to_string(),
            plan_code: request.plan_code.clone(),
        })
        .map_err(|e| PaymentError::invalid_order(format!("Failed to encode order data: {}", e)))?;

        // The gateway verifies the order mac over this exact pipe-delimited
        // field sequence. Reordering or re-serializing any field breaks it.
        let mac_payload = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.config.app_id, app_trans_id, app_user, request.amount, app_time, embed_data, item
        );
        let mac = Self::hmac_hex(&self.config.key1, mac_payload.as_bytes());

        let mut params = vec![
            ("app_id", self.config.app_id.clone()),
            ("app_user", app_user),
            ("app_time", app_time.to_string()),
            ("amount", request.amount.to_string()),
            ("app_trans_id", app_trans_id.clone()),
            ("embed_data", embed_data),
            ("item", item.to_string()),
            ("description", format!("Membership purchase: {}", request.plan_name)),
            ("mac", mac),
        ];

        if !self.config.callback_url.is_empty() {
            params.push(("callback_url", self.config.callback_url.clone()));
        }

        let response = self
            .http_client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(error = %error_text, "ZaloPay create order failed");
            return Err(PaymentError::provider(format!(
                "Gateway HTTP error: {}",
                error_text
            )));
        }

        let created: ZaloPayCreateResponse = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse gateway response: {}", e))
        })?;

        if !created.is_success() {
            tracing::warn!(
                return_code = created.return_code,
                sub_return_code = created.sub_return_code,
                order_id = %app_trans_id,
                "Gateway rejected payment order"
            );
            return Err(PaymentError::provider(format!(
                "Gateway rejected order: {}",
                created.return_message
            ))
            .with_provider_code(created.sub_return_code.to_string()));
        }

        tracing::info!(
            order_id = %app_trans_id,
            amount = request.amount,
            plan_code = %request.plan_code,
            "Created payment order"
        );

        Ok(PaymentOrder {
            order_id: app_trans_id,
            order_url: created.order_url,
        })
    }

    async fn verify_callback(&self, body: &[u8]) -> Result<CallbackEvent, PaymentError> {
        let callback: ZaloPayCallback = serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse callback payload");
            PaymentError::invalid_callback(format!("Invalid JSON: {}", e))
        })?;

        self.verify_mac(&callback)?;

        let data: ZaloPayCallbackData = serde_json::from_str(&callback.data).map_err(|e| {
            tracing::warn!(error = %e, "Authenticated callback carries malformed data");
            PaymentError::invalid_callback(format!("Invalid transaction data: {}", e))
        })?;

        self.check_freshness(&data)?;

        let embedded: EmbeddedOrderData = serde_json::from_str(&data.embed_data).map_err(|e| {
            PaymentError::invalid_callback(format!("Invalid embedded order data: {}", e))
        })?;

        let EmbeddedOrderData { user_id, plan_code } = embedded;
        let user_id = UserId::new(user_id)
            .map_err(|e| PaymentError::invalid_callback(format!("Invalid embedded user id: {}", e)))?;

        Ok(CallbackEvent {
            provider: "zalopay".to_string(),
            order_id: data.app_trans_id,
            provider_txn_id: data.zp_trans_id.to_string(),
            user_id,
            plan_code,
            amount: data.amount,
            paid_at: Timestamp::from_unix_millis(data.server_time),
        })
    }
}
