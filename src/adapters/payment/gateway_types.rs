//! ZaloPay wire types.
//!
//! These types mirror the gateway's JSON as it appears on the wire: the
//! order-creation response, the callback envelope (`{data, mac, type}`),
//! and the transaction record carried inside `data`. They parse actual
//! gateway payloads and map to domain types for further processing.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Hex Helpers
// ════════════════════════════════════════════════════════════════════════════════

/// Encode bytes to a lowercase hex string.
///
/// The gateway transmits all HMAC digests as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode a hex string to bytes. Accepts either case.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}

// ════════════════════════════════════════════════════════════════════════════════
// Order Creation
// ════════════════════════════════════════════════════════════════════════════════

/// Response from the gateway's `/v2/create` endpoint.
///
/// `return_code == 1` means the order was accepted and `order_url` points at
/// the payment page. Any other code is a rejection explained by
/// `return_message` and the more specific `sub_return_code`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZaloPayCreateResponse {
    /// Gateway result code (1 = success).
    pub return_code: i32,

    /// Human-readable result description.
    #[serde(default)]
    pub return_message: String,

    /// Detailed result code for failures.
    #[serde(default)]
    pub sub_return_code: i32,

    /// Detailed result description for failures.
    #[serde(default)]
    pub sub_return_message: String,

    /// URL the user completes payment at (present on success).
    #[serde(default)]
    pub order_url: String,

    /// Token for app-to-app payment flows.
    #[serde(default)]
    pub zp_trans_token: String,
}

impl ZaloPayCreateResponse {
    /// Whether the gateway accepted the order.
    pub fn is_success(&self) -> bool {
        self.return_code == 1
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payment Callback
// ════════════════════════════════════════════════════════════════════════════════

/// Callback envelope as POSTed by the gateway.
///
/// `data` is a JSON string describing the completed transaction; `mac` is
/// HMAC-SHA256 over that exact string, keyed with the callback key. The
/// string must be authenticated before its contents are trusted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZaloPayCallback {
    /// Raw transaction record, JSON-encoded.
    pub data: String,

    /// Lowercase hex HMAC-SHA256 of `data`.
    pub mac: String,

    /// Callback kind (1 = order paid).
    #[serde(rename = "type", default = "default_callback_type")]
    pub callback_type: i32,
}

fn default_callback_type() -> i32 {
    1
}

/// Transaction record carried inside the callback `data` string.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZaloPayCallbackData {
    /// Merchant application id.
    pub app_id: i64,

    /// Merchant transaction id, as sent at order creation.
    pub app_trans_id: String,

    /// User identifier the merchant supplied at order creation.
    pub app_user: String,

    /// Amount charged, in VND.
    pub amount: i64,

    /// Order creation time (Unix millis), echoed from the create request.
    pub app_time: i64,

    /// Merchant data echoed verbatim from the create request.
    pub embed_data: String,

    /// Item list echoed verbatim from the create request.
    #[serde(default)]
    pub item: String,

    /// Gateway-assigned transaction id.
    pub zp_trans_id: i64,

    /// When the gateway processed the charge (Unix millis).
    pub server_time: i64,

    /// Payment channel code.
    #[serde(default)]
    pub channel: i32,

    /// Gateway-side user identifier.
    #[serde(default)]
    pub merchant_user_id: String,

    /// Fee charged to the user, in VND.
    #[serde(default)]
    pub user_fee_amount: i64,

    /// Discount applied, in VND.
    #[serde(default)]
    pub discount_amount: i64,
}

/// Merchant data embedded in `embed_data` at order creation.
///
/// This is the round trip that ties a gateway callback back to an internal
/// user and plan without a lookup table on the merchant side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbeddedOrderData {
    /// Internal user id the order belongs to.
    pub user_id: String,

    /// Plan code being purchased.
    pub plan_code: String,
}
