//! ZaloPay payment gateway adapter.
//!
//! Implements the `PaymentProvider` port against the ZaloPay v2 API,
//! including:
//! - One-shot payment order creation
//! - Callback mac verification
//!
//! # Security
//!
//! - Orders are signed and callbacks verified with HMAC-SHA256, compared in
//!   constant time
//! - Callback timestamps are validated to prevent replay attacks
//!   (5-minute window)
//! - Gateway keys are handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! Required environment variables:
//! - `ZALOPAY_APP_ID`: Merchant application id
//! - `ZALOPAY_KEY1`: Order signing key
//! - `ZALOPAY_KEY2`: Callback verification key

mod gateway_types;
mod mock_payment_provider;
mod zalopay;

pub use gateway_types::{
    EmbeddedOrderData, ZaloPayCallback, ZaloPayCallbackData, ZaloPayCreateResponse,
};
pub use mock_payment_provider::MockPaymentProvider;
pub use zalopay::{ZaloPayAdapter, ZaloPayConfig};
