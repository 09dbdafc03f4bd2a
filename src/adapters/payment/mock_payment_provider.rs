//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests, and for local development without gateway
//! credentials. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking
//! - Callback event simulation

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{CallbackEvent, CreateOrderRequest, PaymentError, PaymentOrder, PaymentProvider};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Configure responses
/// mock.set_order(PaymentOrder { order_id: "240115_abc".into(), ... });
///
/// // Inject errors
/// mock.set_error(PaymentError::network("Test outage"));
///
/// // Use in tests
/// let result = mock.create_order(request).await;
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Next order to return from `create_order`.
    next_order: Option<PaymentOrder>,

    /// Next event to return from `verify_callback`.
    next_event: Option<CallbackEvent>,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Callback verification behavior.
    verify_mode: CallbackVerifyMode,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

/// How to handle callback verification.
#[derive(Default, Clone)]
enum CallbackVerifyMode {
    /// Accept any payload and return the configured event.
    #[default]
    AcceptAll,

    /// Always fail verification.
    AlwaysFail,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails all callback verifications.
    pub fn rejecting_callbacks() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().verify_mode = CallbackVerifyMode::AlwaysFail;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the order to return on the next `create_order` call.
    pub fn set_order(&self, order: PaymentOrder) {
        self.inner.lock().unwrap().next_order = Some(order);
    }

    /// Set the event to return on the next `verify_callback` call.
    pub fn set_callback_event(&self, event: CallbackEvent) {
        self.inner.lock().unwrap().next_event = Some(event);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.inner.lock().unwrap();

        // Check method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Check global error (consumes it)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<PaymentOrder, PaymentError> {
        self.record_call(
            "create_order",
            vec![
                request.user_id.to_string(),
                request.plan_code.clone(),
                request.amount.to_string(),
            ],
        );
        self.check_error("create_order")?;

        let mut state = self.inner.lock().unwrap();

        let order = state.next_order.take().unwrap_or_else(|| {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let order_id = format!("{}_mock{}", chrono::Utc::now().format("%y%m%d"), &suffix[..8]);
            PaymentOrder {
                order_url: format!("https://sb-openapi.zalopay.vn/mock/pay/{}", order_id),
                order_id,
            }
        });

        Ok(order)
    }

    async fn verify_callback(&self, body: &[u8]) -> Result<CallbackEvent, PaymentError> {
        self.record_call("verify_callback", vec![body.len().to_string()]);
        self.check_error("verify_callback")?;

        let mut state = self.inner.lock().unwrap();

        if matches!(state.verify_mode, CallbackVerifyMode::AlwaysFail) {
            return Err(PaymentError::invalid_callback("Mock verification failed"));
        }

        let event = state.next_event.take().unwrap_or_else(|| CallbackEvent {
            provider: "zalopay".to_string(),
            order_id: "240115_mockorder".to_string(),
            provider_txn_id: "240115000000001".to_string(),
            user_id: UserId::new("mock-user").expect("static mock id is valid"),
            plan_code: "premium_monthly".to_string(),
            amount: 99_000,
            paid_at: Timestamp::now(),
        });

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_request() -> CreateOrderRequest {
        CreateOrderRequest {
            user_id: UserId::new("user-1").unwrap(),
            plan_code: "premium_monthly".to_string(),
            plan_name: "Premium Monthly".to_string(),
            amount: 99_000,
        }
    }

    #[tokio::test]
    async fn returns_configured_order() {
        let mock = MockPaymentProvider::new();
        mock.set_order(PaymentOrder {
            order_id: "240115_custom".to_string(),
            order_url: "https://pay.example.com/240115_custom".to_string(),
        });

        let order = mock.create_order(order_request()).await.unwrap();

        assert_eq!(order.order_id, "240115_custom");
    }

    #[tokio::test]
    async fn generates_default_order_when_unconfigured() {
        let mock = MockPaymentProvider::new();

        let order = mock.create_order(order_request()).await.unwrap();

        assert!(order.order_id.contains("_mock"));
        assert!(order.order_url.contains(&order.order_id));
    }

    #[tokio::test]
    async fn injected_error_is_consumed_once() {
        let mock = MockPaymentProvider::new();
        mock.set_error(PaymentError::network("Test outage"));

        assert!(mock.create_order(order_request()).await.is_err());
        assert!(mock.create_order(order_request()).await.is_ok());
    }

    #[tokio::test]
    async fn method_error_persists_across_calls() {
        let mock = MockPaymentProvider::new();
        mock.set_method_error("verify_callback", PaymentError::invalid_callback("bad mac"));

        assert!(mock.verify_callback(b"{}").await.is_err());
        assert!(mock.verify_callback(b"{}").await.is_err());
        assert!(mock.create_order(order_request()).await.is_ok());
    }

    #[tokio::test]
    async fn rejecting_mock_fails_verification() {
        let mock = MockPaymentProvider::rejecting_callbacks();

        let err = mock.verify_callback(b"{}").await.unwrap_err();

        assert!(err.message.contains("Mock verification failed"));
    }

    #[tokio::test]
    async fn records_calls_for_assertions() {
        let mock = MockPaymentProvider::new();

        let _ = mock.create_order(order_request()).await;
        let _ = mock.verify_callback(b"{}").await;

        assert!(mock.was_called("create_order"));
        assert_eq!(mock.call_count("verify_callback"), 1);
        assert_eq!(mock.calls()[0].args[1], "premium_monthly");

        mock.clear_calls();
        assert!(!mock.was_called("create_order"));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockPaymentProvider::new();
        let clone = mock.clone();

        let _ = clone.create_order(order_request()).await;

        assert!(mock.was_called("create_order"));
    }
}
