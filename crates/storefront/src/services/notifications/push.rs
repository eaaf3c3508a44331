//! Web Push delivery.
//!
//! Payloads are aes128gcm-encrypted against the subscription's `p256dh` and
//! `auth` keys, and every request carries a per-endpoint VAPID JWT signed
//! with the configured ES256 private key. A `404` or `410` response means
//! the browser has dropped the subscription; the caller purges it.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use web_push::{
    ContentEncoding, HyperWebPushClient, PartialVapidSignatureBuilder, SubscriptionInfo,
    URL_SAFE_NO_PAD, VapidSignature, VapidSignatureBuilder, WebPushClient as _, WebPushError,
    WebPushMessageBuilder,
};

use sparehub_core::OrderId;

use crate::config::PushConfig;
use crate::models::PushSubscription;

/// Seconds a push service may hold an undelivered message.
const PUSH_TTL_SECS: u32 = 86_400;

/// Notification content handed to the push transport.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Event kind, e.g. `order_shipped` or `new_order`.
    pub kind: &'static str,
    pub order_id: OrderId,
}

/// Errors from a single push delivery attempt.
#[derive(Debug, Error)]
pub enum PushError {
    /// The endpoint no longer exists; the subscription should be purged.
    #[error("subscription gone: {endpoint}")]
    Gone { endpoint: String },

    /// The message could not be signed, encrypted, or delivered.
    #[error("push delivery to {endpoint} failed: {source}")]
    Rejected {
        endpoint: String,
        source: WebPushError,
    },
}

/// Delivery seam for push messages. The production implementation is
/// [`WebPushClient`]; tests substitute a scripted stub.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver one message to one subscription endpoint.
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        message: &PushMessage,
    ) -> Result<(), PushError>;
}

/// Push transport signing VAPID tokens and encrypting payloads per the Web
/// Push protocol.
#[derive(Clone)]
pub struct WebPushClient {
    client: HyperWebPushClient,
    signer: PartialVapidSignatureBuilder,
    subject: String,
}

impl std::fmt::Debug for WebPushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPushClient")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl WebPushClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `WebPushError::InvalidCryptoKeys` when the configured VAPID
    /// private key is not a base64url-encoded ES256 key.
    pub fn new(config: &PushConfig) -> Result<Self, WebPushError> {
        let signer = VapidSignatureBuilder::from_base64_no_sub(
            config.vapid_private_key.expose_secret(),
            URL_SAFE_NO_PAD,
        )?;

        Ok(Self {
            client: HyperWebPushClient::new(),
            signer,
            subject: config.vapid_subject.clone(),
        })
    }

    /// Sign the VAPID claims for one endpoint. The `aud` and `exp` claims
    /// are derived from the endpoint; only `sub` comes from configuration.
    fn vapid_signature(&self, info: &SubscriptionInfo) -> Result<VapidSignature, WebPushError> {
        let mut builder = self.signer.clone().add_sub_info(info);
        builder.add_claim("sub", self.subject.clone());
        builder.build()
    }

    async fn send_encrypted(
        &self,
        info: &SubscriptionInfo,
        payload: &[u8],
    ) -> Result<(), WebPushError> {
        let signature = self.vapid_signature(info)?;

        let mut builder = WebPushMessageBuilder::new(info);
        builder.set_ttl(PUSH_TTL_SECS);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);

        self.client.send(builder.build()?).await
    }
}

#[async_trait]
impl PushTransport for WebPushClient {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        message: &PushMessage,
    ) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let payload = json!({
            "title": message.title,
            "body": message.body,
            "data": {
                "order_id": message.order_id,
                "type": message.kind,
            },
        })
        .to_string();

        match self.send_encrypted(&info, payload.as_bytes()).await {
            Ok(()) => Ok(()),
            Err(WebPushError::EndpointNotFound | WebPushError::EndpointNotValid) => {
                Err(PushError::Gone {
                    endpoint: subscription.endpoint.clone(),
                })
            }
            Err(source) => Err(PushError::Rejected {
                endpoint: subscription.endpoint.clone(),
                source,
            }),
        }
    }
}

/// Whether a delivery error means the subscription is dead and should be
/// removed rather than retried.
#[must_use]
pub fn is_gone(error: &PushError) -> bool {
    matches!(error, PushError::Gone { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    // Throwaway ES256 key in the raw base64url form browsers and VAPID
    // generators emit.
    const TEST_PRIVATE_KEY: &str = "IQ9Ur0ykXoHS9gzfYX0aBjy9lvdrjx_PFUXmie9YRcY";

    fn test_config(private_key: &str) -> PushConfig {
        PushConfig {
            vapid_public_key: "BPub".to_string(),
            vapid_private_key: SecretString::from(private_key),
            vapid_subject: "mailto:ops@sparehub.test".to_string(),
        }
    }

    #[test]
    fn test_gone_classification() {
        let gone = PushError::Gone {
            endpoint: "https://push.example/abc".into(),
        };
        let rejected = PushError::Rejected {
            endpoint: "https://push.example/abc".into(),
            source: WebPushError::ServerError(None),
        };

        assert!(is_gone(&gone));
        assert!(!is_gone(&rejected));
    }

    #[test]
    fn test_authorization_token_is_a_signed_jwt_not_the_private_key() {
        let client = WebPushClient::new(&test_config(TEST_PRIVATE_KEY)).expect("valid key");
        let info = SubscriptionInfo::new("https://push.example.com/sub/abc", "p256dh", "auth");

        let signature = client.vapid_signature(&info).expect("sign");

        assert!(!signature.auth_t.contains(TEST_PRIVATE_KEY));
        // A compact JWS: three dot-separated base64url segments.
        assert_eq!(signature.auth_t.matches('.').count(), 2);
    }

    #[test]
    fn test_garbage_private_key_is_rejected_at_construction() {
        let err = WebPushClient::new(&test_config("not-a-key")).expect_err("must fail");
        assert!(matches!(err, WebPushError::InvalidCryptoKeys));
    }
}
