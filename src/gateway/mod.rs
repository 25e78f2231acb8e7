//! Payment provider adapters.
//!
//! Each provider signs requests and callbacks its own way; `PaymentGateway`
//! puts them behind one closed set of operations selected by payment method.

pub mod momo;
pub mod zalopay;

use crate::domain::money::Money;
use crate::domain::order::{Order, PaymentMethod};
use crate::error::Result;
use hmac::{Hmac, Mac};
use momo::{MomoConfig, MomoGateway, MomoIpn};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use zalopay::{ZaloPayCallback, ZaloPayConfig, ZaloPayGateway};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `key`.
pub fn sign(key: &str, payload: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature over `payload`. An empty key never
/// verifies: anyone can compute a MAC under it.
pub fn verify_signature(key: &str, payload: &str, signature: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// What the buyer needs to complete a payment with the provider.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PaymentSession {
    pub payment_url: String,
    /// Provider-side transaction reference.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    pub order_code: &'a str,
    pub amount: Money,
    pub description: &'a str,
    pub return_url: Option<&'a str>,
}

/// An inbound provider notification, already parsed from its wire shape.
#[derive(Debug, Clone)]
pub enum CallbackPayload {
    Momo(MomoIpn),
    ZaloPay(ZaloPayCallback),
}

pub enum PaymentGateway {
    Momo(MomoGateway),
    ZaloPay(ZaloPayGateway),
}

impl PaymentGateway {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentGateway::Momo(_) => PaymentMethod::Momo,
            PaymentGateway::ZaloPay(_) => PaymentMethod::ZaloPay,
        }
    }

    pub async fn create_payment(&self, req: &PaymentRequest<'_>) -> Result<PaymentSession> {
        match self {
            PaymentGateway::Momo(g) => g.create_payment(req).await,
            PaymentGateway::ZaloPay(g) => g.create_payment(req).await,
        }
    }

    /// Recomputes the provider signature for `payload`. A payload from the
    /// other provider never verifies.
    pub fn verify_callback(&self, payload: &CallbackPayload) -> bool {
        match (self, payload) {
            (PaymentGateway::Momo(g), CallbackPayload::Momo(ipn)) => g.verify_callback(ipn),
            (PaymentGateway::ZaloPay(g), CallbackPayload::ZaloPay(cb)) => g.verify_callback(cb),
            _ => false,
        }
    }

    pub async fn query_status(&self, order: &Order) -> Result<ProviderStatus> {
        match self {
            PaymentGateway::Momo(g) => g.query_status(&order.order_code).await,
            PaymentGateway::ZaloPay(g) => {
                let app_trans_id = order
                    .payment_reference
                    .clone()
                    .unwrap_or_else(|| zalopay::app_trans_id(&order.order_code, order.created_at));
                g.query_status(&app_trans_id).await
            }
        }
    }
}

/// The configured gateways, looked up by payment method.
pub struct Gateways {
    momo: PaymentGateway,
    zalopay: PaymentGateway,
}

impl Gateways {
    /// Builds both gateways over one shared HTTP client with a per-request
    /// timeout.
    pub fn new(momo: MomoConfig, zalopay: ZaloPayConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            momo: PaymentGateway::Momo(MomoGateway::new(momo, client.clone())),
            zalopay: PaymentGateway::ZaloPay(ZaloPayGateway::new(zalopay, client)),
        })
    }

    pub fn for_method(&self, method: PaymentMethod) -> Option<&PaymentGateway> {
        match method {
            PaymentMethod::Momo => Some(&self.momo),
            PaymentMethod::ZaloPay => Some(&self.zalopay),
            _ => None,
        }
    }

    pub fn momo(&self) -> &PaymentGateway {
        &self.momo
    }

    pub fn zalopay(&self) -> &PaymentGateway {
        &self.zalopay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_known_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            sign("Jefe", "what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_signature() {
        let signature = sign("secret", "payload");
        assert!(verify_signature("secret", "payload", &signature));
        assert!(verify_signature("secret", "payload", &signature.to_uppercase()));
        assert!(!verify_signature("other", "payload", &signature));
        assert!(!verify_signature("secret", "payload!", &signature));
        assert!(!verify_signature("secret", "payload", "not-hex"));
        assert!(!verify_signature("secret", "payload", ""));
    }

    #[test]
    fn test_empty_key_never_verifies() {
        let signature = sign("", "payload");
        assert!(!verify_signature("", "payload", &signature));
        assert!(!verify_signature("", "", &sign("", "")));
    }

    #[test]
    fn test_for_method() {
        let gateways = Gateways::new(
            MomoConfig::default(),
            ZaloPayConfig::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            gateways.for_method(PaymentMethod::Momo).map(|g| g.method()),
            Some(PaymentMethod::Momo)
        );
        assert_eq!(
            gateways.for_method(PaymentMethod::ZaloPay).map(|g| g.method()),
            Some(PaymentMethod::ZaloPay)
        );
        assert!(gateways.for_method(PaymentMethod::CreditCard).is_none());
    }
}
