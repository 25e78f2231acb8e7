use super::{PaymentRequest, PaymentSession, ProviderStatus, sign, verify_signature};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

const APP_USER: &str = "coursepay";

/// Length of the `yymmdd_` prefix ZaloPay transaction ids carry.
const TRANS_ID_PREFIX_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct ZaloPayConfig {
    pub app_id: u32,
    pub key1: String,
    pub key2: String,
    pub create_endpoint: String,
    pub query_endpoint: String,
    pub callback_url: String,
    pub return_url: String,
}

impl Default for ZaloPayConfig {
    fn default() -> Self {
        Self {
            app_id: 2553,
            key1: String::new(),
            key2: String::new(),
            create_endpoint: "https://sb-openapi.zalopay.vn/v2/create".to_string(),
            query_endpoint: "https://sb-openapi.zalopay.vn/v2/query".to_string(),
            callback_url: "http://localhost:8080/api/v1/payments/zalopay/callback".to_string(),
            return_url: "http://localhost:3000/payment/result".to_string(),
        }
    }
}

/// `yymmdd_<order code>`, dated in Vietnam time (UTC+7) as ZaloPay expects.
pub fn app_trans_id(order_code: &str, at: DateTime<Utc>) -> String {
    let local = at + Duration::hours(7);
    format!("{}_{}", local.format("%y%m%d"), order_code)
}

/// Recovers the order code from an `app_trans_id`.
pub fn order_code_from(app_trans_id: &str) -> Option<&str> {
    match app_trans_id.char_indices().nth(TRANS_ID_PREFIX_LEN - 1) {
        Some((idx, '_')) => app_trans_id
            .get(idx + 1..)
            .filter(|code| !code.is_empty()),
        _ => None,
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    return_code: Option<i64>,
    #[serde(default)]
    return_message: String,
    #[serde(default)]
    order_url: String,
    qr_code: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    return_code: Option<i64>,
    #[serde(default)]
    return_message: String,
}

/// Callback body: `data` is a JSON document signed as a raw string with key2.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZaloPayCallback {
    pub data: String,
    pub mac: String,
    #[serde(rename = "type")]
    pub kind: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZaloPayCallbackData {
    pub app_id: i64,
    pub app_trans_id: String,
    pub app_time: i64,
    pub app_user: String,
    pub amount: i64,
    pub embed_data: String,
    pub item: String,
    pub zp_trans_id: i64,
    pub server_time: i64,
    pub channel: i64,
    pub merchant_user_id: String,
}

impl ZaloPayCallback {
    /// Parses the inner `data` document. Only meaningful after the MAC has
    /// been verified.
    pub fn parse_data(&self) -> Result<ZaloPayCallbackData> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

impl ZaloPayCallbackData {
    pub fn is_success(&self) -> bool {
        self.zp_trans_id > 0
    }
}

pub struct ZaloPayGateway {
    config: ZaloPayConfig,
    client: Client,
}

impl ZaloPayGateway {
    pub fn new(config: ZaloPayConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// MAC ZaloPay attaches to a callback, computed with key2 over the raw
    /// `data` string.
    pub fn callback_mac(&self, data: &str) -> String {
        sign(&self.config.key2, data)
    }

    pub async fn create_payment(&self, req: &PaymentRequest<'_>) -> Result<PaymentSession> {
        let now = Utc::now();
        let app_time = now.timestamp_millis();
        let app_trans_id = app_trans_id(req.order_code, now);
        let amount = req.amount.whole_units();
        let redirect_url = req.return_url.unwrap_or(&self.config.return_url);

        let embed_data = json!({ "redirecturl": redirect_url }).to_string();
        let item = json!([{
            "itemid": req.order_code,
            "itemname": req.description,
            "itemprice": amount,
            "itemquantity": 1,
        }])
        .to_string();
        let mac = sign(
            &self.config.key1,
            &format!(
                "{}|{}|{}|{}|{}|{}|{}",
                self.config.app_id, app_trans_id, APP_USER, amount, app_time, embed_data, item
            ),
        );

        let form = [
            ("app_id", self.config.app_id.to_string()),
            ("app_user", APP_USER.to_string()),
            ("app_time", app_time.to_string()),
            ("amount", amount.to_string()),
            ("app_trans_id", app_trans_id.clone()),
            ("embed_data", embed_data),
            ("item", item),
            ("description", req.description.to_string()),
            ("bank_code", String::new()),
            ("callback_url", self.config.callback_url.clone()),
            ("mac", mac),
        ];

        debug!(order_code = req.order_code, %app_trans_id, amount, "Creating ZaloPay payment");
        let resp: CreateResponse = self
            .client
            .post(&self.config.create_endpoint)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        if resp.return_code != Some(1) {
            warn!(
                order_code = req.order_code,
                return_code = ?resp.return_code,
                message = %resp.return_message,
                "ZaloPay rejected payment creation"
            );
            return Err(LedgerError::ProviderError(format!(
                "ZaloPay error: {}",
                resp.return_message
            )));
        }

        Ok(PaymentSession {
            payment_url: resp.order_url,
            reference: app_trans_id,
            deeplink: None,
            qr_code_url: resp.qr_code,
        })
    }

    pub fn verify_callback(&self, callback: &ZaloPayCallback) -> bool {
        verify_signature(&self.config.key2, &callback.data, &callback.mac)
    }

    pub async fn query_status(&self, app_trans_id: &str) -> Result<ProviderStatus> {
        let mac = sign(
            &self.config.key1,
            &format!("{}|{}|{}", self.config.app_id, app_trans_id, self.config.key1),
        );
        let form = [
            ("app_id", self.config.app_id.to_string()),
            ("app_trans_id", app_trans_id.to_string()),
            ("mac", mac),
        ];

        let resp: QueryResponse = self
            .client
            .post(&self.config.query_endpoint)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;
        debug!(app_trans_id, return_code = ?resp.return_code, message = %resp.return_message, "ZaloPay status queried");

        Ok(match resp.return_code {
            Some(1) => ProviderStatus::Paid,
            Some(3) => ProviderStatus::Pending,
            _ => ProviderStatus::Failed,
        })
    }
}
