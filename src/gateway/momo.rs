use super::{PaymentRequest, PaymentSession, ProviderStatus, sign, verify_signature};
use crate::error::{LedgerError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

const REQUEST_TYPE: &str = "captureWallet";
const PARTNER_NAME: &str = "Course Marketplace";
const STORE_ID: &str = "CoursePayStore";
const LANG: &str = "vi";

/// Result code MoMo reports for a transaction the buyer has not finished.
pub const RESULT_PENDING: i64 = 1006;

#[derive(Debug, Clone)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
    pub create_endpoint: String,
    pub query_endpoint: String,
    pub return_url: String,
    pub ipn_url: String,
}

impl Default for MomoConfig {
    fn default() -> Self {
        Self {
            partner_code: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            create_endpoint: "https://test-payment.momo.vn/v2/gateway/api/create".to_string(),
            query_endpoint: "https://test-payment.momo.vn/v2/gateway/api/query".to_string(),
            return_url: "http://localhost:3000/payment/result".to_string(),
            ipn_url: "http://localhost:8080/api/v1/payments/momo/callback".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    partner_code: &'a str,
    partner_name: &'a str,
    store_id: &'a str,
    request_id: &'a str,
    amount: i64,
    order_id: &'a str,
    order_info: &'a str,
    redirect_url: &'a str,
    ipn_url: &'a str,
    lang: &'a str,
    extra_data: &'a str,
    request_type: &'a str,
    signature: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    result_code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    pay_url: String,
    deeplink: Option<String>,
    qr_code_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    partner_code: &'a str,
    request_id: &'a str,
    order_id: &'a str,
    lang: &'a str,
    signature: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    result_code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Instant payment notification posted by MoMo once a transaction settles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MomoIpn {
    pub partner_code: String,
    pub order_id: String,
    pub request_id: String,
    pub amount: i64,
    pub order_info: String,
    pub order_type: String,
    pub trans_id: i64,
    pub result_code: i64,
    pub message: String,
    pub pay_type: String,
    pub response_time: i64,
    pub extra_data: String,
    pub signature: String,
}

impl MomoIpn {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

pub struct MomoGateway {
    config: MomoConfig,
    client: Client,
}

impl MomoGateway {
    pub fn new(config: MomoConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn create_signature(&self, request_id: &str, amount: i64, order_id: &str, order_info: &str, redirect_url: &str) -> String {
        let raw = format!(
            "accessKey={}&amount={}&extraData=&ipnUrl={}&orderId={}&orderInfo={}&partnerCode={}&redirectUrl={}&requestId={}&requestType={}",
            self.config.access_key,
            amount,
            self.config.ipn_url,
            order_id,
            order_info,
            self.config.partner_code,
            redirect_url,
            request_id,
            REQUEST_TYPE,
        );
        sign(&self.config.secret_key, &raw)
    }

    /// Signature MoMo attaches to an IPN, computed over its fields in
    /// alphabetical order.
    pub fn ipn_signature(&self, ipn: &MomoIpn) -> String {
        sign(&self.config.secret_key, &self.ipn_raw(ipn))
    }

    fn ipn_raw(&self, ipn: &MomoIpn) -> String {
        format!(
            "accessKey={}&amount={}&extraData={}&message={}&orderId={}&orderInfo={}&orderType={}&partnerCode={}&payType={}&requestId={}&responseTime={}&resultCode={}&transId={}",
            self.config.access_key,
            ipn.amount,
            ipn.extra_data,
            ipn.message,
            ipn.order_id,
            ipn.order_info,
            ipn.order_type,
            ipn.partner_code,
            ipn.pay_type,
            ipn.request_id,
            ipn.response_time,
            ipn.result_code,
            ipn.trans_id,
        )
    }

    pub async fn create_payment(&self, req: &PaymentRequest<'_>) -> Result<PaymentSession> {
        let request_id = Uuid::new_v4().to_string();
        let amount = req.amount.whole_units();
        let redirect_url = req.return_url.unwrap_or(&self.config.return_url);

        let body = CreateRequest {
            partner_code: &self.config.partner_code,
            partner_name: PARTNER_NAME,
            store_id: STORE_ID,
            request_id: &request_id,
            amount,
            order_id: req.order_code,
            order_info: req.description,
            redirect_url,
            ipn_url: &self.config.ipn_url,
            lang: LANG,
            extra_data: "",
            request_type: REQUEST_TYPE,
            signature: self.create_signature(
                &request_id,
                amount,
                req.order_code,
                req.description,
                redirect_url,
            ),
        };

        debug!(order_code = req.order_code, %request_id, amount, "Creating MoMo payment");
        let resp: CreateResponse = self
            .client
            .post(&self.config.create_endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if resp.result_code != Some(0) {
            warn!(
                order_code = req.order_code,
                result_code = ?resp.result_code,
                message = %resp.message,
                "MoMo rejected payment creation"
            );
            return Err(LedgerError::ProviderError(format!(
                "MoMo error: {}",
                resp.message
            )));
        }

        Ok(PaymentSession {
            payment_url: resp.pay_url,
            reference: request_id,
            deeplink: resp.deeplink,
            qr_code_url: resp.qr_code_url,
        })
    }

    pub fn verify_callback(&self, ipn: &MomoIpn) -> bool {
        verify_signature(&self.config.secret_key, &self.ipn_raw(ipn), &ipn.signature)
    }

    pub async fn query_status(&self, order_code: &str) -> Result<ProviderStatus> {
        let request_id = Uuid::new_v4().to_string();
        let raw = format!(
            "accessKey={}&orderId={}&partnerCode={}&requestId={}",
            self.config.access_key, order_code, self.config.partner_code, request_id
        );
        let body = QueryRequest {
            partner_code: &self.config.partner_code,
            request_id: &request_id,
            order_id: order_code,
            lang: LANG,
            signature: sign(&self.config.secret_key, &raw),
        };

        let resp: QueryResponse = self
            .client
            .post(&self.config.query_endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        debug!(order_code, result_code = ?resp.result_code, message = %resp.message, "MoMo status queried");

        Ok(match resp.result_code {
            Some(0) => ProviderStatus::Paid,
            Some(RESULT_PENDING) | None => ProviderStatus::Pending,
            Some(_) => ProviderStatus::Failed,
        })
    }
}
