#![allow(dead_code)]

use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use coursepay::application::ledger::OrderLedger;
use coursepay::application::payments::PaymentService;
use coursepay::domain::coupon::{DiscountType, NewCoupon};
use coursepay::domain::course::{Course, CourseStatus};
use coursepay::domain::money::Money;
use coursepay::domain::order::Order;
use coursepay::domain::ports::Stores;
use coursepay::domain::{CourseId, UserId};
use coursepay::gateway::Gateways;
use coursepay::gateway::momo::{MomoConfig, MomoGateway, MomoIpn};
use coursepay::gateway::zalopay::{
    ZaloPayCallback, ZaloPayCallbackData, ZaloPayConfig, ZaloPayGateway,
};
use coursepay::interfaces::http::AppState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BUYER: UserId = 42;
pub const OTHER_BUYER: UserId = 43;

pub const PAID_COURSE: CourseId = 1;
pub const FREE_COURSE: CourseId = 2;
pub const DRAFT_COURSE: CourseId = 3;
pub const DISCOUNTED_TO_ZERO: CourseId = 4;

pub fn money(value: Decimal) -> Money {
    Money::new(value).unwrap()
}

pub fn course(id: CourseId, price: Decimal, discount: Option<Decimal>, status: CourseStatus) -> Course {
    Course {
        id,
        title: format!("Course {id}"),
        price: money(price),
        discount_price: discount.map(money),
        status,
    }
}

pub fn save10() -> NewCoupon {
    NewCoupon {
        code: "SAVE10".to_string(),
        description: "Ten percent off".to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        min_order_amount: money(dec!(100000)),
        max_discount_amount: Some(money(dec!(50000))),
        usage_limit: Some(100),
        valid_from: None,
        valid_to: None,
        is_active: None,
    }
}

/// Stores with a small catalog: a paid course, a free one, a draft and one
/// discounted to zero.
pub async fn seeded_stores() -> Stores {
    let stores = Stores::in_memory();
    for course in [
        course(PAID_COURSE, dec!(1000000), None, CourseStatus::Published),
        course(FREE_COURSE, dec!(0), None, CourseStatus::Published),
        course(DRAFT_COURSE, dec!(300000), None, CourseStatus::Draft),
        course(DISCOUNTED_TO_ZERO, dec!(500000), Some(dec!(0)), CourseStatus::Published),
    ] {
        stores.courses.store(course).await.unwrap();
    }
    stores
}

pub fn momo_config(base_url: &str) -> MomoConfig {
    MomoConfig {
        partner_code: "MOMOTEST".to_string(),
        access_key: "momo-access".to_string(),
        secret_key: "momo-secret".to_string(),
        create_endpoint: format!("{base_url}/momo/create"),
        query_endpoint: format!("{base_url}/momo/query"),
        ..Default::default()
    }
}

pub fn zalopay_config(base_url: &str) -> ZaloPayConfig {
    ZaloPayConfig {
        app_id: 2553,
        key1: "zp-key1".to_string(),
        key2: "zp-key2".to_string(),
        create_endpoint: format!("{base_url}/zalopay/create"),
        query_endpoint: format!("{base_url}/zalopay/query"),
        ..Default::default()
    }
}

pub fn signed_momo_ipn(order: &Order, result_code: i64) -> MomoIpn {
    let mut ipn = MomoIpn {
        partner_code: "MOMOTEST".to_string(),
        order_id: order.order_code.clone(),
        request_id: order.payment_reference.clone().unwrap_or_default(),
        amount: order.final_price.whole_units(),
        order_info: format!("Payment for order {}", order.order_code),
        order_type: "momo_wallet".to_string(),
        trans_id: 2_000_000_001,
        result_code,
        message: "Successful.".to_string(),
        pay_type: "qr".to_string(),
        response_time: 1_700_000_000_000,
        extra_data: String::new(),
        signature: String::new(),
    };
    let gateway = MomoGateway::new(momo_config("http://unused"), reqwest::Client::new());
    ipn.signature = gateway.ipn_signature(&ipn);
    ipn
}

pub fn signed_zalopay_callback(order: &Order, zp_trans_id: i64) -> ZaloPayCallback {
    let data = serde_json::to_string(&ZaloPayCallbackData {
        app_id: 2553,
        app_trans_id: format!("240115_{}", order.order_code),
        app_time: 1_705_300_000_000,
        app_user: "coursepay".to_string(),
        amount: order.final_price.whole_units(),
        zp_trans_id,
        server_time: 1_705_300_001_000,
        channel: 38,
        ..Default::default()
    })
    .unwrap();
    let gateway = ZaloPayGateway::new(zalopay_config("http://unused"), reqwest::Client::new());
    ZaloPayCallback {
        mac: gateway.callback_mac(&data),
        data,
        kind: 1,
    }
}

/// A local stand-in for both providers' create and query endpoints.
#[derive(Clone, Default)]
pub struct ProviderMock {
    pub base_url: String,
    pub momo_create_code: Arc<AtomicI64>,
    pub momo_query_code: Arc<AtomicI64>,
    pub zalopay_create_code: Arc<AtomicI64>,
    pub zalopay_query_code: Arc<AtomicI64>,
    pub momo_requests: Arc<Mutex<Vec<Value>>>,
    pub zalopay_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn momo_create(State(mock): State<ProviderMock>, Json(body): Json<Value>) -> Json<Value> {
    let order_id = body["orderId"].as_str().unwrap_or_default().to_string();
    mock.momo_requests.lock().unwrap().push(body);
    let code = mock.momo_create_code.load(Ordering::SeqCst);
    Json(json!({
        "partnerCode": "MOMOTEST",
        "orderId": order_id,
        "resultCode": code,
        "message": if code == 0 { "Successful." } else { "Bad request" },
        "payUrl": format!("https://test-payment.momo.vn/pay/{order_id}"),
        "deeplink": "momo://app?action=payWithApp",
        "qrCodeUrl": "https://test-payment.momo.vn/qr",
    }))
}

async fn momo_query(State(mock): State<ProviderMock>, Json(body): Json<Value>) -> Json<Value> {
    mock.momo_requests.lock().unwrap().push(body);
    Json(json!({
        "resultCode": mock.momo_query_code.load(Ordering::SeqCst),
        "message": "queried",
    }))
}

async fn zalopay_create(
    State(mock): State<ProviderMock>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    mock.zalopay_requests.lock().unwrap().push(form);
    let code = mock.zalopay_create_code.load(Ordering::SeqCst);
    Json(json!({
        "return_code": code,
        "return_message": if code == 1 { "Giao dịch thành công" } else { "Giao dịch thất bại" },
        "order_url": "https://qcgateway.zalopay.vn/openinapp?order=abc",
    }))
}

async fn zalopay_query(
    State(mock): State<ProviderMock>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    mock.zalopay_requests.lock().unwrap().push(form);
    Json(json!({
        "return_code": mock.zalopay_query_code.load(Ordering::SeqCst),
        "return_message": "queried",
    }))
}

pub async fn spawn_provider_mock() -> ProviderMock {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = ProviderMock {
        base_url: format!("http://{}", listener.local_addr().unwrap()),
        ..Default::default()
    };
    mock.zalopay_create_code.store(1, Ordering::SeqCst);
    mock.momo_query_code.store(1006, Ordering::SeqCst);
    mock.zalopay_query_code.store(3, Ordering::SeqCst);

    let app = Router::new()
        .route("/momo/create", post(momo_create))
        .route("/momo/query", post(momo_query))
        .route("/zalopay/create", post(zalopay_create))
        .route("/zalopay/query", post(zalopay_query))
        .with_state(mock.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    mock
}

pub struct TestApp {
    pub state: AppState,
    pub stores: Stores,
    pub ledger: Arc<OrderLedger>,
    pub payments: PaymentService,
    pub mock: ProviderMock,
}

pub async fn test_app() -> TestApp {
    let stores = seeded_stores().await;
    let mock = spawn_provider_mock().await;
    let gateways = Gateways::new(
        momo_config(&mock.base_url),
        zalopay_config(&mock.base_url),
        Duration::from_secs(5),
    )
    .unwrap();

    let ledger = Arc::new(OrderLedger::new(stores.clone()));
    let payments = PaymentService::new(ledger.clone(), Arc::new(gateways));
    TestApp {
        state: AppState::new(ledger.clone(), payments.clone()),
        stores,
        ledger,
        payments,
        mock,
    }
}
