// src/api/partners.rs

use actix_web::{dev::HttpServiceFactory, http::Method, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::{cors_headers, method_not_allowed, Preflight};
use crate::error::{ApiError, ApiResult};
use crate::models::{NewPartner, PartnerStore, TrackingStats};
use crate::AppState;

const PREFLIGHT: Preflight = Preflight {
    methods: "GET, POST, OPTIONS",
    headers: "Content-Type, X-User-Id",
};

/// Цена клика, если магазин не найден.
const DEFAULT_CLICK_RATE_RUB: f64 = 10.0;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrackingCommand {
    TrackAdClick(AdClickRequest),
    TrackClick(StoreClickRequest),
    TrackOrder(OrderRequest),
    AddPartner(NewPartnerRequest),
}

#[derive(Debug, Deserialize)]
pub struct AdClickRequest {
    pub ad_id: Option<i32>,
    #[serde(default = "default_advertiser")]
    pub advertiser: String,
    #[serde(default = "default_click_rate")]
    pub click_cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct StoreClickRequest {
    pub user_id: Option<i32>,
    pub store_id: i32,
    #[serde(default)]
    pub product_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub user_id: Option<i32>,
    pub store_id: i32,
    pub order_amount: f64,
    /// Номер заказа на стороне магазина
    #[serde(default, rename = "order_id")]
    pub external_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPartnerRequest {
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub priority_level: i32,
    #[serde(default = "default_click_rate")]
    pub click_rate_rub: f64,
    #[serde(default = "default_commission_percent")]
    pub commission_percent: f64,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingView {
    #[default]
    ListPartners,
    Stats,
}

#[derive(Debug, Deserialize)]
pub struct TrackingQuery {
    #[serde(default)]
    pub action: TrackingView,
    pub store_id: Option<i32>,
}

fn default_advertiser() -> String {
    "Unknown".to_string()
}

fn default_click_rate() -> f64 {
    DEFAULT_CLICK_RATE_RUB
}

fn default_commission_percent() -> f64 {
    5.0
}

pub fn commission(order_amount: f64, commission_percent: f64) -> f64 {
    order_amount * commission_percent / 100.0
}

pub fn resource() -> impl HttpServiceFactory {
    web::resource("/partner-tracking")
        .route(web::method(Method::OPTIONS).to(options))
        .route(web::post().to(dispatch))
        .route(web::get().to(read))
        .default_service(web::to(method_not_allowed))
        .wrap(cors_headers())
}

async fn options() -> HttpResponse {
    PREFLIGHT.response()
}

async fn dispatch(
    state: web::Data<AppState>,
    command: web::Json<TrackingCommand>,
) -> ApiResult<HttpResponse> {
    match command.into_inner() {
        TrackingCommand::TrackAdClick(req) => track_ad_click(&state, req).await,
        TrackingCommand::TrackClick(req) => track_click(&state, req).await,
        TrackingCommand::TrackOrder(req) => track_order(&state, req).await,
        TrackingCommand::AddPartner(req) => add_partner(&state, req).await,
    }
}

async fn track_ad_click(state: &AppState, req: AdClickRequest) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let click_id: i32 = sqlx::query_scalar(
        r#"INSERT INTO ad_clicks (ad_id, advertiser, click_cost, clicked_at)
           VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
           RETURNING id"#,
    )
    .bind(req.ad_id)
    .bind(&req.advertiser)
    .bind(req.click_cost)
    .fetch_one(&mut *conn)
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "click_id": click_id })))
}

// Переход в магазин-партнёр и тарификация клика
async fn track_click(state: &AppState, req: StoreClickRequest) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let click_id: i32 = sqlx::query_scalar(
        r#"INSERT INTO store_clicks (user_id, store_id, product_url)
           VALUES ($1, $2, $3)
           RETURNING id"#,
    )
    .bind(req.user_id)
    .bind(req.store_id)
    .bind(&req.product_url)
    .fetch_one(&mut *conn)
    .await?;

    let store: Option<(String, f64)> = sqlx::query_as(
        "SELECT name, click_rate_rub::float8 FROM partner_stores WHERE id = $1",
    )
    .bind(req.store_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (store_name, charge) =
        store.unwrap_or_else(|| ("Unknown".to_string(), DEFAULT_CLICK_RATE_RUB));

    Ok(HttpResponse::Ok().json(json!({
        "click_id": click_id,
        "store": store_name,
        "charge": charge,
    })))
}

// Заказ у партнёра и расчёт комиссии
async fn track_order(state: &AppState, req: OrderRequest) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let commission_percent: f64 = sqlx::query_scalar(
        "SELECT commission_percent::float8 FROM partner_stores WHERE id = $1",
    )
    .bind(req.store_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| ApiError::not_found("Магазин не найден"))?;

    let commission = commission(req.order_amount, commission_percent);

    let order_id: i32 = sqlx::query_scalar(
        r#"INSERT INTO partner_orders
           (user_id, store_id, order_amount, commission_amount, order_external_id, status)
           VALUES ($1, $2, $3, $4, $5, 'confirmed')
           RETURNING id"#,
    )
    .bind(req.user_id)
    .bind(req.store_id)
    .bind(req.order_amount)
    .bind(commission)
    .bind(&req.external_id)
    .fetch_one(&mut *conn)
    .await?;

    log::info!(
        "partner order tracked order_id={} store_id={} amount={} commission={}",
        order_id,
        req.store_id,
        req.order_amount,
        commission
    );

    Ok(HttpResponse::Ok().json(json!({
        "order_id": order_id,
        "commission": commission,
        "commission_percent": commission_percent,
    })))
}

async fn add_partner(state: &AppState, req: NewPartnerRequest) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let partner: NewPartner = sqlx::query_as(
        r#"INSERT INTO partner_stores
           (name, logo_url, website_url, priority_level, click_rate_rub, commission_percent)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id, name, priority_level"#,
    )
    .bind(&req.name)
    .bind(&req.logo_url)
    .bind(&req.website_url)
    .bind(req.priority_level)
    .bind(req.click_rate_rub)
    .bind(req.commission_percent)
    .fetch_one(&mut *conn)
    .await?;

    log::info!("partner store added id={} name={}", partner.id, partner.name);

    Ok(HttpResponse::Ok().json(json!({ "partner": partner, "success": true })))
}

async fn read(
    state: web::Data<AppState>,
    query: web::Query<TrackingQuery>,
) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    match query.action {
        TrackingView::ListPartners => {
            let partners: Vec<PartnerStore> = sqlx::query_as(
                r#"SELECT id, name, logo_url, website_url, priority_level,
                          click_rate_rub::float8 AS click_rate_rub,
                          commission_percent::float8 AS commission_percent,
                          is_active
                   FROM partner_stores
                   WHERE is_active = TRUE
                   ORDER BY priority_level DESC, name ASC"#,
            )
            .fetch_all(&mut *conn)
            .await?;

            Ok(HttpResponse::Ok().json(json!({ "partners": partners })))
        }
        TrackingView::Stats => {
            // Каждый агрегат считается отдельным подзапросом, чтобы JOIN не умножал суммы
            let stats: TrackingStats = match query.store_id {
                Some(store_id) => sqlx::query_as(
                    r#"SELECT
                           (SELECT COUNT(*) FROM store_clicks WHERE store_id = ps.id) AS total_clicks,
                           (SELECT COUNT(*) FROM partner_orders WHERE store_id = ps.id) AS total_orders,
                           (SELECT COALESCE(SUM(order_amount), 0)::float8
                              FROM partner_orders WHERE store_id = ps.id) AS total_sales,
                           (SELECT COALESCE(SUM(commission_amount), 0)::float8
                              FROM partner_orders WHERE store_id = ps.id) AS total_commission
                       FROM partner_stores ps
                       WHERE ps.id = $1"#,
                )
                .bind(store_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| ApiError::not_found("Магазин не найден"))?,
                None => sqlx::query_as(
                    r#"SELECT
                           (SELECT COUNT(*) FROM store_clicks) AS total_clicks,
                           (SELECT COUNT(*) FROM partner_orders) AS total_orders,
                           (SELECT COALESCE(SUM(order_amount), 0)::float8 FROM partner_orders) AS total_sales,
                           (SELECT COALESCE(SUM(commission_amount), 0)::float8 FROM partner_orders) AS total_commission"#,
                )
                .fetch_one(&mut *conn)
                .await?,
            };

            Ok(HttpResponse::Ok().json(stats))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_is_percentage_of_amount() {
        assert_eq!(commission(1000.0, 5.0), 50.0);
        assert_eq!(commission(0.0, 7.5), 0.0);
        assert!((commission(1999.99, 3.0) - 59.9997).abs() < 1e-9);
    }

    #[test]
    fn ad_click_defaults() {
        let cmd: TrackingCommand =
            serde_json::from_value(json!({"action": "track_ad_click", "ad_id": 3})).unwrap();
        match cmd {
            TrackingCommand::TrackAdClick(req) => {
                assert_eq!(req.ad_id, Some(3));
                assert_eq!(req.advertiser, "Unknown");
                assert_eq!(req.click_cost, 10.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn order_reads_external_id_from_order_id() {
        let cmd: TrackingCommand = serde_json::from_value(json!({
            "action": "track_order",
            "store_id": 2,
            "order_amount": 1500.0,
            "order_id": "EXT-77"
        }))
        .unwrap();
        match cmd {
            TrackingCommand::TrackOrder(req) => {
                assert_eq!(req.external_id, "EXT-77");
                assert_eq!(req.user_id, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn query_defaults_to_partner_list() {
        let query: TrackingQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.action, TrackingView::ListPartners);
        assert_eq!(query.store_id, None);
    }
}
