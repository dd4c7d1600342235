// src/api/admin.rs

use actix_web::{dev::HttpServiceFactory, http::Method, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::{cors_headers, method_not_allowed, Preflight};
use crate::error::{ApiError, ApiResult};
use crate::models::{AdBanner, PlatformSetting, PlatformStats, SalonSummary};
use crate::AppState;

const PREFLIGHT: Preflight = Preflight {
    methods: "GET, POST, PUT, DELETE, OPTIONS",
    headers: "Content-Type, X-Admin-Token",
};

const BANNER_COLUMNS: &str = "id, advertiser, title, description, image_url, link_url, cta_text, \
    click_cost::float8 AS click_cost, is_active, is_partner, priority, created_at, updated_at";

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AdminView {
    Banners,
    Salons,
    #[default]
    Settings,
    Stats,
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub resource: AdminView,
    pub category: Option<String>,
}

/// Создание записей (POST). Незаданные обязательные поля уходят в БД как NULL.
#[derive(Debug, Deserialize)]
#[serde(tag = "resource", rename_all = "snake_case")]
pub enum AdminCreate {
    Banner(NewBanner),
    Salon(NewSalon),
    Setting(SettingValue),
}

/// Полная перезапись записи (PUT): отсутствующие поля становятся NULL.
#[derive(Debug, Deserialize)]
#[serde(tag = "resource", rename_all = "snake_case")]
pub enum AdminUpdate {
    Banner(BannerUpdate),
    Salon(SalonUpdate),
    Setting(SettingValue),
}

#[derive(Debug, Deserialize)]
pub struct NewBanner {
    pub advertiser: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    #[serde(default = "default_cta_text")]
    pub cta_text: String,
    #[serde(default = "default_click_cost")]
    pub click_cost: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_partner: bool,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Deserialize)]
pub struct BannerUpdate {
    pub id: i32,
    pub advertiser: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub cta_text: Option<String>,
    pub click_cost: Option<f64>,
    pub is_active: Option<bool>,
    pub is_partner: Option<bool>,
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NewSalon {
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews_count: i32,
    #[serde(default)]
    pub is_partner: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SalonUpdate {
    pub id: i32,
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<i32>,
    pub is_partner: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub category: Option<String>,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DeleteTarget {
    Banner,
    Salon,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub resource: DeleteTarget,
    pub id: i32,
}

fn default_cta_text() -> String {
    "Перейти".to_string()
}

fn default_click_cost() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

pub fn resource() -> impl HttpServiceFactory {
    web::resource("/admin")
        .route(web::method(Method::OPTIONS).to(options))
        .route(web::get().to(read))
        .route(web::post().to(create))
        .route(web::put().to(update))
        .route(web::delete().to(remove))
        .default_service(web::to(method_not_allowed))
        .wrap(cors_headers())
}

async fn options() -> HttpResponse {
    PREFLIGHT.response()
}

async fn read(
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let body = match query.resource {
        AdminView::Banners => {
            let sql = format!(
                "SELECT {BANNER_COLUMNS} FROM ad_banners ORDER BY priority DESC, created_at DESC"
            );
            let banners: Vec<AdBanner> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
            json!({ "banners": banners })
        }
        AdminView::Salons => {
            let salons: Vec<SalonSummary> = sqlx::query_as(
                r#"SELECT s.id, s.name, s.address, s.rating::float8 AS rating, s.reviews_count,
                          s.is_partner, s.image_url, s.created_at,
                          COUNT(DISTINCT ss.id) AS services_count,
                          COUNT(DISTINCT bb.id) AS bookings_count
                   FROM beauty_salons s
                   LEFT JOIN salon_services ss ON s.id = ss.salon_id
                   LEFT JOIN beauty_bookings bb ON s.id = bb.salon_id
                   GROUP BY s.id
                   ORDER BY s.is_partner DESC, s.rating DESC"#,
            )
            .fetch_all(&mut *conn)
            .await?;
            json!({ "salons": salons })
        }
        AdminView::Settings => {
            let settings: Vec<PlatformSetting> = sqlx::query_as(
                r#"SELECT id, category, setting_key, setting_value, updated_at
                   FROM platform_settings
                   WHERE $1::text IS NULL OR category = $1
                   ORDER BY category, setting_key"#,
            )
            .bind(query.category.as_deref())
            .fetch_all(&mut *conn)
            .await?;
            json!({ "settings": settings })
        }
        AdminView::Stats => {
            let stats: PlatformStats = sqlx::query_as(
                r#"SELECT
                       (SELECT COUNT(*) FROM ad_clicks) AS total_ad_clicks,
                       (SELECT COALESCE(SUM(click_cost), 0)::float8 FROM ad_clicks) AS total_ad_revenue,
                       (SELECT COUNT(*) FROM beauty_bookings) AS total_bookings,
                       (SELECT COUNT(*) FROM beauty_bookings WHERE status = 'completed') AS completed_bookings,
                       (SELECT COUNT(DISTINCT user_id) FROM user_profiles) AS users_with_profile,
                       (SELECT COUNT(DISTINCT user_id) FROM user_preferences) AS users_with_preferences"#,
            )
            .fetch_one(&mut *conn)
            .await?;
            json!({ "stats": stats })
        }
    };

    Ok(HttpResponse::Ok().json(body))
}

async fn create(
    state: web::Data<AppState>,
    payload: web::Json<AdminCreate>,
) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    match payload.into_inner() {
        AdminCreate::Banner(banner) => {
            let banner_id: i32 = sqlx::query_scalar(
                r#"INSERT INTO ad_banners
                   (advertiser, title, description, image_url, link_url,
                    cta_text, click_cost, is_active, is_partner, priority)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                   RETURNING id"#,
            )
            .bind(banner.advertiser)
            .bind(banner.title)
            .bind(banner.description)
            .bind(banner.image_url)
            .bind(banner.link_url)
            .bind(banner.cta_text)
            .bind(banner.click_cost)
            .bind(banner.is_active)
            .bind(banner.is_partner)
            .bind(banner.priority)
            .fetch_one(&mut *conn)
            .await?;

            log::info!("banner created id={}", banner_id);
            Ok(HttpResponse::Ok().json(json!({ "success": true, "banner_id": banner_id })))
        }
        AdminCreate::Salon(salon) => {
            let salon_id: i32 = sqlx::query_scalar(
                r#"INSERT INTO beauty_salons
                   (name, address, rating, reviews_count, is_partner, image_url)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   RETURNING id"#,
            )
            .bind(salon.name)
            .bind(salon.address)
            .bind(salon.rating)
            .bind(salon.reviews_count)
            .bind(salon.is_partner)
            .bind(salon.image_url)
            .fetch_one(&mut *conn)
            .await?;

            log::info!("salon created id={}", salon_id);
            Ok(HttpResponse::Ok().json(json!({ "success": true, "salon_id": salon_id })))
        }
        AdminCreate::Setting(setting) => {
            let category = setting
                .category
                .ok_or_else(|| ApiError::missing("category"))?;

            let setting_id: i32 = sqlx::query_scalar(
                r#"INSERT INTO platform_settings (category, setting_key, setting_value)
                   VALUES ($1, $2, $3)
                   ON CONFLICT (category, setting_key) DO UPDATE SET
                       setting_value = EXCLUDED.setting_value,
                       updated_at = CURRENT_TIMESTAMP
                   RETURNING id"#,
            )
            .bind(&category)
            .bind(&setting.key)
            .bind(setting.value)
            .fetch_one(&mut *conn)
            .await?;

            Ok(HttpResponse::Ok().json(json!({ "success": true, "setting_id": setting_id })))
        }
    }
}

async fn update(
    state: web::Data<AppState>,
    payload: web::Json<AdminUpdate>,
) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    match payload.into_inner() {
        AdminUpdate::Banner(banner) => {
            sqlx::query_scalar::<_, i32>(
                r#"UPDATE ad_banners SET
                       advertiser = $1,
                       title = $2,
                       description = $3,
                       image_url = $4,
                       link_url = $5,
                       cta_text = $6,
                       click_cost = $7,
                       is_active = $8,
                       is_partner = $9,
                       priority = $10,
                       updated_at = CURRENT_TIMESTAMP
                   WHERE id = $11
                   RETURNING id"#,
            )
            .bind(banner.advertiser)
            .bind(banner.title)
            .bind(banner.description)
            .bind(banner.image_url)
            .bind(banner.link_url)
            .bind(banner.cta_text)
            .bind(banner.click_cost)
            .bind(banner.is_active)
            .bind(banner.is_partner)
            .bind(banner.priority)
            .bind(banner.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| ApiError::not_found("Баннер не найден"))?;
        }
        AdminUpdate::Salon(salon) => {
            sqlx::query_scalar::<_, i32>(
                r#"UPDATE beauty_salons SET
                       name = $1,
                       address = $2,
                       rating = $3,
                       reviews_count = $4,
                       is_partner = $5,
                       image_url = $6
                   WHERE id = $7
                   RETURNING id"#,
            )
            .bind(salon.name)
            .bind(salon.address)
            .bind(salon.rating)
            .bind(salon.reviews_count)
            .bind(salon.is_partner)
            .bind(salon.image_url)
            .bind(salon.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| ApiError::not_found("Салон не найден"))?;
        }
        AdminUpdate::Setting(setting) => {
            let updated: Vec<i32> = sqlx::query_scalar(
                r#"UPDATE platform_settings SET
                       setting_value = $1,
                       updated_at = CURRENT_TIMESTAMP
                   WHERE setting_key = $2 AND ($3::text IS NULL OR category = $3)
                   RETURNING id"#,
            )
            .bind(setting.value)
            .bind(&setting.key)
            .bind(setting.category)
            .fetch_all(&mut *conn)
            .await?;

            if updated.is_empty() {
                return Err(ApiError::not_found("Настройка не найдена"));
            }
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn remove(
    state: web::Data<AppState>,
    query: web::Query<DeleteQuery>,
) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let (sql, not_found) = match query.resource {
        DeleteTarget::Banner => ("DELETE FROM ad_banners WHERE id = $1", "Баннер не найден"),
        DeleteTarget::Salon => ("DELETE FROM beauty_salons WHERE id = $1", "Салон не найден"),
    };

    let result = sqlx::query(sql).bind(query.id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(not_found));
    }

    log::info!("admin deleted {:?} id={}", query.resource, query.id);

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_defaults() {
        let cmd: AdminCreate = serde_json::from_value(json!({
            "resource": "banner",
            "advertiser": "Lamoda",
            "title": "Скидки"
        }))
        .unwrap();

        match cmd {
            AdminCreate::Banner(banner) => {
                assert_eq!(banner.cta_text, "Перейти");
                assert_eq!(banner.click_cost, 10.0);
                assert!(banner.is_active);
                assert!(!banner.is_partner);
                assert_eq!(banner.priority, 0);
                assert_eq!(banner.description, None);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn update_requires_id() {
        let res = serde_json::from_value::<AdminUpdate>(json!({
            "resource": "salon",
            "name": "Без id"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn read_defaults_to_settings() {
        let query: AdminQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.resource, AdminView::Settings);
    }
}
