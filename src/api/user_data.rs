// src/api/user_data.rs

use actix_web::{dev::HttpServiceFactory, http::Method, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgConnection;

use super::{cors_headers, method_not_allowed, Preflight};
use crate::error::{ApiError, ApiResult};
use crate::models::{UserPreferences, UserProfile};
use crate::AppState;

const PREFLIGHT: Preflight = Preflight {
    methods: "GET, POST, PUT, OPTIONS",
    headers: "Content-Type, X-User-Id",
};

const PROFILE_COLUMNS: &str = "id, user_id, profile_photo_url, ai_color_type, ai_body_type, \
    ai_recommended_styles, ai_recommended_colors, ai_avoid_colors, ai_similar_celebrities, \
    analyzed_at, created_at, updated_at";

const PREFERENCES_COLUMNS: &str = "id, user_id, favorite_styles, favorite_occasions, \
    favorite_colors, favorite_celebrities, fashion_icons, favorite_brands, budget_min, \
    budget_max, additional_notes, completed_at, created_at, updated_at";

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserDataCommand {
    SaveAiAnalysis(AiAnalysis),
    SavePreferences(StylePreferences),
}

/// Результат AI-анализа фото: цветотип, тип фигуры и рекомендации.
#[derive(Debug, Deserialize)]
pub struct AiAnalysis {
    pub user_id: i32,
    pub profile_photo_url: Option<String>,
    pub color_type: Option<String>,
    pub body_type: Option<String>,
    #[serde(default)]
    pub recommended_styles: Vec<String>,
    #[serde(default)]
    pub recommended_colors: Vec<String>,
    #[serde(default)]
    pub avoid_colors: Vec<String>,
    #[serde(default)]
    pub similar_celebrities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StylePreferences {
    pub user_id: i32,
    #[serde(default)]
    pub favorite_styles: Vec<String>,
    #[serde(default)]
    pub favorite_occasions: Vec<String>,
    #[serde(default)]
    pub favorite_colors: Vec<String>,
    #[serde(default)]
    pub favorite_celebrities: String,
    #[serde(default)]
    pub fashion_icons: String,
    #[serde(default)]
    pub favorite_brands: String,
    #[serde(default = "default_budget_min")]
    pub budget_min: i32,
    #[serde(default = "default_budget_max")]
    pub budget_max: i32,
    #[serde(default)]
    pub additional_notes: String,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    #[default]
    Profile,
    Preferences,
    All,
}

#[derive(Debug, Deserialize)]
pub struct UserDataQuery {
    pub user_id: Option<i32>,
    #[serde(default, rename = "type")]
    pub kind: DataKind,
}

fn default_budget_min() -> i32 {
    5000
}

fn default_budget_max() -> i32 {
    200000
}

pub fn resource() -> impl HttpServiceFactory {
    web::resource("/user-data")
        .route(web::method(Method::OPTIONS).to(options))
        .route(web::post().to(dispatch))
        .route(web::put().to(dispatch))
        .route(web::get().to(read))
        .default_service(web::to(method_not_allowed))
        .wrap(cors_headers())
}

async fn options() -> HttpResponse {
    PREFLIGHT.response()
}

async fn dispatch(
    state: web::Data<AppState>,
    command: web::Json<UserDataCommand>,
) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    match command.into_inner() {
        UserDataCommand::SaveAiAnalysis(analysis) => {
            let profile_id = save_ai_analysis(&mut conn, &analysis).await?;
            log::info!("ai analysis saved user_id={}", analysis.user_id);
            Ok(HttpResponse::Ok().json(json!({ "success": true, "profile_id": profile_id })))
        }
        UserDataCommand::SavePreferences(prefs) => {
            let preferences_id = save_preferences(&mut conn, &prefs).await?;
            log::info!("preferences saved user_id={}", prefs.user_id);
            Ok(HttpResponse::Ok().json(json!({ "success": true, "preferences_id": preferences_id })))
        }
    }
}

// Повторное сохранение полностью перезаписывает анализ
async fn save_ai_analysis(conn: &mut PgConnection, analysis: &AiAnalysis) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO user_profiles
           (user_id, profile_photo_url, ai_color_type, ai_body_type,
            ai_recommended_styles, ai_recommended_colors, ai_avoid_colors,
            ai_similar_celebrities, analyzed_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CURRENT_TIMESTAMP)
           ON CONFLICT (user_id) DO UPDATE SET
               profile_photo_url = EXCLUDED.profile_photo_url,
               ai_color_type = EXCLUDED.ai_color_type,
               ai_body_type = EXCLUDED.ai_body_type,
               ai_recommended_styles = EXCLUDED.ai_recommended_styles,
               ai_recommended_colors = EXCLUDED.ai_recommended_colors,
               ai_avoid_colors = EXCLUDED.ai_avoid_colors,
               ai_similar_celebrities = EXCLUDED.ai_similar_celebrities,
               analyzed_at = CURRENT_TIMESTAMP,
               updated_at = CURRENT_TIMESTAMP
           RETURNING id"#,
    )
    .bind(analysis.user_id)
    .bind(analysis.profile_photo_url.as_deref())
    .bind(analysis.color_type.as_deref())
    .bind(analysis.body_type.as_deref())
    .bind(&analysis.recommended_styles[..])
    .bind(&analysis.recommended_colors[..])
    .bind(&analysis.avoid_colors[..])
    .bind(&analysis.similar_celebrities[..])
    .fetch_one(conn)
    .await
}

async fn save_preferences(conn: &mut PgConnection, prefs: &StylePreferences) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO user_preferences
           (user_id, favorite_styles, favorite_occasions, favorite_colors,
            favorite_celebrities, fashion_icons, favorite_brands,
            budget_min, budget_max, additional_notes, completed_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CURRENT_TIMESTAMP)
           ON CONFLICT (user_id) DO UPDATE SET
               favorite_styles = EXCLUDED.favorite_styles,
               favorite_occasions = EXCLUDED.favorite_occasions,
               favorite_colors = EXCLUDED.favorite_colors,
               favorite_celebrities = EXCLUDED.favorite_celebrities,
               fashion_icons = EXCLUDED.fashion_icons,
               favorite_brands = EXCLUDED.favorite_brands,
               budget_min = EXCLUDED.budget_min,
               budget_max = EXCLUDED.budget_max,
               additional_notes = EXCLUDED.additional_notes,
               completed_at = CURRENT_TIMESTAMP,
               updated_at = CURRENT_TIMESTAMP
           RETURNING id"#,
    )
    .bind(prefs.user_id)
    .bind(&prefs.favorite_styles[..])
    .bind(&prefs.favorite_occasions[..])
    .bind(&prefs.favorite_colors[..])
    .bind(&prefs.favorite_celebrities)
    .bind(&prefs.fashion_icons)
    .bind(&prefs.favorite_brands)
    .bind(prefs.budget_min)
    .bind(prefs.budget_max)
    .bind(&prefs.additional_notes)
    .fetch_one(conn)
    .await
}

async fn find_profile(conn: &mut PgConnection, user_id: i32) -> Result<Option<UserProfile>, sqlx::Error> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1");
    sqlx::query_as(&sql).bind(user_id).fetch_optional(conn).await
}

async fn find_preferences(
    conn: &mut PgConnection,
    user_id: i32,
) -> Result<Option<UserPreferences>, sqlx::Error> {
    let sql = format!("SELECT {PREFERENCES_COLUMNS} FROM user_preferences WHERE user_id = $1");
    sqlx::query_as(&sql).bind(user_id).fetch_optional(conn).await
}

// Отсутствующие записи возвращаются как null
async fn read(
    state: web::Data<AppState>,
    query: web::Query<UserDataQuery>,
) -> ApiResult<HttpResponse> {
    let user_id = query.user_id.ok_or_else(|| ApiError::missing("user_id"))?;

    let mut conn = state.pool.acquire().await?;

    let body = match query.kind {
        DataKind::Profile => json!({ "profile": find_profile(&mut conn, user_id).await? }),
        DataKind::Preferences => {
            json!({ "preferences": find_preferences(&mut conn, user_id).await? })
        }
        DataKind::All => {
            let profile = find_profile(&mut conn, user_id).await?;
            let preferences = find_preferences(&mut conn, user_id).await?;
            json!({ "profile": profile, "preferences": preferences })
        }
    };

    Ok(HttpResponse::Ok().json(body))
}
