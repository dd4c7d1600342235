// src/api/auth.rs

use actix_web::{dev::HttpServiceFactory, http::Method, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::Connection;

use super::{cors_headers, method_not_allowed, Preflight};
use crate::access::{evaluate_access, trial_end, TRIAL_DAYS};
use crate::error::{ApiError, ApiResult};
use crate::referral::{bonus_progress, generate_referral_code};
use crate::{db, AppState};

const PREFLIGHT: Preflight = Preflight {
    methods: "GET, POST, OPTIONS",
    headers: "Content-Type, X-User-Id, X-Auth-Token",
};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthCommand {
    Register(RegisterRequest),
    Login(LoginRequest),
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Код пригласившего пользователя
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub user_id: Option<i32>,
}

pub fn resource() -> impl HttpServiceFactory {
    web::resource("/auth")
        .route(web::method(Method::OPTIONS).to(options))
        .route(web::post().to(dispatch))
        .route(web::get().to(profile))
        .default_service(web::to(method_not_allowed))
        .wrap(cors_headers())
}

async fn options() -> HttpResponse {
    PREFLIGHT.response()
}

async fn dispatch(
    state: web::Data<AppState>,
    command: web::Json<AuthCommand>,
) -> ApiResult<HttpResponse> {
    match command.into_inner() {
        AuthCommand::Register(req) => register(&state, req).await,
        AuthCommand::Login(req) => login(&state, req).await,
    }
}

// Регистрация с триалом и привязкой к пригласившему
async fn register(state: &AppState, req: RegisterRequest) -> ApiResult<HttpResponse> {
    let referred_by = req
        .referral_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());

    let mut conn = state.pool.acquire().await?;
    let mut tx = conn.begin().await?;

    if db::find_user_by_email(&mut *tx, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Пользователь уже существует".to_string()));
    }

    let referral_code = loop {
        let candidate = generate_referral_code();
        if !db::referral_code_taken(&mut *tx, &candidate).await? {
            break candidate;
        }
        log::debug!("referral code collision, regenerating");
    };

    let user = db::insert_user(
        &mut *tx,
        &req.email,
        req.name.as_deref().unwrap_or(""),
        &referral_code,
        referred_by,
        trial_end(Utc::now()),
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e, "users_email_key") {
            ApiError::Conflict("Пользователь уже существует".to_string())
        } else {
            ApiError::from(e)
        }
    })?;

    // Неизвестный код приглашения молча игнорируется
    if let Some(code) = referred_by {
        match db::find_user_id_by_referral_code(&mut *tx, code).await? {
            Some(referrer_id) => {
                sqlx::query(
                    r#"INSERT INTO referrals (referrer_user_id, referred_user_id, status)
                       VALUES ($1, $2, 'registered')"#,
                )
                .bind(referrer_id)
                .bind(user.id)
                .execute(&mut *tx)
                .await?;
            }
            None => log::warn!("unknown referral code {} for user_id={}", code, user.id),
        }
    }

    tx.commit().await?;

    log::info!("registered user_id={} email={}", user.id, user.email);

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "trial_days_left": TRIAL_DAYS,
    })))
}

async fn login(state: &AppState, req: LoginRequest) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let user = db::find_user_by_email(&mut *conn, &req.email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let access = evaluate_access(
        &user.subscription_type,
        Some(user.trial_ends_at),
        user.subscription_ends_at,
        Utc::now(),
    );

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "has_access": access.has_access,
        "days_left": access.days_left,
    })))
}

// Профиль и прогресс реферальной программы
async fn profile(
    state: web::Data<AppState>,
    query: web::Query<ProfileQuery>,
) -> ApiResult<HttpResponse> {
    let user_id = query.user_id.ok_or_else(|| ApiError::missing("user_id"))?;

    let mut conn = state.pool.acquire().await?;

    let user = db::find_user_by_id(&mut *conn, user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;
    let stats = db::referral_stats(&mut *conn, user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "referrals": {
            "total": stats.total,
            "subscribed": stats.subscribed,
            "progress_to_bonus": bonus_progress(stats.subscribed),
        },
    })))
}
