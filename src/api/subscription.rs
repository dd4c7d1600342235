// src/api/subscription.rs

use actix_web::{dev::HttpServiceFactory, http::Method, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{Connection, Postgres, Transaction};

use super::{cors_headers, method_not_allowed, Preflight};
use crate::access::{evaluate_access, extend_by_calendar_months, extend_subscription};
use crate::error::{ApiError, ApiResult};
use crate::referral::{bonus_due, REFERRAL_BONUS_MONTHS};
use crate::AppState;

const PREFLIGHT: Preflight = Preflight {
    methods: "POST, OPTIONS",
    headers: "Content-Type, X-User-Id",
};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SubscriptionCommand {
    Subscribe(SubscribeRequest),
    CheckStatus(StatusRequest),
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub user_id: i32,
    #[serde(default)]
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub user_id: i32,
}

pub fn resource() -> impl HttpServiceFactory {
    web::resource("/subscription")
        .route(web::method(Method::OPTIONS).to(options))
        .route(web::post().to(dispatch))
        .default_service(web::to(method_not_allowed))
        .wrap(cors_headers())
}

async fn options() -> HttpResponse {
    PREFLIGHT.response()
}

async fn dispatch(
    state: web::Data<AppState>,
    command: web::Json<SubscriptionCommand>,
) -> ApiResult<HttpResponse> {
    match command.into_inner() {
        SubscriptionCommand::Subscribe(req) => subscribe(&state, req).await,
        SubscriptionCommand::CheckStatus(req) => check_status(&state, req).await,
    }
}

// Оплата подписки и начисление бонуса пригласившему
async fn subscribe(state: &AppState, req: SubscribeRequest) -> ApiResult<HttpResponse> {
    let months = req.months.unwrap_or(1);
    if months == 0 {
        return Err(ApiError::bad_request("months должно быть не меньше 1"));
    }

    let mut conn = state.pool.acquire().await?;
    let mut tx = conn.begin().await?;

    let (current_end, referred_by): (Option<DateTime<Utc>>, Option<String>) = sqlx::query_as(
        r#"SELECT subscription_ends_at, referred_by_code
           FROM users
           WHERE id = $1
           FOR UPDATE"#,
    )
    .bind(req.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(ApiError::user_not_found)?;

    let now = Utc::now();
    let new_end = extend_subscription(current_end, now, months)
        .ok_or_else(|| ApiError::bad_request("Слишком большой срок подписки"))?;

    sqlx::query(
        r#"UPDATE users
           SET subscription_type = 'paid',
               subscription_ends_at = $1,
               updated_at = NOW()
           WHERE id = $2"#,
    )
    .bind(new_end)
    .bind(req.user_id)
    .execute(&mut *tx)
    .await?;

    if let Some(code) = referred_by.as_deref() {
        sqlx::query(
            r#"UPDATE referrals
               SET status = 'subscribed'
               WHERE referred_user_id = $1 AND status = 'registered'"#,
        )
        .bind(req.user_id)
        .execute(&mut *tx)
        .await?;

        grant_referral_bonus(&mut tx, code, now).await?;
    }

    tx.commit().await?;

    log::info!(
        "subscription extended user_id={} months={} ends_at={}",
        req.user_id,
        months,
        new_end
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "subscription_ends_at": new_end,
        "months_added": months,
    })))
}

/// Строка пригласившего блокируется до конца транзакции, поэтому проверка порога
/// и отметка `bonus_granted` для одного реферера выполняются последовательно.
/// Все накопленные подписавшиеся рефералы гасятся одним бонусом.
async fn grant_referral_bonus(
    tx: &mut Transaction<'_, Postgres>,
    referral_code: &str,
    now: DateTime<Utc>,
) -> ApiResult<()> {
    let referrer: Option<(i32, Option<DateTime<Utc>>)> = sqlx::query_as(
        r#"SELECT id, subscription_ends_at
           FROM users
           WHERE referral_code = $1
           FOR UPDATE"#,
    )
    .bind(referral_code)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((referrer_id, referrer_end)) = referrer else {
        return Ok(());
    };

    let pending: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*)
           FROM referrals
           WHERE referrer_user_id = $1 AND status = 'subscribed' AND bonus_granted = FALSE"#,
    )
    .bind(referrer_id)
    .fetch_one(&mut **tx)
    .await?;

    if !bonus_due(pending) {
        return Ok(());
    }

    let bonus_end = extend_by_calendar_months(referrer_end, now, REFERRAL_BONUS_MONTHS)
        .ok_or_else(|| ApiError::bad_request("Слишком большой срок подписки"))?;

    sqlx::query(
        r#"UPDATE users
           SET subscription_ends_at = $1,
               bonus_months = bonus_months + $2,
               subscription_type = 'paid',
               updated_at = NOW()
           WHERE id = $3"#,
    )
    .bind(bonus_end)
    .bind(REFERRAL_BONUS_MONTHS as i32)
    .bind(referrer_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"UPDATE referrals
           SET bonus_granted = TRUE
           WHERE referrer_user_id = $1 AND status = 'subscribed' AND bonus_granted = FALSE"#,
    )
    .bind(referrer_id)
    .execute(&mut **tx)
    .await?;

    log::info!(
        "referral bonus granted referrer_id={} referrals={} ends_at={}",
        referrer_id,
        pending,
        bonus_end
    );

    Ok(())
}

async fn check_status(state: &AppState, req: StatusRequest) -> ApiResult<HttpResponse> {
    let mut conn = state.pool.acquire().await?;

    let (subscription_type, trial_ends_at, subscription_ends_at, bonus_months): (
        String,
        DateTime<Utc>,
        Option<DateTime<Utc>>,
        i32,
    ) = sqlx::query_as(
        r#"SELECT subscription_type, trial_ends_at, subscription_ends_at, bonus_months
           FROM users
           WHERE id = $1"#,
    )
    .bind(req.user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(ApiError::user_not_found)?;

    let access = evaluate_access(
        &subscription_type,
        Some(trial_ends_at),
        subscription_ends_at,
        Utc::now(),
    );

    Ok(HttpResponse::Ok().json(json!({
        "has_access": access.has_access,
        "status": access.status,
        "days_left": access.days_left,
        "bonus_months": bonus_months,
    })))
}
