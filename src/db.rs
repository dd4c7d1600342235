use sqlx::PgExecutor;

use crate::models::{ReferralStats, User};

const USER_COLUMNS: &str = "id, email, name, referral_code, referred_by_code, subscription_type, \
                            trial_ends_at, subscription_ends_at, bonus_months";

pub async fn find_user_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i32,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn find_user_by_email<'e, E: PgExecutor<'e>>(
    executor: E,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn referral_code_taken<'e, E: PgExecutor<'e>>(
    executor: E,
    code: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = $1)")
        .bind(code)
        .fetch_one(executor)
        .await
}

pub async fn find_user_id_by_referral_code<'e, E: PgExecutor<'e>>(
    executor: E,
    code: &str,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE referral_code = $1")
        .bind(code)
        .fetch_optional(executor)
        .await
}

pub async fn insert_user<'e, E: PgExecutor<'e>>(
    executor: E,
    email: &str,
    name: &str,
    referral_code: &str,
    referred_by_code: Option<&str>,
    trial_ends_at: chrono::DateTime<chrono::Utc>,
) -> Result<User, sqlx::Error> {
    let sql = format!(
        "INSERT INTO users (email, name, referral_code, referred_by_code, trial_ends_at, subscription_type)
         VALUES ($1, $2, $3, $4, $5, 'trial')
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .bind(name)
        .bind(referral_code)
        .bind(referred_by_code)
        .bind(trial_ends_at)
        .fetch_one(executor)
        .await
}

pub async fn referral_stats<'e, E: PgExecutor<'e>>(
    executor: E,
    referrer_id: i32,
) -> Result<ReferralStats, sqlx::Error> {
    sqlx::query_as::<_, ReferralStats>(
        r#"SELECT COUNT(*) AS total,
                  COUNT(*) FILTER (WHERE status = 'subscribed') AS subscribed
           FROM referrals
           WHERE referrer_user_id = $1"#,
    )
    .bind(referrer_id)
    .fetch_one(executor)
    .await
}

pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
