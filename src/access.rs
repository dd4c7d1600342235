//! Правила доступа: триал, платная подписка и продление.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

pub const TRIAL_DAYS: i64 = 3;
pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Trial,
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessReport {
    pub has_access: bool,
    pub status: AccessStatus,
    pub days_left: i64,
}

/// Триал проверяется первым; платное окно учитывается только если триал не действует.
/// Окна не складываются.
pub fn evaluate_access(
    subscription_type: &str,
    trial_ends_at: Option<DateTime<Utc>>,
    subscription_ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AccessReport {
    if subscription_type == "trial" {
        if let Some(end) = trial_ends_at.filter(|end| *end > now) {
            return AccessReport {
                has_access: true,
                status: AccessStatus::Trial,
                days_left: (end - now).num_days(),
            };
        }
    }

    match subscription_ends_at.filter(|end| *end > now) {
        Some(end) => AccessReport {
            has_access: true,
            status: AccessStatus::Active,
            days_left: (end - now).num_days(),
        },
        None => AccessReport {
            has_access: false,
            status: AccessStatus::Expired,
            days_left: 0,
        },
    }
}

pub fn trial_end(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(TRIAL_DAYS)
}

/// Неистёкший остаток сохраняется: отсчёт идёт от max(now, текущее окончание).
/// `None` при переполнении даты.
pub fn extend_subscription(
    current_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    months: u32,
) -> Option<DateTime<Utc>> {
    let base = extension_base(current_end, now);
    base.checked_add_signed(Duration::days(DAYS_PER_MONTH * i64::from(months)))
}

/// Бонус за рефералов добавляется календарными месяцами.
pub fn extend_by_calendar_months(
    current_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    months: u32,
) -> Option<DateTime<Utc>> {
    extension_base(current_end, now).checked_add_months(Months::new(months))
}

fn extension_base(current_end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match current_end {
        Some(end) if end > now => end,
        _ => now,
    }
}
