use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub referral_code: String,
    pub referred_by_code: Option<String>,
    pub subscription_type: String, // trial | paid
    pub trial_ends_at: DateTime<Utc>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub bonus_months: i32,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReferralStats {
    pub total: i64,
    pub subscribed: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdBanner {
    pub id: i32,
    pub advertiser: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub cta_text: Option<String>,
    pub click_cost: Option<f64>,
    pub is_active: Option<bool>,
    pub is_partner: Option<bool>,
    pub priority: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Салон вместе с количеством услуг и бронирований для админки.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalonSummary {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<i32>,
    pub is_partner: Option<bool>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub services_count: i64,
    pub bookings_count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PlatformSetting {
    pub id: i32,
    pub category: String,
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PlatformStats {
    pub total_ad_clicks: i64,
    pub total_ad_revenue: f64,
    pub total_bookings: i64,
    pub completed_bookings: i64,
    pub users_with_profile: i64,
    pub users_with_preferences: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PartnerStore {
    pub id: i32,
    pub name: String,
    pub logo_url: String,
    pub website_url: String,
    pub priority_level: i32,
    pub click_rate_rub: f64,
    pub commission_percent: f64,
    pub is_active: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct NewPartner {
    pub id: i32,
    pub name: String,
    pub priority_level: i32,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TrackingStats {
    pub total_clicks: i64,
    pub total_orders: i64,
    pub total_sales: f64,
    pub total_commission: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i32,
    pub user_id: i32,
    pub profile_photo_url: Option<String>,
    pub ai_color_type: Option<String>,
    pub ai_body_type: Option<String>,
    pub ai_recommended_styles: Vec<String>,
    pub ai_recommended_colors: Vec<String>,
    pub ai_avoid_colors: Vec<String>,
    pub ai_similar_celebrities: Vec<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserPreferences {
    pub id: i32,
    pub user_id: i32,
    pub favorite_styles: Vec<String>,
    pub favorite_occasions: Vec<String>,
    pub favorite_colors: Vec<String>,
    pub favorite_celebrities: String,
    pub fashion_icons: String,
    pub favorite_brands: String,
    pub budget_min: i32,
    pub budget_max: i32,
    pub additional_notes: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
