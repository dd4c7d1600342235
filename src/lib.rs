pub mod access;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod referral;

use actix_web::web;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

impl AppState {
    pub async fn connect(config: Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool, config })
    }

    /// Пул без соединения при создании: подключение происходит при первом запросе.
    pub fn connect_lazy(config: Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(&config.database_url)?;

        Ok(Self { pool, config })
    }
}

/// Все пять обработчиков: admin, auth, partner-tracking, subscription, user-data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(error::json_config())
        .app_data(error::query_config())
        .service(api::admin::resource())
        .service(api::auth::resource())
        .service(api::partners::resource())
        .service(api::subscription::resource())
        .service(api::user_data::resource());
}
