use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Метод не поддерживается")]
    MethodNotAllowed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn user_not_found() -> Self {
        ApiError::not_found("Пользователь не найден")
    }

    pub fn missing(field: &str) -> Self {
        ApiError::BadRequest(format!("{field} обязателен"))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Database(e) => {
                log::error!("database error: {e}");
                "Внутренняя ошибка сервера".to_string()
            }
            other => {
                log::warn!("request rejected: {other}");
                other.to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// Ошибки разбора тела превращаются в 400 с JSON-телом, как и остальные ошибки API.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}
