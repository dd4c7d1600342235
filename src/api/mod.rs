pub mod admin;
pub mod auth;
pub mod partners;
pub mod subscription;
pub mod user_data;

use actix_web::{middleware::DefaultHeaders, HttpResponse};

use crate::error::ApiError;

/// Фиксированный ответ на CORS preflight: у каждого обработчика свой набор методов
/// и свой заголовок авторизации.
#[derive(Debug, Clone, Copy)]
pub struct Preflight {
    pub methods: &'static str,
    pub headers: &'static str,
}

impl Preflight {
    pub fn response(&self) -> HttpResponse {
        HttpResponse::Ok()
            .insert_header(("Access-Control-Allow-Origin", "*"))
            .insert_header(("Access-Control-Allow-Methods", self.methods))
            .insert_header(("Access-Control-Allow-Headers", self.headers))
            .insert_header(("Access-Control-Max-Age", "86400"))
            .finish()
    }
}

pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*"))
}

pub async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}
