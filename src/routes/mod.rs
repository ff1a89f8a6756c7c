use std::sync::Arc;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::AuthHandler;
use crate::error::ApiError;
use crate::models::{Id, SubjectFilter};
use crate::repo::Repo;

pub mod departments;
pub mod subjects;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/subjects")
            .service(
                web::resource(["", "/"])
                    .route(web::get().to(subjects::list_subjects))
                    .route(web::post().to(subjects::create_subject)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(subjects::get_subject))
                    .route(web::put().to(subjects::update_subject))
                    .route(web::delete().to(subjects::delete_subject)),
            ),
    )
    .service(
        web::scope("/api/departments")
            .service(
                web::resource(["", "/"])
                    .route(web::get().to(departments::list_departments))
                    .route(web::post().to(departments::create_department)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(departments::get_department))
                    .route(web::put().to(departments::update_department))
                    .route(web::delete().to(departments::delete_department)),
            )
            .service(web::resource("/{id}/subjects").route(web::get().to(departments::list_department_subjects))),
    );
}

#[derive(Clone)]
pub struct AppState { pub repo: Arc<dyn Repo>, pub auth: Arc<dyn AuthHandler> }

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Hello")
}

/// Query string accepted by subject listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SubjectQuery {
    /// Only subjects of this department
    pub department_id: Option<Id>,
    /// Case-insensitive match on name or code
    pub search: Option<String>,
    /// Page size, 1..=100 (default 50)
    pub limit: Option<i64>,
    /// Rows to skip (default 0)
    pub offset: Option<i64>,
}

impl SubjectQuery {
    pub fn into_filter(self) -> Result<SubjectFilter, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::BadRequest(format!("limit must be between 1 and {MAX_PAGE_SIZE}")));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::BadRequest("offset must not be negative".into()));
        }
        let search = self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(SubjectFilter { department_id: self.department_id, search, limit: Some(limit), offset })
    }
}

// Extractor failures render as JSON `ApiError` bodies.

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}
