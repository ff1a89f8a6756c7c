use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use super::{AppState, SubjectQuery};

#[utoipa::path(
    get,
    path = "/api/subjects",
    params(SubjectQuery),
    responses(
        (status = 200, description = "List subjects", body = [Subject]),
        (status = 400, description = "Invalid query", body = ApiErrorBody)
    ),
    tag = "subjects"
)]
pub async fn list_subjects(data: web::Data<AppState>, query: web::Query<SubjectQuery>) -> Result<HttpResponse, ApiError> {
    let filter = query.into_inner().into_filter()?;
    let subjects = data.repo.list_subjects(filter).await?;
    Ok(HttpResponse::Ok().json(subjects))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{id}",
    params(("id" = i32, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found", body = ApiErrorBody)
    ),
    tag = "subjects"
)]
pub async fn get_subject(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let subject = data.repo.get_subject(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(subject))
}

#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = NewSubject,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Invalid fields or unknown department", body = ApiErrorBody),
        (status = 409, description = "Subject code already exists", body = ApiErrorBody)
    ),
    tag = "subjects"
)]
pub async fn create_subject(data: web::Data<AppState>, payload: web::Json<NewSubject>) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner().normalized();
    new.validate()?;
    let subject = data.repo.create_subject(new).await?;
    tracing::info!(id = subject.id, code = %subject.code, "subject created");
    Ok(HttpResponse::Created().json(subject))
}

#[utoipa::path(
    put,
    path = "/api/subjects/{id}",
    request_body = UpdateSubject,
    params(("id" = i32, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 400, description = "Invalid fields or unknown department", body = ApiErrorBody),
        (status = 404, description = "Subject not found", body = ApiErrorBody),
        (status = 409, description = "Subject code already exists", body = ApiErrorBody)
    ),
    tag = "subjects"
)]
pub async fn update_subject(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateSubject>,
) -> Result<HttpResponse, ApiError> {
    let upd = payload.into_inner().normalized();
    if upd.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }
    upd.validate()?;
    let subject = data.repo.update_subject(path.into_inner(), upd).await?;
    Ok(HttpResponse::Ok().json(subject))
}

#[utoipa::path(
    delete,
    path = "/api/subjects/{id}",
    params(("id" = i32, Path, description = "Subject id")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found", body = ApiErrorBody)
    ),
    tag = "subjects"
)]
pub async fn delete_subject(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    data.repo.delete_subject(id).await?;
    tracing::info!(id, "subject deleted");
    Ok(HttpResponse::NoContent().finish())
}
