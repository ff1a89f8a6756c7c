use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use super::{AppState, SubjectQuery};

#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, description = "List departments", body = [Department])),
    tag = "departments"
)]
pub async fn list_departments(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let departments = data.repo.list_departments().await?;
    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(("id" = i32, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department", body = Department),
        (status = 404, description = "Department not found", body = ApiErrorBody)
    ),
    tag = "departments"
)]
pub async fn get_department(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let department = data.repo.get_department(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = NewDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid fields", body = ApiErrorBody)
    ),
    tag = "departments"
)]
pub async fn create_department(data: web::Data<AppState>, payload: web::Json<NewDepartment>) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner().normalized();
    new.validate()?;
    let department = data.repo.create_department(new).await?;
    tracing::info!(id = department.id, code = %department.code, "department created");
    Ok(HttpResponse::Created().json(department))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    request_body = UpdateDepartment,
    params(("id" = i32, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Invalid fields", body = ApiErrorBody),
        (status = 404, description = "Department not found", body = ApiErrorBody)
    ),
    tag = "departments"
)]
pub async fn update_department(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateDepartment>,
) -> Result<HttpResponse, ApiError> {
    let upd = payload.into_inner().normalized();
    if upd.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }
    upd.validate()?;
    let department = data.repo.update_department(path.into_inner(), upd).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(("id" = i32, Path, description = "Department id")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found", body = ApiErrorBody),
        (status = 409, description = "Department still has subjects", body = ApiErrorBody)
    ),
    tag = "departments"
)]
pub async fn delete_department(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    data.repo.delete_department(id).await?;
    tracing::info!(id, "department deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}/subjects",
    params(("id" = i32, Path, description = "Department id"), SubjectQuery),
    responses(
        (status = 200, description = "Subjects of the department", body = [Subject]),
        (status = 404, description = "Department not found", body = ApiErrorBody)
    ),
    tag = "departments"
)]
pub async fn list_department_subjects(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<SubjectQuery>,
) -> Result<HttpResponse, ApiError> {
    let department = data.repo.get_department(path.into_inner()).await?;
    let mut filter = query.into_inner().into_filter()?;
    filter.department_id = Some(department.id);
    let subjects = data.repo.list_subjects(filter).await?;
    Ok(HttpResponse::Ok().json(subjects))
}
