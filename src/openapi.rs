use crate::error::ApiErrorBody;
use crate::models::{Department, NewDepartment, NewSubject, Subject, UpdateDepartment, UpdateSubject};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::subjects::list_subjects,
        crate::routes::subjects::get_subject,
        crate::routes::subjects::create_subject,
        crate::routes::subjects::update_subject,
        crate::routes::subjects::delete_subject,
        crate::routes::departments::list_departments,
        crate::routes::departments::get_department,
        crate::routes::departments::create_department,
        crate::routes::departments::update_department,
        crate::routes::departments::delete_department,
        crate::routes::departments::list_department_subjects,
    ),
    components(schemas(
        Department, NewDepartment, UpdateDepartment,
        Subject, NewSubject, UpdateSubject,
        ApiErrorBody
    )),
    tags(
        (name = "subjects", description = "Subject operations"),
        (name = "departments", description = "Department operations"),
    )
)]
pub struct ApiDoc;
