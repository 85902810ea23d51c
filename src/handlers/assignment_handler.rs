use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::{AssignExamRequest, SubmitAnswersRequest},
};

#[post("/api/assignments")]
pub async fn assign_to_students(
    state: web::Data<AppState>,
    request: web::Json<AssignExamRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .assignment_service
        .assign_to_students(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(outcome))
}

#[get("/api/assignments/student/{user_id}")]
pub async fn list_student_assignments(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let assignments = state.assignment_service.list_for_student(&user_id).await?;
    Ok(HttpResponse::Ok().json(assignments))
}

#[post("/api/assignments/{id}/submit")]
pub async fn submit_answers(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswersRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state
        .assignment_service
        .submit_answers(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(result))
}
