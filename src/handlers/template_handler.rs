use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::{CreateTemplateRequest, TemplateListQuery, UpdateAnswerKeyRequest},
};

#[post("/api/templates")]
pub async fn create_template(
    state: web::Data<AppState>,
    request: web::Json<CreateTemplateRequest>,
) -> Result<HttpResponse, AppError> {
    let template = state
        .template_service
        .create_template(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(template))
}

#[get("/api/templates")]
pub async fn list_templates(
    state: web::Data<AppState>,
    query: web::Query<TemplateListQuery>,
) -> Result<HttpResponse, AppError> {
    let templates = state
        .template_service
        .list_templates(query.institution_id.as_deref(), query.exam_type.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(templates))
}

#[get("/api/templates/{id}")]
pub async fn get_template(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let template = state.template_service.get_template(&id).await?;
    Ok(HttpResponse::Ok().json(template))
}

#[put("/api/templates/{id}/answer-key")]
pub async fn update_answer_key(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateAnswerKeyRequest>,
) -> Result<HttpResponse, AppError> {
    let template = state
        .template_service
        .update_answer_key(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(template))
}

#[delete("/api/templates/{id}")]
pub async fn delete_template(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.template_service.delete_template(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}
