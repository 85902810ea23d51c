use actix_web::{delete, get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::{BulkResultsRequest, ResultListQuery},
};

#[post("/api/results/bulk")]
pub async fn create_bulk_results(
    state: web::Data<AppState>,
    request: web::Json<BulkResultsRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .result_service
        .create_bulk_results(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(outcome))
}

#[get("/api/results")]
pub async fn list_results(
    state: web::Data<AppState>,
    query: web::Query<ResultListQuery>,
) -> Result<HttpResponse, AppError> {
    let results = state.result_service.list_results(&query).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/results/{id}/report")]
pub async fn get_exam_report(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = state.analytics_service.exam_report(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[delete("/api/results/{id}")]
pub async fn delete_result(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.result_service.delete_result(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}
