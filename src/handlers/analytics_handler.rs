use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::AnalyticsQuery,
};

const DEFAULT_STUDENT_LIMIT: usize = 50;

#[get("/api/analytics/summary")]
pub async fn get_summary(
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, AppError> {
    let summary = state
        .analytics_service
        .institution_summary(&query.institution_id, query.date_start, query.date_end)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/api/analytics/subjects")]
pub async fn get_subject_performance(
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, AppError> {
    let performances = state
        .analytics_service
        .subject_performance_report(&query.institution_id, query.date_start, query.date_end)
        .await?;
    Ok(HttpResponse::Ok().json(performances))
}

#[get("/api/analytics/trends")]
pub async fn get_performance_trends(
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, AppError> {
    let trends = state
        .analytics_service
        .performance_trends_report(&query.institution_id, query.date_start, query.date_end)
        .await?;
    Ok(HttpResponse::Ok().json(trends))
}

#[get("/api/analytics/students")]
pub async fn get_student_analytics(
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, AppError> {
    let limit = query
        .limit
        .map(|l| l.max(1) as usize)
        .unwrap_or(DEFAULT_STUDENT_LIMIT);

    let analytics = state
        .analytics_service
        .student_analytics(&query.institution_id, query.date_start, query.date_end, limit)
        .await?;
    Ok(HttpResponse::Ok().json(analytics))
}
