use actix_web::{get, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::WeightedQuestionQuery,
};

#[get("/api/questions/weighted")]
pub async fn get_weighted_questions(
    state: web::Data<AppState>,
    query: web::Query<WeightedQuestionQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;

    let questions = state
        .sampler_service
        .fetch_weighted_subject_questions(&query.subject, query.count)
        .await?;
    Ok(HttpResponse::Ok().json(questions))
}
