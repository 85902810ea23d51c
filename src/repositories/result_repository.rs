use async_trait::async_trait;
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::ExamResult,
};

/// Server-side filters for result queries; everything optional except
/// the tenant scope.
#[derive(Clone, Debug, Default)]
pub struct ResultFilter {
    pub institution_id: String,
    pub user_id: Option<String>,
    pub template_id: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn insert_many(&self, results: Vec<ExamResult>) -> AppResult<usize>;
    /// Insert a self-submitted result. The unique index on
    /// `assignment_id` makes a second submission surface as
    /// `AlreadySubmitted` instead of a raw write error.
    async fn create_submission(&self, result: ExamResult) -> AppResult<ExamResult>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamResult>>;
    async fn list(&self, filter: &ResultFilter) -> AppResult<Vec<ExamResult>>;
    async fn exists_for_assignment(&self, assignment_id: &str) -> AppResult<bool>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub struct MongoResultRepository {
    collection: Collection<ExamResult>,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

impl MongoResultRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("exam_results");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exam_results collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // At most one result per assignment; sparse so bulk-ingested
        // rows without an assignment are unaffected.
        let assignment_index = IndexModel::builder()
            .keys(doc! { "assignment_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .sparse(true)
                    .name("assignment_unique".to_string())
                    .build(),
            )
            .build();

        let institution_user_index = IndexModel::builder()
            .keys(doc! { "institution_id": 1, "user_id": 1, "exam_date": -1 })
            .options(
                IndexOptions::builder()
                    .name("institution_user_date".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(assignment_index).await?;
        self.collection.create_index(institution_user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl ResultRepository for MongoResultRepository {
    async fn insert_many(&self, results: Vec<ExamResult>) -> AppResult<usize> {
        if results.is_empty() {
            return Ok(0);
        }

        let inserted = self.collection.insert_many(&results).await?;
        Ok(inserted.inserted_ids.len())
    }

    async fn create_submission(&self, result: ExamResult) -> AppResult<ExamResult> {
        match self.collection.insert_one(&result).await {
            Ok(_) => Ok(result),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadySubmitted(format!(
                "a result already exists for assignment '{}'",
                result.assignment_id.as_deref().unwrap_or("")
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamResult>> {
        let result = self.collection.find_one(doc! { "id": id }).await?;
        Ok(result)
    }

    async fn list(&self, filter: &ResultFilter) -> AppResult<Vec<ExamResult>> {
        let mut query = doc! { "institution_id": &filter.institution_id };

        if let Some(user_id) = &filter.user_id {
            query.insert("user_id", user_id);
        }
        if let Some(template_id) = &filter.template_id {
            query.insert("template_id", template_id);
        }
        if let Some(exam_date) = &filter.exam_date {
            query.insert("exam_date", exam_date.to_string());
        } else {
            // ISO dates compare correctly as strings.
            let mut date_range = doc! {};
            if let Some(start) = &filter.date_start {
                date_range.insert("$gte", start.to_string());
            }
            if let Some(end) = &filter.date_end {
                date_range.insert("$lte", end.to_string());
            }
            if !date_range.is_empty() {
                query.insert("exam_date", date_range);
            }
        }

        let find_options = FindOptions::builder()
            .sort(doc! { "exam_date": -1 })
            .build();

        let results = self
            .collection
            .find(query)
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok(results)
    }

    async fn exists_for_assignment(&self, assignment_id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .find_one(doc! { "assignment_id": assignment_id })
            .await?;
        Ok(result.is_some())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;

        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!(
                "Result with id '{}' not found",
                id
            )));
        }

        Ok(())
    }
}
