use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::exam_result::{AnswerChoice, QuestionNumber},
    models::domain::ExamTemplate,
};

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, template: ExamTemplate) -> AppResult<ExamTemplate>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamTemplate>>;
    async fn list(
        &self,
        institution_id: Option<&str>,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<ExamTemplate>>;
    async fn update_answer_key(
        &self,
        id: &str,
        answer_key: &BTreeMap<QuestionNumber, AnswerChoice>,
    ) -> AppResult<ExamTemplate>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub struct MongoTemplateRepository {
    collection: Collection<ExamTemplate>,
}

impl MongoTemplateRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("exam_templates");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exam_templates collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let institution_index = IndexModel::builder()
            .keys(doc! { "institution_id": 1, "exam_type": 1 })
            .options(
                IndexOptions::builder()
                    .name("institution_exam_type".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(institution_index).await?;

        Ok(())
    }
}

#[async_trait]
impl TemplateRepository for MongoTemplateRepository {
    async fn create(&self, template: ExamTemplate) -> AppResult<ExamTemplate> {
        self.collection.insert_one(&template).await?;
        Ok(template)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamTemplate>> {
        let template = self.collection.find_one(doc! { "id": id }).await?;
        Ok(template)
    }

    async fn list(
        &self,
        institution_id: Option<&str>,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<ExamTemplate>> {
        // Public templates plus the institution's own when a filter is given.
        let mut filter = match institution_id {
            Some(institution_id) => doc! {
                "$or": [
                    { "is_public": true },
                    { "institution_id": institution_id },
                ]
            },
            None => doc! {},
        };

        if let Some(exam_type) = exam_type {
            filter.insert("exam_type", exam_type);
        }

        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let templates = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok(templates)
    }

    async fn update_answer_key(
        &self,
        id: &str,
        answer_key: &BTreeMap<QuestionNumber, AnswerChoice>,
    ) -> AppResult<ExamTemplate> {
        let key_bson = mongodb::bson::to_bson(answer_key)?;
        let updated_at = mongodb::bson::to_bson(&Utc::now())?;

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection
            .find_one_and_update(
                doc! { "id": id },
                doc! { "$set": { "answer_key": key_bson, "updated_at": updated_at } },
            )
            .with_options(options)
            .await?;

        updated.ok_or_else(|| AppError::NotFound(format!("Template with id '{}' not found", id)))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;

        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!(
                "Template with id '{}' not found",
                id
            )));
        }

        Ok(())
    }
}
