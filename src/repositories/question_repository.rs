use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{QuestionRecord, QuestionRequest},
};

#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    async fn fetch(&self, request: &QuestionRequest) -> AppResult<Vec<QuestionRecord>>;
}

pub struct MongoQuestionBankRepository {
    collection: Collection<QuestionRecord>,
}

impl MongoQuestionBankRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("questions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let subject_topic_index = IndexModel::builder()
            .keys(doc! { "subject": 1, "topic": 1 })
            .options(
                IndexOptions::builder()
                    .name("subject_topic".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(subject_topic_index).await?;

        Ok(())
    }
}

#[async_trait]
impl QuestionBankRepository for MongoQuestionBankRepository {
    async fn fetch(&self, request: &QuestionRequest) -> AppResult<Vec<QuestionRecord>> {
        let mut filter = doc! { "subject": &request.subject };

        if let Some(topic) = &request.topic {
            filter.insert("topic", topic);
        }

        let find_options = FindOptions::builder().limit(request.count as i64).build();

        let questions = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok(questions)
    }
}
