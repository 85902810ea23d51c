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
    models::domain::ExamAssignment,
};

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn insert_many(&self, assignments: Vec<ExamAssignment>) -> AppResult<usize>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamAssignment>>;
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<ExamAssignment>>;
    /// Conditional `pending -> completed` transition. Returns whether a
    /// pending assignment was actually flipped, so concurrent submitters
    /// cannot both pass the status check.
    async fn complete_if_pending(&self, id: &str) -> AppResult<bool>;
}

pub struct MongoAssignmentRepository {
    collection: Collection<ExamAssignment>,
}

impl MongoAssignmentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("exam_assignments");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exam_assignments collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "exam_date": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_date".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl AssignmentRepository for MongoAssignmentRepository {
    async fn insert_many(&self, assignments: Vec<ExamAssignment>) -> AppResult<usize> {
        if assignments.is_empty() {
            return Ok(0);
        }

        let inserted = self.collection.insert_many(&assignments).await?;
        Ok(inserted.inserted_ids.len())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamAssignment>> {
        let assignment = self.collection.find_one(doc! { "id": id }).await?;
        Ok(assignment)
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<ExamAssignment>> {
        let find_options = FindOptions::builder()
            .sort(doc! { "exam_date": -1 })
            .build();

        let assignments = self
            .collection
            .find(doc! { "user_id": user_id })
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok(assignments)
    }

    async fn complete_if_pending(&self, id: &str) -> AppResult<bool> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "status": "pending" },
                doc! { "$set": { "status": "completed" } },
            )
            .await?;

        Ok(updated.is_some())
    }
}
