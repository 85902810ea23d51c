use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::Student,
};

/// Identity resolution for institution-scoped students. Bulk callers
/// treat a failed lookup as a per-row soft failure, not a hard abort.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn find_by_user_id(
        &self,
        institution_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Student>>;
    async fn list_approved(&self, institution_id: &str) -> AppResult<Vec<Student>>;
    async fn count_approved(&self, institution_id: &str) -> AppResult<u64>;
}

pub struct MongoStudentRepository {
    collection: Collection<Student>,
}

impl MongoStudentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("students");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for students collection");

        let user_index = IndexModel::builder()
            .keys(doc! { "institution_id": 1, "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("institution_user_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl StudentRepository for MongoStudentRepository {
    async fn find_by_user_id(
        &self,
        institution_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Student>> {
        let student = self
            .collection
            .find_one(doc! {
                "institution_id": institution_id,
                "user_id": user_id,
            })
            .await?;
        Ok(student)
    }

    async fn list_approved(&self, institution_id: &str) -> AppResult<Vec<Student>> {
        let students = self
            .collection
            .find(doc! {
                "institution_id": institution_id,
                "status": "approved",
            })
            .await?
            .try_collect()
            .await?;
        Ok(students)
    }

    async fn count_approved(&self, institution_id: &str) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(doc! {
                "institution_id": institution_id,
                "status": "approved",
            })
            .await?;
        Ok(count)
    }
}
