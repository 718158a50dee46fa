use super::error::StoreError;
use crate::database::{CollectionModel, MongoDb};
use crate::error::DatabaseError;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// BSON field names of the `access` collection.
pub mod keys {
    pub const ID: &str = "_id";
    pub const USER_ID: &str = "userId";
    pub const USER_GROUP_ID: &str = "userGroupId";
    pub const ROLES: &str = "roles";
}

/// A user's roles within one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Access {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userGroupId")]
    pub user_group_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessModel;

impl CollectionModel for AccessModel {
    type Entity = Access;

    fn collection_name(&self) -> &str {
        "access"
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn grant(&self, access: &Access) -> Result<ObjectId, StoreError>;
    async fn revoke(&self, id: ObjectId) -> Result<(), StoreError>;
    async fn for_user(&self, user_id: &str) -> Result<Vec<Access>, StoreError>;
}

pub struct MongoAccessStore {
    db: MongoDb,
}

impl MongoAccessStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessStore for MongoAccessStore {
    async fn grant(&self, access: &Access) -> Result<ObjectId, StoreError> {
        let id = self.db.insert_one(&AccessModel, access).await.map_err(StoreError::GrantAccess)?;
        id.as_object_id().ok_or_else(|| {
            StoreError::GrantAccess(DatabaseError::FailedToSerializeDocument(
                "inserted id was not an object id".to_string(),
            ))
        })
    }

    async fn revoke(&self, id: ObjectId) -> Result<(), StoreError> {
        let mut filter = Document::new();
        filter.insert(keys::ID, id);
        self.db.delete_one(&AccessModel, filter).await.map_err(StoreError::RevokeAccess)
    }

    async fn for_user(&self, user_id: &str) -> Result<Vec<Access>, StoreError> {
        let mut filter = Document::new();
        filter.insert(keys::USER_ID, user_id);
        self.db.find_many(&AccessModel, filter, None).await.map_err(StoreError::ListAccess)
    }
}
