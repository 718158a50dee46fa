use super::error::StoreError;
use crate::database::{CollectionModel, MongoDb};
use crate::error::DatabaseError;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// BSON field names of the `user` collection, for filter building.
pub mod keys {
    pub const ID: &str = "_id";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const META_DATA: &str = "metaData";
    pub const USER_GROUPS: &str = "usersGroups";
    pub const USER_GROUP_IDS: &str = "userGroupIds";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "metaData", default)]
    pub meta_data: Document,
    #[serde(rename = "usersGroups", default)]
    pub user_groups: Vec<UserGroupRef>,
    #[serde(rename = "userGroupIds", default)]
    pub user_group_ids: Vec<String>,
}

/// Embedded summary of a group the user belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGroupRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserModel;

impl CollectionModel for UserModel {
    type Entity = User;

    fn collection_name(&self) -> &str {
        "user"
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<ObjectId, StoreError>;
    /// Partial update: only non-empty name/email/phone fields are written.
    async fn update(&self, user: &User) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: ObjectId) -> Result<User, StoreError>;
    async fn delete(&self, id: ObjectId) -> Result<(), StoreError>;
}

pub struct MongoUserStore {
    db: MongoDb,
}

impl MongoUserStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

fn id_filter(id: ObjectId) -> Document {
    let mut filter = Document::new();
    filter.insert(keys::ID, id);
    filter
}

fn update_document(user: &User) -> Document {
    let mut update = Document::new();
    if !user.name.is_empty() {
        update.insert(keys::NAME, user.name.clone());
    }
    if !user.email.is_empty() {
        update.insert(keys::EMAIL, user.email.clone());
    }
    if !user.phone.is_empty() {
        update.insert(keys::PHONE, user.phone.clone());
    }
    update
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn create(&self, user: &User) -> Result<ObjectId, StoreError> {
        let id = self.db.insert_one(&UserModel, user).await.map_err(StoreError::CreateUser)?;
        id.as_object_id().ok_or_else(|| {
            StoreError::CreateUser(DatabaseError::FailedToSerializeDocument(
                "inserted id was not an object id".to_string(),
            ))
        })
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let id = user.id.ok_or(StoreError::MissingId)?;
        self.db
            .update_one(&UserModel, id_filter(id), update_document(user))
            .await
            .map_err(StoreError::UpdateUser)?;
        Ok(())
    }

    async fn get_by_id(&self, id: ObjectId) -> Result<User, StoreError> {
        match self.db.find_one(&UserModel, id_filter(id)).await.map_err(StoreError::GetUser)? {
            Some(user) => Ok(user),
            None => Err(StoreError::UserNotFound(id.to_hex())),
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<(), StoreError> {
        self.db.delete_one(&UserModel, id_filter(id)).await.map_err(StoreError::DeleteUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MongoConnection;
    use mongodb::bson::{self, doc};
    use rstest::rstest;
    use std::sync::Arc;

    fn disconnected_store() -> MongoUserStore {
        MongoUserStore::new(MongoDb::new(Arc::new(MongoConnection::new())))
    }

    fn sample_user() -> User {
        User {
            id: None,
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            meta_data: doc! { "team": "analytics" },
            user_groups: vec![UserGroupRef { id: "g1".to_string(), name: "analysts".to_string() }],
            user_group_ids: vec!["g1".to_string()],
        }
    }

    #[rstest]
    fn serializes_with_the_collection_key_names() {
        let doc = bson::to_document(&sample_user()).unwrap();
        assert!(!doc.contains_key(keys::ID), "unset id must be omitted");
        assert_eq!(doc.get_str(keys::NAME).unwrap(), "ada");
        assert!(doc.contains_key(keys::META_DATA));
        assert!(doc.contains_key(keys::USER_GROUPS));
        assert!(doc.contains_key(keys::USER_GROUP_IDS));
    }

    #[rstest]
    fn document_round_trips() {
        let mut user = sample_user();
        user.id = Some(ObjectId::new());
        let doc = bson::to_document(&user).unwrap();
        let back: User = bson::from_document(doc).unwrap();
        assert_eq!(back, user);
    }

    #[rstest]
    fn update_document_skips_empty_fields() {
        let user = User { name: "ada".to_string(), ..User::default() };
        let update = update_document(&user);
        assert_eq!(update.len(), 1);
        assert_eq!(update.get_str(keys::NAME).unwrap(), "ada");
    }

    #[rstest]
    #[tokio::test]
    async fn create_propagates_the_not_connected_sentinel() {
        let store = disconnected_store();
        let result = store.create(&sample_user()).await;
        assert!(matches!(result, Err(StoreError::CreateUser(DatabaseError::NotConnected))));
    }

    #[rstest]
    #[tokio::test]
    async fn update_requires_an_id() {
        let store = disconnected_store();
        let result = store.update(&sample_user()).await;
        assert!(matches!(result, Err(StoreError::MissingId)));
    }

    #[rstest]
    #[tokio::test]
    async fn get_propagates_the_not_connected_sentinel() {
        let store = disconnected_store();
        let result = store.get_by_id(ObjectId::new()).await;
        assert!(matches!(result, Err(StoreError::GetUser(DatabaseError::NotConnected))));
    }

    /// Full round trip against a local mongod.
    #[rstest]
    #[tokio::test]
    #[ignore = "requires a running mongod on localhost:27017"]
    async fn live_round_trip() {
        let db = MongoDb::new(Arc::new(MongoConnection::new()));
        let (tx, rx) = tokio::sync::oneshot::channel();
        db.connection().connect("mongodb://localhost:27017", Some(tx)).await.unwrap();
        rx.await.unwrap();

        let store = MongoUserStore::new(db);
        let id = store.create(&sample_user()).await.unwrap();

        let mut fetched = store.get_by_id(id).await.unwrap();
        assert_eq!(fetched.name, "ada");

        fetched.phone = "555-0199".to_string();
        store.update(&fetched).await.unwrap();
        assert_eq!(store.get_by_id(id).await.unwrap().phone, "555-0199");

        store.delete(id).await.unwrap();
        assert!(matches!(store.get_by_id(id).await, Err(StoreError::UserNotFound(_))));
    }
}
