use super::error::StoreError;
use crate::database::{CollectionModel, MongoDb};
use crate::error::DatabaseError;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// BSON field names of the `userGroups` collection.
pub mod keys {
    pub const ID: &str = "_id";
    pub const NAME: &str = "name";
    pub const META_DATA: &str = "metaData";
    pub const USERS: &str = "users";
    pub const USER_IDS: &str = "userIds";
}

/// A group document. Empty fields are left out of the stored document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGroup {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "metaData", default, skip_serializing_if = "Document::is_empty")]
    pub meta_data: Document,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserRef>,
    #[serde(rename = "userIds", default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
}

/// Embedded summary of a member user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserGroupModel;

impl CollectionModel for UserGroupModel {
    type Entity = UserGroup;

    fn collection_name(&self) -> &str {
        "userGroups"
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserGroupStore: Send + Sync {
    async fn create(&self, group: &UserGroup) -> Result<ObjectId, StoreError>;
    async fn update_name(&self, id: ObjectId, name: &str) -> Result<(), StoreError>;
    /// Record membership on the group's `userIds` set.
    async fn add_user(&self, id: ObjectId, user_id: &str) -> Result<(), StoreError>;
    async fn remove_user(&self, id: ObjectId, user_id: &str) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: ObjectId) -> Result<UserGroup, StoreError>;
    async fn delete_by_id(&self, id: ObjectId) -> Result<(), StoreError>;
}

pub struct MongoUserGroupStore {
    db: MongoDb,
}

impl MongoUserGroupStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

fn id_filter(id: ObjectId) -> Document {
    let mut filter = Document::new();
    filter.insert(keys::ID, id);
    filter
}

fn member_update(user_id: &str) -> Document {
    let mut update = Document::new();
    update.insert(keys::USER_IDS, user_id);
    update
}

#[async_trait]
impl UserGroupStore for MongoUserGroupStore {
    async fn create(&self, group: &UserGroup) -> Result<ObjectId, StoreError> {
        let id = self.db.insert_one(&UserGroupModel, group).await.map_err(StoreError::CreateUserGroup)?;
        id.as_object_id().ok_or_else(|| {
            StoreError::CreateUserGroup(DatabaseError::FailedToSerializeDocument(
                "inserted id was not an object id".to_string(),
            ))
        })
    }

    async fn update_name(&self, id: ObjectId, name: &str) -> Result<(), StoreError> {
        let mut update = Document::new();
        update.insert(keys::NAME, name);
        self.db.update_one(&UserGroupModel, id_filter(id), update).await.map_err(StoreError::UpdateUserGroupName)?;
        Ok(())
    }

    async fn add_user(&self, id: ObjectId, user_id: &str) -> Result<(), StoreError> {
        self.db
            .add_to_set(&UserGroupModel, id_filter(id), member_update(user_id))
            .await
            .map_err(StoreError::UpdateUserGroupMembers)?;
        Ok(())
    }

    async fn remove_user(&self, id: ObjectId, user_id: &str) -> Result<(), StoreError> {
        self.db
            .pull_from_set(&UserGroupModel, id_filter(id), member_update(user_id))
            .await
            .map_err(StoreError::UpdateUserGroupMembers)?;
        Ok(())
    }

    async fn get_by_id(&self, id: ObjectId) -> Result<UserGroup, StoreError> {
        match self.db.find_one(&UserGroupModel, id_filter(id)).await.map_err(StoreError::GetUserGroup)? {
            Some(group) => Ok(group),
            None => Err(StoreError::UserGroupNotFound(id.to_hex())),
        }
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<(), StoreError> {
        self.db.delete_one(&UserGroupModel, id_filter(id)).await.map_err(StoreError::DeleteUserGroup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MongoConnection;
    use mongodb::bson::{self, doc};
    use rstest::rstest;
    use std::sync::Arc;

    fn disconnected_store() -> MongoUserGroupStore {
        MongoUserGroupStore::new(MongoDb::new(Arc::new(MongoConnection::new())))
    }

    #[rstest]
    fn empty_fields_are_left_out_of_the_document() {
        let group = UserGroup { name: "ops".to_string(), ..UserGroup::default() };
        let doc = bson::to_document(&group).unwrap();
        assert_eq!(doc.get_str(keys::NAME).unwrap(), "ops");
        assert!(!doc.contains_key(keys::ID));
        assert!(!doc.contains_key(keys::META_DATA));
        assert!(!doc.contains_key(keys::USERS));
        assert!(!doc.contains_key(keys::USER_IDS));
    }

    #[rstest]
    fn document_round_trips() {
        let group = UserGroup {
            id: Some(ObjectId::new()),
            name: "ops".to_string(),
            meta_data: doc! { "desc": "on-call group" },
            users: vec![UserRef { id: "u1".to_string(), name: "ada".to_string(), ..UserRef::default() }],
            user_ids: vec!["u1".to_string(), "u2".to_string()],
        };
        let doc = bson::to_document(&group).unwrap();
        let back: UserGroup = bson::from_document(doc).unwrap();
        assert_eq!(back, group);
    }

    #[rstest]
    #[tokio::test]
    async fn create_propagates_the_not_connected_sentinel() {
        let store = disconnected_store();
        let result = store.create(&UserGroup { name: "ops".to_string(), ..UserGroup::default() }).await;
        assert!(matches!(result, Err(StoreError::CreateUserGroup(DatabaseError::NotConnected))));
    }

    #[rstest]
    #[tokio::test]
    async fn membership_updates_propagate_the_sentinel() {
        let store = disconnected_store();
        let id = ObjectId::new();
        assert!(matches!(
            store.add_user(id, "u1").await,
            Err(StoreError::UpdateUserGroupMembers(DatabaseError::NotConnected))
        ));
        assert!(matches!(
            store.remove_user(id, "u1").await,
            Err(StoreError::UpdateUserGroupMembers(DatabaseError::NotConnected))
        ));
    }

    /// Full round trip against a local mongod.
    #[rstest]
    #[tokio::test]
    #[ignore = "requires a running mongod on localhost:27017"]
    async fn live_membership_round_trip() {
        let db = MongoDb::new(Arc::new(MongoConnection::new()));
        let (tx, rx) = tokio::sync::oneshot::channel();
        db.connection().connect("mongodb://localhost:27017", Some(tx)).await.unwrap();
        rx.await.unwrap();

        let store = MongoUserGroupStore::new(db);
        let id = store
            .create(&UserGroup {
                name: "ops".to_string(),
                meta_data: doc! { "desc": "on-call group" },
                ..UserGroup::default()
            })
            .await
            .unwrap();

        store.add_user(id, "u1").await.unwrap();
        store.add_user(id, "u1").await.unwrap();
        store.add_user(id, "u2").await.unwrap();
        let group = store.get_by_id(id).await.unwrap();
        assert_eq!(group.user_ids, vec!["u1".to_string(), "u2".to_string()]);

        store.remove_user(id, "u1").await.unwrap();
        assert_eq!(store.get_by_id(id).await.unwrap().user_ids, vec!["u2".to_string()]);

        store.update_name(id, "ops-renamed").await.unwrap();
        assert_eq!(store.get_by_id(id).await.unwrap().name, "ops-renamed");

        store.delete_by_id(id).await.unwrap();
        assert!(matches!(store.get_by_id(id).await, Err(StoreError::UserGroupNotFound(_))));
    }
}
