//! Generic CRUD helpers keyed by [`CollectionModel`] descriptors.
//!
//! Every operation re-fetches the live handle from the connection manager,
//! so a reconnect between two calls is transparent and a disconnected
//! manager surfaces as [`DatabaseError::NotConnected`] unchanged.

mod model;

pub use model::{to_bson_array, CollectionModel, ToDocument};

use crate::connection::MongoConnection;
use crate::error::DatabaseError;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Result of an update operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Stateless pass-throughs to the driver, bound to a connection manager.
#[derive(Clone)]
pub struct MongoDb {
    connection: Arc<MongoConnection>,
}

impl MongoDb {
    pub fn new(connection: Arc<MongoConnection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<MongoConnection> {
        &self.connection
    }

    /// Typed collection for a model. Fetched per call, never cached: the
    /// handle may change whenever the monitor reconnects.
    async fn collection<M: CollectionModel>(&self, model: &M) -> Result<Collection<M::Entity>, DatabaseError> {
        let client = self.connection.client().await?;
        Ok(client.database(model.database_name()).collection(model.collection_name()))
    }

    pub async fn find_one<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
    ) -> Result<Option<M::Entity>, DatabaseError> {
        Ok(self.collection(model).await?.find_one(filter, None).await?)
    }

    pub async fn find_many<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<M::Entity>, DatabaseError> {
        let cursor = self.collection(model).await?.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Insert a single entity, returning its inserted id.
    pub async fn insert_one<M: CollectionModel>(&self, model: &M, entity: &M::Entity) -> Result<Bson, DatabaseError> {
        let result = self.collection(model).await?.insert_one(entity, None).await?;
        Ok(result.inserted_id)
    }

    /// Insert several entities, returning their ids in input order.
    pub async fn insert_many<M: CollectionModel>(
        &self,
        model: &M,
        entities: &[M::Entity],
    ) -> Result<Vec<Bson>, DatabaseError> {
        let result = self.collection(model).await?.insert_many(entities, None).await?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    /// Update the first match, `$set`-ing the given fields.
    pub async fn update_one<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let result = self.collection(model).await?.update_one(filter, doc! { "$set": update }, None).await?;
        Ok(UpdateResult { matched_count: result.matched_count, modified_count: result.modified_count })
    }

    /// Update all matches, `$set`-ing the given fields.
    pub async fn update_many<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let result = self.collection(model).await?.update_many(filter, doc! { "$set": update }, None).await?;
        Ok(UpdateResult { matched_count: result.matched_count, modified_count: result.modified_count })
    }

    /// Update with caller-supplied operators, e.g. `$unset` to drop a key.
    pub async fn update_one_raw<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let result = self.collection(model).await?.update_one(filter, update, None).await?;
        Ok(UpdateResult { matched_count: result.matched_count, modified_count: result.modified_count })
    }

    /// `$addToSet` the given field values on the first match.
    pub async fn add_to_set<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let result = self.collection(model).await?.update_one(filter, doc! { "$addToSet": update }, None).await?;
        Ok(UpdateResult { matched_count: result.matched_count, modified_count: result.modified_count })
    }

    /// `$pull` the given field values from the first match.
    pub async fn pull_from_set<M: CollectionModel>(
        &self,
        model: &M,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let result = self.collection(model).await?.update_one(filter, doc! { "$pull": update }, None).await?;
        Ok(UpdateResult { matched_count: result.matched_count, modified_count: result.modified_count })
    }

    /// Delete the first match; it is an error to delete anything but
    /// exactly one document.
    pub async fn delete_one<M: CollectionModel>(&self, model: &M, filter: Document) -> Result<(), DatabaseError> {
        let result = self.collection(model).await?.delete_one(filter, None).await?;
        if result.deleted_count != 1 {
            return Err(DatabaseError::UnexpectedDeleteCount(result.deleted_count));
        }
        Ok(())
    }

    pub async fn delete_many<M: CollectionModel>(&self, model: &M, filter: Document) -> Result<u64, DatabaseError> {
        let result = self.collection(model).await?.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }

    /// Drop the model's whole collection.
    pub async fn drop_collection<M: CollectionModel>(&self, model: &M) -> Result<(), DatabaseError> {
        self.collection(model).await?.drop(None).await?;
        Ok(())
    }

    pub async fn count<M: CollectionModel>(&self, model: &M, filter: Document) -> Result<u64, DatabaseError> {
        Ok(self.collection(model).await?.count_documents(filter, None).await?)
    }

    pub async fn aggregate<M: CollectionModel, R>(
        &self,
        model: &M,
        pipeline: Vec<Document>,
    ) -> Result<Vec<R>, DatabaseError>
    where
        R: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self.collection(model).await?.aggregate(pipeline, None).await?;
        let results: Vec<R> = cursor
            .map_err(DatabaseError::Driver)
            .and_then(|document| async move {
                bson::from_document(document).map_err(|e| DatabaseError::FailedToSerializeDocument(e.to_string()))
            })
            .try_collect()
            .await?;
        Ok(results)
    }

    pub async fn distinct<M: CollectionModel>(
        &self,
        model: &M,
        field: &str,
        filter: Document,
    ) -> Result<Vec<Bson>, DatabaseError> {
        Ok(self.collection(model).await?.distinct(field, filter, None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::user::{User, UserModel};
    use rstest::rstest;

    fn disconnected_db() -> MongoDb {
        MongoDb::new(Arc::new(MongoConnection::new()))
    }

    #[rstest]
    fn exposes_its_connection_manager() {
        let connection = Arc::new(MongoConnection::new());
        let db = MongoDb::new(Arc::clone(&connection));
        assert!(Arc::ptr_eq(db.connection(), &connection));
    }

    /// The sentinel propagates unchanged when the connection manager
    /// reports disconnection; no operation touches the driver first.
    #[rstest]
    #[tokio::test]
    async fn operations_require_a_connection() {
        let db = disconnected_db();
        let model = UserModel;

        assert!(matches!(db.find_one(&model, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.find_many(&model, doc! {}, None).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.insert_one(&model, &User::default()).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.insert_many(&model, &[User::default()]).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.update_one(&model, doc! {}, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.update_many(&model, doc! {}, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.update_one_raw(&model, doc! {}, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.add_to_set(&model, doc! {}, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.pull_from_set(&model, doc! {}, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.delete_one(&model, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.delete_many(&model, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.drop_collection(&model).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.count(&model, doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.distinct(&model, "name", doc! {}).await, Err(DatabaseError::NotConnected)));
        assert!(matches!(db.aggregate::<_, Document>(&model, vec![]).await, Err(DatabaseError::NotConnected)));
    }
}
