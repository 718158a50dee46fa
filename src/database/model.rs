use crate::error::DatabaseError;
use mongodb::bson::{self, Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Per-entity descriptor: where an entity lives. All user-group collections
/// share one database, so only the collection name varies per model.
pub trait CollectionModel {
    type Entity: Serialize + DeserializeOwned + Unpin + Send + Sync;

    fn database_name(&self) -> &str {
        "userGroup"
    }

    fn collection_name(&self) -> &str;
}

/// Struct-to-document conversion for building updates out of entities.
pub trait ToDocument {
    fn to_document(&self) -> Result<Document, DatabaseError>;
}

impl<T: Serialize> ToDocument for T {
    fn to_document(&self) -> Result<Document, DatabaseError> {
        let value =
            bson::to_bson(self).map_err(|e| DatabaseError::FailedToSerializeDocument(e.to_string()))?;
        match value {
            Bson::Document(doc) => Ok(doc),
            other => Err(DatabaseError::FailedToSerializeDocument(format!("expected a document, got {}", other))),
        }
    }
}

/// Slice-to-BSON-array conversion, for `$in` filters and array-valued
/// updates.
pub fn to_bson_array<T: Serialize>(values: &[T]) -> Result<Vec<Bson>, DatabaseError> {
    values
        .iter()
        .map(|value| bson::to_bson(value).map_err(|e| DatabaseError::FailedToSerializeDocument(e.to_string())))
        .collect()
}
