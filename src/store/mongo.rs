//! MongoDB document store
//!
//! Record ids are stored as string `_id`s. Store-assigned ids are fresh
//! ObjectId hex strings, so sorting on `_id` yields arrival order.
//!
//! Batches run inside a multi-document transaction and live snapshots ride
//! on collection change streams; both need a replica set deployment.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::stream::{self, StreamExt, TryStreamExt};
use mongodb::{options::IndexOptions, Client, ClientSession, IndexModel};
use tracing::{error, info, warn};

use super::{DocumentStore, Filter, Record, Snapshots, WriteBatch, WriteOp};
use crate::model::{Entity, IntoIndexes};
use crate::types::{BoardError, Result};

type RawCollection = mongodb::Collection<Document>;

/// MongoDB-backed [`DocumentStore`]
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect and verify the deployment answers a ping
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast when MongoDB is unreachable
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| BoardError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| BoardError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Apply the schema-declared indexes of an entity's collection
    pub async fn ensure_indexes<T: Entity + IntoIndexes>(&self) -> Result<()> {
        let schema_indices: Vec<(Document, Option<IndexOptions>)> = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.raw(T::COLLECTION)
            .create_indexes(indices)
            .await
            .map_err(|e| BoardError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    fn raw(&self, collection: &str) -> RawCollection {
        self.client.database(&self.db_name).collection(collection)
    }

    async fn apply(&self, session: &mut ClientSession, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                let result = self
                    .raw(&collection)
                    .update_one(doc! { "_id": &id }, doc! { "$set": fields })
                    .session(&mut *session)
                    .await?;
                if result.matched_count == 0 {
                    return Err(BoardError::not_found(&collection, &id));
                }
            }
            WriteOp::Delete { collection, id } => {
                self.raw(&collection)
                    .delete_one(doc! { "_id": id })
                    .session(&mut *session)
                    .await?;
            }
        }
        Ok(())
    }
}

fn into_record(mut data: Document) -> Result<Record> {
    let id = match data.remove("_id") {
        Some(Bson::String(id)) => id,
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => return Err(BoardError::Database("Record without _id".into())),
    };
    Ok(Record { id, data })
}

async fn find_sorted(collection: &RawCollection, filter: Document) -> Result<Vec<Record>> {
    let cursor = collection
        .find(filter)
        .sort(doc! { "_id": 1 })
        .await
        .map_err(|e| BoardError::Database(format!("Find failed: {}", e)))?;

    let documents: Vec<Document> = cursor
        .try_collect()
        .await
        .map_err(|e| BoardError::Database(format!("Cursor failed: {}", e)))?;

    documents.into_iter().map(into_record).collect()
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert(&self, collection: &str, mut data: Document) -> Result<String> {
        let id = ObjectId::new().to_hex();
        data.insert("_id", id.clone());

        self.raw(collection)
            .insert_one(data)
            .await
            .map_err(|e| BoardError::Database(format!("Insert failed: {}", e)))?;

        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, mut data: Document) -> Result<()> {
        data.insert("_id", id);

        self.raw(collection)
            .replace_one(doc! { "_id": id }, data)
            .upsert(true)
            .await
            .map_err(|e| BoardError::Database(format!("Put failed: {}", e)))?;

        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        self.raw(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| BoardError::Database(format!("Find failed: {}", e)))?
            .map(into_record)
            .transpose()
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>> {
        find_sorted(&self.raw(collection), filter.to_document()).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let result = self
            .raw(collection)
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .await
            .map_err(|e| BoardError::Database(format!("Update failed: {}", e)))?;

        if result.matched_count == 0 {
            return Err(BoardError::not_found(collection, id));
        }
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        for op in batch.into_ops() {
            if let Err(e) = self.apply(&mut session, op).await {
                if let Err(abort) = session.abort_transaction().await {
                    warn!("Abort after failed batch also failed: {}", abort);
                }
                return Err(e);
            }
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| BoardError::Database(format!("Commit failed: {}", e)))
    }

    async fn watch(&self, collection: &str, filter: Filter) -> Result<Snapshots> {
        let raw = self.raw(collection);
        let changes = raw
            .watch()
            .await
            .map_err(|e| BoardError::Database(format!("Watch failed: {}", e)))?;

        let seed = Some((raw, changes, filter.to_document(), true));
        let snapshots = stream::unfold(seed, |state| async move {
            let (raw, mut changes, filter, first) = state?;
            if !first {
                match changes.next().await {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Change stream on {} failed: {}", raw.name(), e);
                        let err = BoardError::Database(format!("Change stream failed: {}", e));
                        return Some((Err(err), None));
                    }
                    None => return None,
                }
            }
            let snapshot = find_sorted(&raw, filter.clone()).await;
            Some((snapshot, Some((raw, changes, filter, false))))
        });

        Ok(snapshots.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_is_lifted_out_of_the_document() {
        let record = into_record(doc! { "_id": "p1", "title": "Hello" }).unwrap();
        assert_eq!(record.id, "p1");
        assert!(!record.data.contains_key("_id"));
        assert_eq!(record.data.get_str("title").unwrap(), "Hello");
    }

    #[test]
    fn test_object_id_becomes_hex() {
        let oid = ObjectId::new();
        let record = into_record(doc! { "_id": oid, "title": "Hello" }).unwrap();
        assert_eq!(record.id, oid.to_hex());
    }

    #[test]
    fn test_other_id_types_are_stringified() {
        let record = into_record(doc! { "_id": 7_i32 }).unwrap();
        assert_eq!(record.id, "7");
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_missing_id_is_a_database_error() {
        let err = into_record(doc! { "title": "orphan" }).unwrap_err();
        assert!(matches!(err, BoardError::Database(_)));
    }
}
