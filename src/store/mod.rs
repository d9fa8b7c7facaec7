//! Document store boundary
//!
//! The board never talks to a database driver directly. Everything goes
//! through [`DocumentStore`]: collection CRUD, query-by-field, live snapshot
//! subscriptions and atomic batch commits.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: in-process, used in dev mode and tests
//! - [`MongoStore`]: MongoDB, change streams for live snapshots and
//!   multi-document transactions for batches
//!
//! ## Live snapshots
//!
//! `watch` yields the full matching set first and again after every change to
//! the collection (replace, not patch). Dropping the stream removes the
//! listener; there is no other teardown.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::model::Entity;
use crate::types::{BoardError, Result};

pub use memory::{Fault, MemoryStore};
pub use mongo::MongoStore;

/// A stored document with its store-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub data: Document,
}

/// Stream of full snapshots
pub type Snapshots = BoxStream<'static, Result<Vec<Record>>>;

/// Typed stream of full snapshots
pub type LiveQuery<T> = BoxStream<'static, Result<Vec<Stored<T>>>>;

/// Conjunction of field equality clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Bson)>,
}

impl Filter {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Single equality clause
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::all().and(field, value)
    }

    /// Add another equality clause
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, data: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| data.get(field) == Some(value))
    }

    pub fn to_document(&self) -> Document {
        self.clauses
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

/// One operation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Merge fields into an existing record; fails the batch if absent
    Update {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Remove a record; absent records are not an error
    Delete { collection: String, id: String },
}

/// Ordered set of writes applied as a unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Document) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// External document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record; the store assigns and returns its id
    async fn insert(&self, collection: &str, data: Document) -> Result<String>;

    /// Create or overwrite a record under a caller-chosen id
    async fn put(&self, collection: &str, id: &str, data: Document) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>>;

    /// Matching records in store order
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Merge fields into an existing record (`NotFound` if absent)
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Apply every op or none of them
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Live snapshots of the matching records
    async fn watch(&self, collection: &str, filter: Filter) -> Result<Snapshots>;
}

/// A decoded record with its id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Document> {
    Ok(bson::to_document(value)?)
}

pub fn decode<T: Entity>(record: Record) -> Result<Stored<T>> {
    let data = bson::from_document(record.data).map_err(|e| {
        BoardError::Database(format!(
            "Malformed {} record {}: {}",
            T::COLLECTION,
            record.id,
            e
        ))
    })?;
    Ok(Stored {
        id: record.id,
        data,
    })
}

/// Typed handle over one collection of a [`DocumentStore`]
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn insert(&self, value: &T) -> Result<String> {
        self.store.insert(T::COLLECTION, encode(value)?).await
    }

    pub async fn put(&self, id: &str, value: &T) -> Result<()> {
        self.store.put(T::COLLECTION, id, encode(value)?).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Stored<T>>> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn query(&self, filter: &Filter) -> Result<Vec<Stored<T>>> {
        self.store
            .query(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn update(&self, id: &str, fields: Document) -> Result<()> {
        self.store.update(T::COLLECTION, id, fields).await
    }

    pub async fn watch(&self, filter: Filter) -> Result<LiveQuery<T>> {
        let snapshots = self.store.watch(T::COLLECTION, filter).await?;
        Ok(snapshots
            .map(|snapshot| snapshot.and_then(|records| records.into_iter().map(decode).collect()))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_filter_matches_all_clauses() {
        let data = doc! { "category": "Sports", "principalEmail": "b@x.com" };
        assert!(Filter::all().matches(&data));
        assert!(Filter::eq("category", "Sports").matches(&data));
        assert!(!Filter::eq("category", "Sports")
            .and("principalEmail", "a@x.com")
            .matches(&data));
        assert!(!Filter::eq("missing", true).matches(&data));
    }

    #[test]
    fn test_filter_to_document() {
        let filter = Filter::eq("postId", "p1").and("read", false);
        assert_eq!(filter.to_document(), doc! { "postId": "p1", "read": false });
    }

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.delete("comments", "c1").delete("posts", "p1");
        assert_eq!(batch.len(), 2);
        assert!(matches!(&batch.ops()[1], WriteOp::Delete { collection, .. } if collection == "posts"));
    }
}
