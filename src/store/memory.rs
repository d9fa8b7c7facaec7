//! In-process document store
//!
//! Backs dev mode and the test suite. Records keep insertion order, batches
//! are staged on copies of the touched collections and swapped in only when
//! every op applied, and each collection has a version channel that drives
//! live snapshots.
//!
//! [`Fault`]s can be armed to exercise failure paths (partial fan-out, a
//! batch failing mid-way, unreadable collections).

use async_trait::async_trait;
use bson::Document;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{DocumentStore, Filter, Record, Snapshots, WriteBatch, WriteOp};
use crate::types::{BoardError, Result};

/// Injected failure
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// The next commit fails when it reaches op `index`; one-shot
    BatchOp(usize),
    /// Inserts into `collection` succeed `after` more times, then fail
    FailInserts { collection: String, after: usize },
    /// Reads (`get`, `query`) on `collection` fail
    FailReads { collection: String },
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Record>>,
    versions: HashMap<String, watch::Sender<u64>>,
    faults: Vec<Fault>,
}

impl State {
    fn version(&mut self, collection: &str) -> &watch::Sender<u64> {
        self.versions
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(0).0)
    }

    fn bump(&mut self, collection: &str) {
        self.version(collection).send_modify(|v| *v += 1);
    }

    fn check_read(&self, collection: &str) -> Result<()> {
        let failing = self.faults.iter().any(|f| {
            matches!(f, Fault::FailReads { collection: c } if c.as_str() == collection)
        });
        if failing {
            return Err(BoardError::Database(format!(
                "Injected read failure on {collection}"
            )));
        }
        Ok(())
    }

    fn check_insert(&mut self, collection: &str) -> Result<()> {
        for fault in self.faults.iter_mut() {
            if let Fault::FailInserts { collection: c, after } = fault {
                if c.as_str() == collection {
                    if *after == 0 {
                        return Err(BoardError::Database(format!(
                            "Injected insert failure on {collection}"
                        )));
                    }
                    *after -= 1;
                }
            }
        }
        Ok(())
    }

    fn take_batch_fault(&mut self) -> Option<usize> {
        let pos = self
            .faults
            .iter()
            .position(|f| matches!(f, Fault::BatchOp(_)))?;
        match self.faults.remove(pos) {
            Fault::BatchOp(index) => Some(index),
            _ => None,
        }
    }
}

/// In-memory [`DocumentStore`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a failure
    pub async fn inject(&self, fault: Fault) {
        self.state.write().await.faults.push(fault);
    }

    /// Disarm every failure
    pub async fn clear_faults(&self) {
        self.state.write().await.faults.clear();
    }

    /// Number of records in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }
}

fn apply(collections: &mut HashMap<String, Vec<Record>>, op: WriteOp) -> Result<()> {
    match op {
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let record = collections
                .get_mut(&collection)
                .and_then(|records| records.iter_mut().find(|r| r.id == id))
                .ok_or_else(|| BoardError::not_found(&collection, &id))?;
            for (key, value) in fields {
                record.data.insert(key, value);
            }
        }
        WriteOp::Delete { collection, id } => {
            if let Some(records) = collections.get_mut(&collection) {
                records.retain(|r| r.id != id);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, data: Document) -> Result<String> {
        let mut state = self.state.write().await;
        state.check_insert(collection)?;

        let id = Uuid::new_v4().simple().to_string();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Record {
                id: id.clone(),
                data,
            });
        state.bump(collection);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, data: Document) -> Result<()> {
        let mut state = self.state.write().await;
        let records = state
            .collections
            .entry(collection.to_string())
            .or_default();
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => existing.data = data,
            None => records.push(Record {
                id: id.to_string(),
                data,
            }),
        }
        state.bump(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let state = self.state.read().await;
        state.check_read(collection)?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>> {
        let state = self.state.read().await;
        state.check_read(collection)?;
        Ok(state
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(&r.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mut state = self.state.write().await;
        apply(
            &mut state.collections,
            WriteOp::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            },
        )?;
        state.bump(collection);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut state = self.state.write().await;
        let fail_at = state.take_batch_fault();

        // Stage copies of every touched collection
        let mut staged: HashMap<String, Vec<Record>> = HashMap::new();
        for op in batch.ops() {
            let name = match op {
                WriteOp::Update { collection, .. }
                | WriteOp::Delete { collection, .. } => collection,
            };
            if !staged.contains_key(name) {
                let current = state.collections.get(name).cloned().unwrap_or_default();
                staged.insert(name.clone(), current);
            }
        }

        let op_count = batch.len();
        for (index, op) in batch.into_ops().into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(BoardError::Database(format!(
                    "Injected failure at batch op {index}"
                )));
            }
            apply(&mut staged, op)?;
        }

        let touched: Vec<String> = staged.keys().cloned().collect();
        state.collections.extend(staged);
        for collection in &touched {
            state.bump(collection);
        }
        debug!("Committed batch of {} ops across {:?}", op_count, touched);
        Ok(())
    }

    async fn watch(&self, collection: &str, filter: Filter) -> Result<Snapshots> {
        let rx = self.state.write().await.version(collection).subscribe();
        let seed = (self.clone(), rx, collection.to_string(), filter, true);

        let snapshots = stream::unfold(seed, |(store, mut rx, collection, filter, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = store.query(&collection, &filter).await;
            Some((snapshot, (store, rx, collection, filter, false)))
        });

        Ok(snapshots.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids_in_order() {
        let store = MemoryStore::new();
        let a = store.insert("posts", doc! { "title": "a" }).await.unwrap();
        let b = store.insert("posts", doc! { "title": "b" }).await.unwrap();
        assert_ne!(a, b);

        let all = store.query("posts", &Filter::all()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_put_creates_then_overwrites() {
        let store = MemoryStore::new();
        store.put("users", "u1", doc! { "email": "a@x.com" }).await.unwrap();
        store
            .put("users", "u1", doc! { "email": "b@x.com" })
            .await
            .unwrap();

        let all = store.query("users", &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "u1");
        assert_eq!(all[0].data.get_str("email").unwrap(), "b@x.com");
    }

    #[tokio::test]
    async fn test_update_merges_and_missing_is_not_found() {
        let store = MemoryStore::new();
        let id = store
            .insert("posts", doc! { "title": "a", "description": "x" })
            .await
            .unwrap();
        store
            .update("posts", &id, doc! { "title": "b" })
            .await
            .unwrap();

        let record = store.get("posts", &id).await.unwrap().unwrap();
        assert_eq!(record.data, doc! { "title": "b", "description": "x" });

        let err = store
            .update("posts", "nope", doc! { "title": "c" })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_fault_preserves_state() {
        let store = MemoryStore::new();
        let post = store.insert("posts", doc! { "title": "a" }).await.unwrap();
        let c1 = store.insert("comments", doc! { "postId": &post }).await.unwrap();

        store.inject(Fault::BatchOp(1)).await;
        let mut batch = WriteBatch::new();
        batch.delete("comments", &c1).delete("posts", &post);
        assert!(store.commit(batch.clone()).await.is_err());

        assert_eq!(store.count("posts").await, 1);
        assert_eq!(store.count("comments").await, 1);

        // Fault was one-shot
        store.commit(batch).await.unwrap();
        assert_eq!(store.count("posts").await, 0);
        assert_eq!(store.count("comments").await, 0);
    }

    #[tokio::test]
    async fn test_failed_update_in_batch_rolls_back() {
        let store = MemoryStore::new();
        let id = store.insert("posts", doc! { "title": "a" }).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .delete("posts", &id)
            .update("posts", "missing", doc! { "title": "z" });
        assert!(store.commit(batch).await.is_err());
        assert!(store.get("posts", &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_fault_counts_successes() {
        let store = MemoryStore::new();
        store
            .inject(Fault::FailInserts {
                collection: "notifications".into(),
                after: 1,
            })
            .await;

        assert!(store.insert("notifications", doc! {}).await.is_ok());
        assert!(store.insert("notifications", doc! {}).await.is_err());
        assert!(store.insert("posts", doc! {}).await.is_ok());

        store.clear_faults().await;
        assert!(store.insert("notifications", doc! {}).await.is_ok());
    }

    #[tokio::test]
    async fn test_watch_replays_full_snapshot_on_change() {
        let store = MemoryStore::new();
        store.insert("posts", doc! { "n": 1 }).await.unwrap();

        let mut live = store.watch("posts", Filter::all()).await.unwrap();
        let first = live.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        store.insert("posts", doc! { "n": 2 }).await.unwrap();
        let second = live.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].data, doc! { "n": 1 });
    }

    #[tokio::test]
    async fn test_watch_applies_filter() {
        let store = MemoryStore::new();
        let mut live = store
            .watch("comments", Filter::eq("postId", "p1"))
            .await
            .unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());

        store
            .insert("comments", doc! { "postId": "p2" })
            .await
            .unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());

        store
            .insert("comments", doc! { "postId": "p1" })
            .await
            .unwrap();
        assert_eq!(live.next().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_fault() {
        let store = MemoryStore::new();
        store
            .inject(Fault::FailReads {
                collection: "users".into(),
            })
            .await;
        assert!(store.get("users", "u1").await.is_err());
        assert!(store.query("posts", &Filter::all()).await.is_ok());
    }
}
