//! Search index sync
//!
//! Posts are projected into an external full-text index when they are
//! created. The index is a secondary, best-effort view:
//!
//! - write failures are logged and swallowed, post creation never fails
//!   because of the index
//! - query failures degrade to an empty result
//! - edits and deletions are not propagated, so stale entries persist
//!
//! ## Backends
//!
//! - [`ElasticIndex`]: Elasticsearch-compatible HTTP endpoint
//! - [`MemorySearchIndex`]: in-process term matcher for dev mode and tests

mod elastic;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::Post;
use crate::store::Stored;
use crate::types::Result;

pub use elastic::ElasticIndex;
pub use memory::MemorySearchIndex;

/// Fields matched by a search query
pub const SEARCH_FIELDS: [&str; 3] = ["title", "description", "category"];

/// Denormalized post projection held in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

impl SearchDocument {
    pub fn from_post(post: &Stored<Post>) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            category: post.category.to_string(),
        }
    }
}

/// External full-text index
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Upsert a projection keyed by its id
    async fn index_post(&self, doc: &SearchDocument) -> Result<()>;

    /// Ranked matches across [`SEARCH_FIELDS`]
    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>>;
}

/// Fail-soft front of a [`SearchIndex`]
#[derive(Clone)]
pub struct SearchSync {
    index: Arc<dyn SearchIndex>,
}

impl SearchSync {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Push a post into the index. Returns whether the write succeeded.
    pub async fn index(&self, post: &Stored<Post>) -> bool {
        match self.index.index_post(&SearchDocument::from_post(post)).await {
            Ok(()) => {
                debug!("Indexed post {}", post.id);
                true
            }
            Err(e) => {
                warn!("Indexing post {} failed: {}", post.id, e);
                false
            }
        }
    }

    /// Search posts; empty queries and failures yield no results
    pub async fn search(&self, query: &str) -> Vec<SearchDocument> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.index.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, NewPost};

    fn stored(id: &str, title: &str) -> Stored<Post> {
        let data = NewPost {
            title: title.into(),
            description: "Bring water".into(),
            category: Category::HealthAndWellness,
            image_ref: None,
        }
        .into_post("a@x.com")
        .unwrap();
        Stored {
            id: id.into(),
            data,
        }
    }

    #[test]
    fn test_projection_uses_display_category() {
        let doc = SearchDocument::from_post(&stored("p1", "Yoga"));
        assert_eq!(doc.id, "p1");
        assert_eq!(doc.category, "Health and Wellness");
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let index = Arc::new(MemorySearchIndex::new());
        index.set_failing(true);
        let sync = SearchSync::new(index.clone());

        assert!(!sync.index(&stored("p1", "Yoga")).await);
        assert!(sync.search("yoga").await.is_empty());

        index.set_failing(false);
        assert!(sync.index(&stored("p1", "Yoga")).await);
        assert_eq!(sync.search("yoga").await.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let index = Arc::new(MemorySearchIndex::new());
        let sync = SearchSync::new(index);
        sync.index(&stored("p1", "Yoga")).await;
        assert!(sync.search("").await.is_empty());
        assert!(sync.search("   ").await.is_empty());
    }
}
