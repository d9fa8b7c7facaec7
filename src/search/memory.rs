//! In-process search index
//!
//! Scores each document by how many query terms it contains, weighting title
//! hits double. Ties keep indexing order.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{SearchDocument, SearchIndex};
use crate::types::{BoardError, Result};

#[derive(Default)]
pub struct MemorySearchIndex {
    docs: RwLock<Vec<SearchDocument>>,
    failing: AtomicBool,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BoardError::Search("Search index unavailable".into()));
        }
        Ok(())
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn score(doc: &SearchDocument, query: &[String]) -> usize {
    let title = terms(&doc.title);
    let rest: Vec<String> = terms(&doc.description)
        .into_iter()
        .chain(terms(&doc.category))
        .collect();

    query
        .iter()
        .map(|q| {
            let mut s = 0;
            if title.contains(q) {
                s += 2;
            }
            if rest.contains(q) {
                s += 1;
            }
            s
        })
        .sum()
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index_post(&self, doc: &SearchDocument) -> Result<()> {
        self.check()?;
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>> {
        self.check()?;
        let query = terms(query);
        let docs = self.docs.read().await;

        let mut ranked: Vec<(usize, &SearchDocument)> = docs
            .iter()
            .map(|d| (score(d, &query), d))
            .filter(|(s, _)| *s > 0)
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked.into_iter().map(|(_, d)| d.clone()).collect())
    }
}
