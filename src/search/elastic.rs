//! Elasticsearch-compatible index over HTTP
//!
//! - `PUT {base}/{index}/_doc/{id}` with the projection as body
//! - `POST {base}/{index}/_search` with a `multi_match` query, hits read from
//!   `hits.hits[]._source`

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{SearchDocument, SearchIndex, SEARCH_FIELDS};
use crate::types::{BoardError, Result};

pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticIndex {
    pub fn new(
        base_url: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BoardError::Config(format!("Failed to create search client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, id)
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_source")]
    source: SearchDocument,
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn index_post(&self, doc: &SearchDocument) -> Result<()> {
        let response = self.client.put(self.doc_url(&doc.id)).json(doc).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BoardError::Search(format!(
                "Indexing {} failed: HTTP {}: {}",
                doc.id, status, body
            )));
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>> {
        let body = json!({
            "query": {
                "multi_match": {
                    "query": query,
                    "fields": SEARCH_FIELDS,
                }
            }
        });

        let response = self.client.post(self.search_url()).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BoardError::Search(format!("HTTP {}: {}", status, body)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| BoardError::Search(format!("Malformed search response: {}", e)))?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let mut doc = hit.source;
                if doc.id.is_empty() {
                    doc.id = hit.id.unwrap_or_default();
                }
                doc
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let index = ElasticIndex::new("http://localhost:9200/", "posts", Duration::from_secs(1)).unwrap();
        assert_eq!(index.doc_url("p1"), "http://localhost:9200/posts/_doc/p1");
        assert_eq!(index.search_url(), "http://localhost:9200/posts/_search");
    }

    #[test]
    fn test_hit_id_fills_missing_source_id() {
        let raw = r#"{"hits":{"hits":[{"_id":"p9","_source":{"title":"T","description":"","category":"Sports"}}]}}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.hits.hits[0].id.as_deref(), Some("p9"));
        assert!(parsed.hits.hits[0].source.id.is_empty());
    }
}
