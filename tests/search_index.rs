//! Integration tests for the HTTP search index and the fail-soft sync
//!
//! A wiremock server stands in for the search engine.

use campus_board::model::{Category, NewPost};
use campus_board::search::{ElasticIndex, SearchDocument, SearchIndex, SearchSync};
use campus_board::store::Stored;
use campus_board::BoardError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn doc(id: &str) -> SearchDocument {
    SearchDocument {
        id: id.into(),
        title: "Soccer tryouts".into(),
        description: "Bring cleats".into(),
        category: "Sports".into(),
    }
}

fn index(server: &MockServer) -> ElasticIndex {
    ElasticIndex::new(server.uri(), "posts", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_index_post_puts_projection_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/posts/_doc/p1"))
        .and(body_json(json!({
            "id": "p1",
            "title": "Soccer tryouts",
            "description": "Bring cleats",
            "category": "Sports"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "result": "created" })))
        .expect(1)
        .mount(&server)
        .await;

    index(&server).index_post(&doc("p1")).await.unwrap();
}

#[tokio::test]
async fn test_search_sends_multi_match_and_reads_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/_search"))
        .and(body_json(json!({
            "query": {
                "multi_match": {
                    "query": "soccer",
                    "fields": ["title", "description", "category"]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "hits": [
                    { "_id": "p1", "_score": 2.1, "_source": {
                        "id": "p1", "title": "Soccer tryouts",
                        "description": "Bring cleats", "category": "Sports" } },
                    { "_id": "p7", "_score": 0.4, "_source": {
                        "title": "Campus tour", "description": "soccer field stop",
                        "category": "Campus" } }
                ]
            }
        })))
        .mount(&server)
        .await;

    let hits = index(&server).search("soccer").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0], doc("p1"));
    // Sources without an id take the hit id
    assert_eq!(hits[1].id, "p7");
}

#[tokio::test]
async fn test_index_rejection_is_a_search_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_string("mapper_parsing_exception"))
        .mount(&server)
        .await;

    let err = index(&server).index_post(&doc("p1")).await.unwrap_err();
    assert!(matches!(err, BoardError::Search(_)));
}

#[tokio::test]
async fn test_sync_swallows_index_failures() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let post = Stored {
        id: "p1".to_string(),
        data: NewPost {
            title: "Soccer tryouts".into(),
            description: "Bring cleats".into(),
            category: Category::Sports,
            image_ref: None,
        }
        .into_post("a@x.com")
        .unwrap(),
    };

    let sync = SearchSync::new(Arc::new(index(&server)));
    assert!(!sync.index(&post).await);
    assert!(sync.search("soccer").await.is_empty());
}

#[tokio::test]
async fn test_sync_search_on_unreachable_index_is_empty() {
    // Nothing listens on the discard port
    let unreachable =
        ElasticIndex::new("http://127.0.0.1:9", "posts", Duration::from_millis(500)).unwrap();
    let sync = SearchSync::new(Arc::new(unreachable));
    assert!(sync.search("soccer").await.is_empty());
}

#[tokio::test]
async fn test_sync_skips_blank_queries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": { "hits": [] } })))
        .expect(0)
        .mount(&server)
        .await;

    let sync = SearchSync::new(Arc::new(index(&server)));
    assert!(sync.search("").await.is_empty());
    assert!(sync.search("  ").await.is_empty());
}

#[tokio::test]
async fn test_malformed_response_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let elastic = index(&server);
    assert!(matches!(
        elastic.search("soccer").await,
        Err(BoardError::Search(_))
    ));
    let sync = SearchSync::new(Arc::new(elastic));
    assert!(sync.search("soccer").await.is_empty());
}
