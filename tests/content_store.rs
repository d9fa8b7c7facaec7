//! Integration tests for posts, comments and the cascading delete

use campus_board::content::ContentStore;
use campus_board::model::{Category, NewPost};
use campus_board::store::{Fault, MemoryStore};
use campus_board::BoardError;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn draft(title: &str) -> NewPost {
    NewPost {
        title: title.into(),
        description: "Details inside".into(),
        category: Category::CareerServices,
        image_ref: Some("https://img.example/cv.png".into()),
    }
}

async fn post_with_comments(content: &ContentStore, comments: usize) -> String {
    let post = content.create_post(draft("Resume clinic"), "a@x.com").await.unwrap();
    for i in 0..comments {
        content
            .add_comment(&post.id, &format!("comment {i}"))
            .await
            .unwrap();
    }
    post.id
}

#[tokio::test]
async fn test_delete_removes_post_and_comments() {
    let store = Arc::new(MemoryStore::new());
    let content = ContentStore::new(store.clone());
    let keep = post_with_comments(&content, 1).await;
    let doomed = post_with_comments(&content, 3).await;

    content.delete_post(&doomed).await.unwrap();

    assert!(matches!(
        content.get_post(&doomed).await,
        Err(BoardError::NotFound(_))
    ));
    assert!(content.comments(&doomed).await.unwrap().is_empty());

    // Unrelated post untouched
    assert!(content.get_post(&keep).await.is_ok());
    assert_eq!(content.comments(&keep).await.unwrap().len(), 1);
    assert_eq!(store.count("comments").await, 1);
}

#[tokio::test]
async fn test_failed_delete_leaves_everything_in_place() {
    let store = Arc::new(MemoryStore::new());
    let content = ContentStore::new(store.clone());
    let id = post_with_comments(&content, 3).await;

    // Fail after two comment deletes have been staged
    store.inject(Fault::BatchOp(2)).await;
    let err = content.delete_post(&id).await.unwrap_err();
    assert!(matches!(err, BoardError::Database(_)));

    assert!(content.get_post(&id).await.is_ok());
    assert_eq!(content.comments(&id).await.unwrap().len(), 3);

    // Failing on the final op (the post itself) is just as atomic
    store.inject(Fault::BatchOp(3)).await;
    assert!(content.delete_post(&id).await.is_err());
    assert!(content.get_post(&id).await.is_ok());
    assert_eq!(content.comments(&id).await.unwrap().len(), 3);

    content.delete_post(&id).await.unwrap();
    assert_eq!(store.count("posts").await, 0);
    assert_eq!(store.count("comments").await, 0);
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found() {
    let content = ContentStore::new(Arc::new(MemoryStore::new()));
    let err = content.delete_post("nope").await.unwrap_err();
    assert!(matches!(err, BoardError::NotFound(_)));
}

#[tokio::test]
async fn test_stream_posts_replays_full_snapshots() {
    let content = ContentStore::new(Arc::new(MemoryStore::new()));
    let mut live = content.stream_posts().await.unwrap();
    assert!(timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap().is_empty());

    let first = content.create_post(draft("One"), "a@x.com").await.unwrap();
    let snapshot = timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);

    content.create_post(draft("Two"), "b@x.com").await.unwrap();
    let snapshot = timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap();
    let titles: Vec<_> = snapshot.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two"]);

    content.delete_post(&first.id).await.unwrap();
    let snapshot = timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].title, "Two");
}

#[tokio::test]
async fn test_stream_comments_is_scoped_to_post() {
    let content = ContentStore::new(Arc::new(MemoryStore::new()));
    let a = post_with_comments(&content, 0).await;
    let b = post_with_comments(&content, 0).await;

    let mut live = content.stream_comments(&a).await.unwrap();
    assert!(timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap().is_empty());

    content.add_comment(&b, "elsewhere").await.unwrap();
    content.add_comment(&a, "here").await.unwrap();

    // Snapshots may coalesce; wait for the one carrying the new comment
    loop {
        let snapshot = timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap();
        if !snapshot.is_empty() {
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot[0].text, "here");
            break;
        }
    }
}

#[tokio::test]
async fn test_image_ref_round_trips() {
    let content = ContentStore::new(Arc::new(MemoryStore::new()));
    let post = content.create_post(draft("With image"), "a@x.com").await.unwrap();
    let fetched = content.get_post(&post.id).await.unwrap();
    assert_eq!(
        fetched.image_ref.as_deref(),
        Some("https://img.example/cv.png")
    );
}
