//! Content store adapter
//!
//! Posts and their comments over the document store. Post ids are assigned
//! by the store. Comments reference their parent through `postId` and keep
//! arrival order.
//!
//! Deleting a post removes the post and every comment in a single batch, so
//! a failure leaves both fully present.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::model::{
    Category, Comment, NewPost, Post, PostUpdate, COMMENT_COLLECTION, POST_COLLECTION,
};
use crate::store::{encode, Collection, DocumentStore, Filter, LiveQuery, Stored, WriteBatch};
use crate::types::{BoardError, Result};

#[derive(Clone)]
pub struct ContentStore {
    posts: Collection<Post>,
    comments: Collection<Comment>,
}

impl ContentStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            posts: Collection::new(Arc::clone(&store)),
            comments: Collection::new(store),
        }
    }

    /// Insert a post; the returned record carries the store-assigned id
    pub async fn create_post(&self, draft: NewPost, author_email: &str) -> Result<Stored<Post>> {
        let post = draft.into_post(author_email)?;
        let id = self.posts.insert(&post).await?;
        info!("Created post {} in {} by {}", id, post.category, author_email);

        Ok(Stored { id, data: post })
    }

    pub async fn get_post(&self, id: &str) -> Result<Stored<Post>> {
        self.posts
            .get(id)
            .await?
            .ok_or_else(|| BoardError::not_found("post", id))
    }

    /// All posts in store order
    pub async fn posts(&self) -> Result<Vec<Stored<Post>>> {
        self.posts.query(&Filter::all()).await
    }

    pub async fn posts_by_category(&self, category: Category) -> Result<Vec<Stored<Post>>> {
        self.posts.query(&Filter::eq("category", category)).await
    }

    /// Live snapshots of every post
    pub async fn stream_posts(&self) -> Result<LiveQuery<Post>> {
        self.posts.watch(Filter::all()).await
    }

    /// Apply a partial update and bump `updatedAt`
    pub async fn update_post(&self, id: &str, update: PostUpdate) -> Result<Stored<Post>> {
        if update.is_empty() {
            return Err(BoardError::BadRequest("Nothing to update".into()));
        }

        let update = PostUpdate {
            title: match update.title {
                Some(title) if title.trim().is_empty() => {
                    return Err(BoardError::BadRequest("Post title is required".into()))
                }
                Some(title) => Some(title.trim().to_string()),
                None => None,
            },
            description: update.description,
        };

        let mut fields = encode(&update)?;
        fields.insert("updatedAt", bson::to_bson(&Utc::now())?);

        self.posts.update(id, fields).await.map_err(|e| match e {
            BoardError::NotFound(_) => BoardError::not_found("post", id),
            other => other,
        })?;

        self.get_post(id).await
    }

    /// Delete a post together with all its comments, atomically
    pub async fn delete_post(&self, id: &str) -> Result<()> {
        self.get_post(id).await?;

        let children = self.comments.query(&Filter::eq("postId", id)).await?;

        let mut batch = WriteBatch::new();
        for comment in &children {
            batch.delete(COMMENT_COLLECTION, &comment.id);
        }
        batch.delete(POST_COLLECTION, id);

        self.posts.store().commit(batch).await?;
        info!("Deleted post {} with {} comments", id, children.len());
        Ok(())
    }

    pub async fn add_comment(&self, post_id: &str, text: &str) -> Result<Stored<Comment>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BoardError::BadRequest("Comment text is required".into()));
        }

        self.get_post(post_id).await?;

        let comment = Comment {
            post_id: post_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        let id = self.comments.insert(&comment).await?;
        debug!("Added comment {} to post {}", id, post_id);

        Ok(Stored { id, data: comment })
    }

    /// Comments of a post in arrival order
    pub async fn comments(&self, post_id: &str) -> Result<Vec<Stored<Comment>>> {
        self.comments.query(&Filter::eq("postId", post_id)).await
    }

    pub async fn stream_comments(&self, post_id: &str) -> Result<LiveQuery<Comment>> {
        self.comments.watch(Filter::eq("postId", post_id)).await
    }
}
