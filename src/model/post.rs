//! Post and comment schemas
//!
//! Posts live in `posts`; comments live in `comments` and reference their
//! parent through `postId`. Post ids are always assigned by the store.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::model::{Category, Entity, IntoIndexes};
use crate::types::{BoardError, Result};

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Post record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub image_ref: Option<String>,
    /// Author email
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the author when creating a post
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl NewPost {
    /// Stamp the post with its author and creation time
    pub fn into_post(self, author_email: &str) -> Result<Post> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BoardError::BadRequest("Post title is required".into()));
        }

        let now = Utc::now();
        Ok(Post {
            title: title.to_string(),
            description: self.description,
            category: self.category,
            image_ref: self.image_ref.filter(|r| !r.trim().is_empty()),
            created_by: author_email.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial post update; absent fields are left untouched
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

impl Entity for Post {
    const COLLECTION: &'static str = POST_COLLECTION;
}

impl IntoIndexes for Post {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "category": 1 },
            Some(
                IndexOptions::builder()
                    .name("category_index".to_string())
                    .build(),
            ),
        )]
    }
}

/// Comment record; append-only
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub post_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Comment {
    const COLLECTION: &'static str = COMMENT_COLLECTION;
}

impl IntoIndexes for Comment {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "postId": 1 },
            Some(
                IndexOptions::builder()
                    .name("post_id_index".to_string())
                    .build(),
            ),
        )]
    }
}
