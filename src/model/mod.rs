//! Record schemas for Campus Board
//!
//! Defines the document shapes stored for principals, posts, comments,
//! subscriptions and notifications. Field names are camelCase on the wire
//! and in the store.

mod category;
mod post;
mod principal;
mod subscription;

use bson::Document;
use mongodb::options::IndexOptions;
use serde::{de::DeserializeOwned, Serialize};

pub use category::Category;
pub use post::{Comment, NewPost, Post, PostUpdate, COMMENT_COLLECTION, POST_COLLECTION};
pub use principal::{Principal, Role, PRINCIPAL_COLLECTION};
pub use subscription::{
    Notification, Subscription, NOTIFICATION_COLLECTION, SUBSCRIPTION_COLLECTION,
};

/// A record type bound to its collection
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
}

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}
