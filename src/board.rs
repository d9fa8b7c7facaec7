//! Board facade
//!
//! Wires the components over one document store and orchestrates post
//! creation. The post is written first and then pushed to the search index.
//! The subscribers of its category are looked up before the call returns, so
//! later subscriptions never see this post. Only the notification writes run
//! as a detached task. Only the store write can fail the call.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::content::ContentStore;
use crate::directory::Directory;
use crate::media::ImageStore;
use crate::model::{NewPost, Post};
use crate::notify::{FanOutReport, NotificationEngine};
use crate::search::{SearchIndex, SearchSync};
use crate::store::{DocumentStore, Stored};
use crate::types::Result;

#[derive(Clone)]
pub struct Board {
    pub directory: Directory,
    pub content: ContentStore,
    pub notifications: NotificationEngine,
    pub search: SearchSync,
    pub images: Option<Arc<dyn ImageStore>>,
}

/// A created post and its in-flight fan-out
pub struct CreatedPost {
    pub post: Stored<Post>,
    /// Whether the search index accepted the projection
    pub indexed: bool,
    pub fan_out: FanOutTask,
}

/// Detached notification fan-out. Dropping it does not cancel the work.
///
/// Holds no task when the subscriber lookup failed.
pub struct FanOutTask(Option<JoinHandle<FanOutReport>>);

impl FanOutTask {
    /// Wait for the fan-out; `None` if it could not run
    pub async fn wait(self) -> Option<FanOutReport> {
        match self.0?.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Fan-out task aborted: {}", e);
                None
            }
        }
    }
}

impl Board {
    pub fn new(store: Arc<dyn DocumentStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            directory: Directory::new(Arc::clone(&store)),
            content: ContentStore::new(Arc::clone(&store)),
            notifications: NotificationEngine::new(store),
            search: SearchSync::new(index),
            images: None,
        }
    }

    pub fn with_images(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    /// Create a post, index it and start the fan-out
    pub async fn create_post(&self, author_email: &str, draft: NewPost) -> Result<CreatedPost> {
        let post = self.content.create_post(draft, author_email).await?;
        let indexed = self.search.index(&post).await;

        let handle = match self.notifications.subscribers(&post).await {
            Ok(subscribers) => {
                let engine = self.notifications.clone();
                let target = post.clone();
                debug!(
                    "Fan-out for post {} spawned for {} subscriptions",
                    post.id,
                    subscribers.len()
                );
                Some(tokio::spawn(async move {
                    engine.deliver(&target, subscribers).await
                }))
            }
            Err(e) => {
                warn!("Fan-out for post {} could not start: {}", post.id, e);
                None
            }
        };

        Ok(CreatedPost {
            post,
            indexed,
            fan_out: FanOutTask(handle),
        })
    }
}
