//! Subscription and notification engine
//!
//! Principals subscribe to categories. When a post is created, every
//! subscriber of its category except the author gets one notification.
//!
//! The fan-out is best-effort: each notification is an independent write,
//! a failed write is logged and counted, and nothing is rolled back or
//! retried. Notifications only ever move from unread to read.

use bson::doc;
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::model::{Category, Notification, Post, Subscription};
use crate::store::{Collection, DocumentStore, Filter, LiveQuery, Stored};
use crate::types::{BoardError, Result};

/// Result of a subscribe call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubscribeOutcome {
    /// Categories newly subscribed by this call
    pub added: Vec<Category>,
    /// Requested categories that were already subscribed
    pub existing: Vec<Category>,
}

/// What a single fan-out achieved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutReport {
    pub post_id: String,
    pub category: Category,
    pub delivered: usize,
    pub failed: usize,
    /// Subscriptions held by the post's author
    pub skipped_author: usize,
}

/// Message written into every notification for a post
pub fn notification_message(post: &Post) -> String {
    format!("New post in {}: {}", post.category, post.title)
}

#[derive(Clone)]
pub struct NotificationEngine {
    subscriptions: Collection<Subscription>,
    notifications: Collection<Notification>,
}

impl NotificationEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            subscriptions: Collection::new(Arc::clone(&store)),
            notifications: Collection::new(store),
        }
    }

    /// Subscribe to every requested category not already held.
    ///
    /// The existence check and the write are not atomic; a concurrent
    /// duplicate is tolerated.
    pub async fn subscribe(
        &self,
        email: &str,
        categories: &[Category],
    ) -> Result<SubscribeOutcome> {
        let mut held: BTreeSet<Category> = self
            .subscriptions(email)
            .await?
            .into_iter()
            .map(|s| s.category)
            .collect();

        let mut outcome = SubscribeOutcome::default();
        let mut seen = BTreeSet::new();
        for &category in categories {
            if !seen.insert(category) {
                continue;
            }
            if held.contains(&category) {
                outcome.existing.push(category);
                continue;
            }

            self.subscriptions
                .insert(&Subscription::new(email, category))
                .await?;
            held.insert(category);
            outcome.added.push(category);
        }

        if !outcome.added.is_empty() {
            info!("{} subscribed to {:?}", email, outcome.added);
        }
        Ok(outcome)
    }

    pub async fn subscriptions(&self, email: &str) -> Result<Vec<Stored<Subscription>>> {
        self.subscriptions
            .query(&Filter::eq("principalEmail", email))
            .await
    }

    /// Write one notification per subscriber of the post's category.
    ///
    /// Only the subscriber lookup can fail the call. Individual writes that
    /// fail are logged and counted in the report.
    pub async fn fan_out(&self, post: &Stored<Post>) -> Result<FanOutReport> {
        let subscribers = self.subscribers(post).await?;
        Ok(self.deliver(post, subscribers).await)
    }

    /// Subscriptions matching the post's category right now
    pub async fn subscribers(&self, post: &Stored<Post>) -> Result<Vec<Stored<Subscription>>> {
        self.subscriptions
            .query(&Filter::eq("category", post.category))
            .await
    }

    /// Notify a fixed recipient list, skipping the author
    pub async fn deliver(
        &self,
        post: &Stored<Post>,
        subscribers: Vec<Stored<Subscription>>,
    ) -> FanOutReport {
        let message = notification_message(post);
        let mut report = FanOutReport {
            post_id: post.id.clone(),
            category: post.category,
            delivered: 0,
            failed: 0,
            skipped_author: 0,
        };

        for subscription in subscribers {
            if subscription.principal_email == post.created_by {
                report.skipped_author += 1;
                continue;
            }

            let notification = Notification {
                recipient_email: subscription.principal_email.clone(),
                message: message.clone(),
                category: post.category,
                post_id: Some(post.id.clone()),
                created_at: chrono::Utc::now(),
                read: false,
            };

            match self.notifications.insert(&notification).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        "Notification for {} about post {} failed: {}",
                        subscription.principal_email, post.id, e
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            "Fan-out for post {} in {}: {} delivered, {} failed",
            report.post_id, report.category, report.delivered, report.failed
        );
        report
    }

    pub async fn notification(&self, id: &str) -> Result<Stored<Notification>> {
        self.notifications
            .get(id)
            .await?
            .ok_or_else(|| BoardError::not_found("notification", id))
    }

    /// Flip `read` to true; marking an already-read notification is a no-op
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let notification = self.notification(id).await?;
        if notification.read {
            debug!("Notification {} already read", id);
            return Ok(());
        }
        self.notifications.update(id, doc! { "read": true }).await
    }

    pub async fn notifications(&self, email: &str) -> Result<Vec<Stored<Notification>>> {
        self.notifications.query(&recipient(email)).await
    }

    /// Live snapshots of a principal's notifications
    pub async fn stream_for(&self, email: &str) -> Result<LiveQuery<Notification>> {
        self.notifications.watch(recipient(email)).await
    }

    pub async fn unread_count(&self, email: &str) -> Result<usize> {
        let unread = self
            .notifications
            .query(&recipient(email).and("read", false))
            .await?;
        Ok(unread.len())
    }

    /// Unread count, recomputed from every notification snapshot
    pub async fn unread_count_stream(
        &self,
        email: &str,
    ) -> Result<BoxStream<'static, Result<usize>>> {
        let live = self.stream_for(email).await?;
        Ok(live
            .map(|snapshot| snapshot.map(|all| all.iter().filter(|n| !n.read).count()))
            .boxed())
    }
}

fn recipient(email: &str) -> Filter {
    Filter::eq("recipientEmail", email)
}
