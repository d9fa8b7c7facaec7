//! Category subscription and notification schemas

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::model::{Category, Entity, IntoIndexes};

/// Collection name for subscriptions
pub const SUBSCRIPTION_COLLECTION: &str = "subscriptions";

/// Collection name for notifications
pub const NOTIFICATION_COLLECTION: &str = "notifications";

/// One principal's interest in one category
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub principal_email: String,
    pub category: Category,
    pub subscribed_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(principal_email: impl Into<String>, category: Category) -> Self {
        Self {
            principal_email: principal_email.into(),
            category,
            subscribed_at: Utc::now(),
        }
    }
}

impl Entity for Subscription {
    const COLLECTION: &'static str = SUBSCRIPTION_COLLECTION;
}

impl IntoIndexes for Subscription {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Fan-out lookup
            (
                doc! { "category": 1 },
                Some(
                    IndexOptions::builder()
                        .name("category_index".to_string())
                        .build(),
                ),
            ),
            // Not unique: a racing duplicate is tolerated
            (
                doc! { "principalEmail": 1, "category": 1 },
                Some(
                    IndexOptions::builder()
                        .name("principal_category_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

/// Notification written by the fan-out; only `read` ever changes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient_email: String,
    pub message: String,
    pub category: Category,
    /// Post that triggered the notification
    #[serde(default)]
    pub post_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Entity for Notification {
    const COLLECTION: &'static str = NOTIFICATION_COLLECTION;
}

impl IntoIndexes for Notification {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "recipientEmail": 1 },
            Some(
                IndexOptions::builder()
                    .name("recipient_index".to_string())
                    .build(),
            ),
        )]
    }
}
