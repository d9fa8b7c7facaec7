//! Principal (account) schema
//!
//! Principals are keyed by the identity provider's uid. Role is chosen at
//! sign-up and never elevated here; only `disabled` is mutated afterwards.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::{Entity, IntoIndexes};
use crate::types::BoardError;

/// Collection name for principals
pub const PRINCIPAL_COLLECTION: &str = "users";

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Faculty,
    #[default]
    Student,
    Staff,
    Moderator,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Faculty => "faculty",
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Moderator => "moderator",
            Role::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "faculty" => Ok(Role::Faculty),
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            "moderator" => Ok(Role::Moderator),
            "administrator" => Ok(Role::Administrator),
            other => Err(BoardError::BadRequest(format!("Unknown role: {other}"))),
        }
    }
}

/// Principal record stored in the `users` collection
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub email: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub disabled: bool,

    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// New enabled principal, as written at sign-up
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            disabled: false,
            created_at: Utc::now(),
        }
    }
}

impl Entity for Principal {
    const COLLECTION: &'static str = PRINCIPAL_COLLECTION;
}

impl IntoIndexes for Principal {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .name("email_index".to_string())
                    .build(),
            ),
        )]
    }
}
