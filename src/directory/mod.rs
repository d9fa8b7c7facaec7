//! Admin directory
//!
//! Principal records keyed by the identity provider's uid. Administrators
//! list them live and flip `disabled`; the identity gate enforces the flag on
//! its next evaluation of that principal.

use bson::doc;
use std::sync::Arc;
use tracing::info;

use crate::model::{Principal, Role};
use crate::store::{Collection, DocumentStore, Filter, LiveQuery, Stored};
use crate::types::{BoardError, Result};

#[derive(Clone)]
pub struct Directory {
    principals: Collection<Principal>,
}

impl Directory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            principals: Collection::new(store),
        }
    }

    /// Write the principal record at sign-up.
    ///
    /// An existing record is returned unchanged, so re-registering never
    /// re-enables a disabled account or changes its role.
    pub async fn register(&self, uid: &str, email: &str, role: Role) -> Result<Stored<Principal>> {
        if let Some(existing) = self.principals.get(uid).await? {
            return Ok(existing);
        }

        let principal = Principal::new(email, role);
        self.principals.put(uid, &principal).await?;
        info!("Registered principal {} ({}) as {}", uid, email, role);

        Ok(Stored {
            id: uid.to_string(),
            data: principal,
        })
    }

    pub async fn get(&self, uid: &str) -> Result<Option<Stored<Principal>>> {
        self.principals.get(uid).await
    }

    /// Current set of principals
    pub async fn principals(&self) -> Result<Vec<Stored<Principal>>> {
        self.principals.query(&Filter::all()).await
    }

    /// Live set of principals; drop the stream to stop listening
    pub async fn stream_principals(&self) -> Result<LiveQuery<Principal>> {
        self.principals.watch(Filter::all()).await
    }

    pub async fn set_disabled(&self, uid: &str, disabled: bool) -> Result<()> {
        self.principals
            .update(uid, doc! { "disabled": disabled })
            .await
            .map_err(|e| match e {
                BoardError::NotFound(_) => BoardError::not_found("principal", uid),
                other => other,
            })?;

        if disabled {
            info!("Principal {} disabled", uid);
        } else {
            info!("Principal {} enabled", uid);
        }
        Ok(())
    }
}
