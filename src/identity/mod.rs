//! Identity gate
//!
//! Turns session changes from the identity provider into an observable
//! principal state. Every session change is resolved against the directory:
//!
//! - no principal record: unauthenticated (no role)
//! - lookup failure: unauthenticated (fail-closed)
//! - disabled principal: the session is terminated at the source and a
//!   blocking message is surfaced; no user or role is exposed
//! - otherwise: current user, email and role
//!
//! State only moves in response to the session stream. There is no polling;
//! a disabled flag is enforced the next time the source emits for that
//! principal.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::directory::Directory;
use crate::model::{Principal, Role};
use crate::store::Stored;
use crate::types::{BoardError, Result};

/// Message surfaced when a disabled principal is signed out
pub const DISABLED_MESSAGE: &str = "Your account has been disabled by the administrator.";

/// An authenticated session as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
}

/// Source of session changes
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Current session first, then every change
    fn changes(&self) -> BoxStream<'static, Option<Session>>;

    async fn sign_out(&self) -> Result<()>;
}

/// In-process session source
///
/// Used by tests and dev tooling in place of the provider's client SDK.
pub struct LocalSessions {
    tx: watch::Sender<Option<Session>>,
}

impl Default for LocalSessions {
    fn default() -> Self {
        Self {
            tx: watch::channel(None).0,
        }
    }
}

impl LocalSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, session: Session) {
        self.tx.send_replace(Some(session));
    }

    /// Re-emit the current session so listeners evaluate it again
    pub fn refresh(&self) {
        self.tx.send_modify(|_| {});
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }
}

#[async_trait]
impl SessionSource for LocalSessions {
    fn changes(&self) -> BoxStream<'static, Option<Session>> {
        WatchStream::new(self.tx.subscribe()).boxed()
    }

    async fn sign_out(&self) -> Result<()> {
        self.tx.send_replace(None);
        Ok(())
    }
}

/// Outcome of resolving a session against the directory
#[derive(Debug, Clone)]
pub enum Resolution {
    Active(Stored<Principal>),
    /// Signed in but no principal record exists
    Unregistered,
    Disabled(Stored<Principal>),
    LookupFailed(String),
}

impl Resolution {
    /// The active principal, or the error a request should fail with
    pub fn into_active(self) -> Result<Stored<Principal>> {
        match self {
            Resolution::Active(principal) => Ok(principal),
            Resolution::Unregistered => {
                Err(BoardError::Unauthorized("Principal not registered".into()))
            }
            Resolution::Disabled(_) => Err(BoardError::Forbidden(DISABLED_MESSAGE.into())),
            Resolution::LookupFailed(_) => {
                Err(BoardError::Unauthorized("Principal lookup failed".into()))
            }
        }
    }
}

/// Resolve a session to its principal
pub async fn resolve(directory: &Directory, session: &Session) -> Resolution {
    match directory.get(&session.uid).await {
        Ok(Some(principal)) if principal.disabled => Resolution::Disabled(principal),
        Ok(Some(principal)) => Resolution::Active(principal),
        Ok(None) => Resolution::Unregistered,
        Err(e) => {
            warn!("Principal lookup for {} failed: {}", session.uid, e);
            Resolution::LookupFailed(e.to_string())
        }
    }
}

/// Observable gate state
#[derive(Debug, Clone, PartialEq)]
pub struct GateState {
    pub current_user: Option<Session>,
    pub user_email: Option<String>,
    pub user_role: Option<Role>,
    /// True until the first session evaluation completes
    pub loading: bool,
    /// Blocking message after a forced sign-out
    pub blocked: Option<String>,
}

impl Default for GateState {
    fn default() -> Self {
        Self {
            current_user: None,
            user_email: None,
            user_role: None,
            loading: true,
            blocked: None,
        }
    }
}

impl GateState {
    fn signed_out(blocked: Option<String>) -> Self {
        Self {
            loading: false,
            blocked,
            ..Self::default()
        }
    }

    fn active(session: Session, principal: &Principal) -> Self {
        Self {
            user_email: Some(principal.email.clone()),
            user_role: Some(principal.role),
            current_user: Some(session),
            loading: false,
            blocked: None,
        }
    }
}

pub struct IdentityGate;

impl IdentityGate {
    /// Start following the session source
    pub fn spawn(source: Arc<dyn SessionSource>, directory: Directory) -> GateHandle {
        let state = Arc::new(watch::channel(GateState::default()).0);
        let task = tokio::spawn(run(Arc::clone(&source), directory, Arc::clone(&state)));

        GateHandle {
            state,
            source,
            task,
        }
    }
}

async fn run(
    source: Arc<dyn SessionSource>,
    directory: Directory,
    state: Arc<watch::Sender<GateState>>,
) {
    let mut changes = source.changes();

    while let Some(change) = changes.next().await {
        let session = match change {
            Some(session) => session,
            None => {
                // Keep a pending block message visible after the forced sign-out
                let blocked = state.borrow().blocked.clone();
                state.send_replace(GateState::signed_out(blocked));
                continue;
            }
        };

        state.send_modify(|s| s.loading = true);
        let next = match resolve(&directory, &session).await {
            Resolution::Active(principal) => GateState::active(session, &principal),
            Resolution::Disabled(principal) => {
                warn!(
                    "Signing out disabled principal {} ({})",
                    principal.id, principal.email
                );
                if let Err(e) = source.sign_out().await {
                    warn!("Sign-out of disabled principal failed: {}", e);
                }
                GateState::signed_out(Some(DISABLED_MESSAGE.to_string()))
            }
            Resolution::Unregistered | Resolution::LookupFailed(_) => {
                debug!("Session {} has no usable principal", session.uid);
                GateState::signed_out(None)
            }
        };
        state.send_replace(next);
    }

    debug!("Session source closed; identity gate stopped");
}

/// Handle to a running gate; dropping it stops the gate
pub struct GateHandle {
    state: Arc<watch::Sender<GateState>>,
    source: Arc<dyn SessionSource>,
    task: JoinHandle<()>,
}

impl GateHandle {
    pub fn current(&self) -> GateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Wait until the state satisfies `ready`
    pub async fn wait_for(&self, mut ready: impl FnMut(&GateState) -> bool) -> GateState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|s| ready(s)).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so this only happens on shutdown
            Err(_) => self.current(),
        };
        state
    }

    /// Clear the session at the source and reset local state
    pub async fn logout(&self) -> Result<()> {
        self.source.sign_out().await?;
        self.state.send_replace(GateState::signed_out(None));
        Ok(())
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
