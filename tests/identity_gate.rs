//! Integration tests for the identity gate and admin directory

use campus_board::directory::Directory;
use campus_board::identity::{
    resolve, IdentityGate, LocalSessions, Resolution, Session, DISABLED_MESSAGE,
};
use campus_board::model::Role;
use campus_board::store::MemoryStore;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn session(uid: &str, email: &str) -> Session {
    Session {
        uid: uid.into(),
        email: email.into(),
    }
}

#[tokio::test]
async fn test_disabling_signs_principal_out_on_next_evaluation() {
    let store = Arc::new(MemoryStore::new());
    let directory = Directory::new(store);
    directory
        .register("uid-b", "b@x.com", Role::Student)
        .await
        .unwrap();

    let sessions = Arc::new(LocalSessions::new());
    sessions.sign_in(session("uid-b", "b@x.com"));
    let gate = IdentityGate::spawn(sessions.clone(), directory.clone());

    let active = timeout(WAIT, gate.wait_for(|s| s.current_user.is_some()))
        .await
        .unwrap();
    assert_eq!(active.user_role, Some(Role::Student));

    directory.set_disabled("uid-b", true).await.unwrap();

    // No push: state is unchanged until the gate evaluates again
    assert!(gate.current().current_user.is_some());

    sessions.refresh();
    let blocked = timeout(WAIT, gate.wait_for(|s| s.blocked.is_some()))
        .await
        .unwrap();
    assert!(blocked.current_user.is_none());
    assert!(blocked.user_role.is_none());
    assert_eq!(blocked.blocked.as_deref(), Some(DISABLED_MESSAGE));

    // The session was terminated at the source
    let signed_out = timeout(WAIT, async {
        loop {
            if sessions.current().is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(signed_out.is_ok());
}

#[tokio::test]
async fn test_disabled_principal_cannot_sign_back_in() {
    let store = Arc::new(MemoryStore::new());
    let directory = Directory::new(store);
    directory
        .register("uid-b", "b@x.com", Role::Staff)
        .await
        .unwrap();
    directory.set_disabled("uid-b", true).await.unwrap();

    let sessions = Arc::new(LocalSessions::new());
    let gate = IdentityGate::spawn(sessions.clone(), directory.clone());
    timeout(WAIT, gate.wait_for(|s| !s.loading)).await.unwrap();

    sessions.sign_in(session("uid-b", "b@x.com"));
    let state = timeout(WAIT, gate.wait_for(|s| s.blocked.is_some()))
        .await
        .unwrap();
    assert!(state.current_user.is_none());

    // Re-enabled principals get through again
    directory.set_disabled("uid-b", false).await.unwrap();
    sessions.sign_in(session("uid-b", "b@x.com"));
    let state = timeout(WAIT, gate.wait_for(|s| s.current_user.is_some()))
        .await
        .unwrap();
    assert!(state.blocked.is_none());
    assert_eq!(state.user_email.as_deref(), Some("b@x.com"));
}

#[tokio::test]
async fn test_resolve_outcomes() {
    let store = Arc::new(MemoryStore::new());
    let directory = Directory::new(store);
    directory
        .register("uid-a", "a@x.com", Role::Administrator)
        .await
        .unwrap();

    assert!(matches!(
        resolve(&directory, &session("uid-a", "a@x.com")).await,
        Resolution::Active(_)
    ));
    assert!(matches!(
        resolve(&directory, &session("uid-z", "z@x.com")).await,
        Resolution::Unregistered
    ));

    directory.set_disabled("uid-a", true).await.unwrap();
    assert!(matches!(
        resolve(&directory, &session("uid-a", "a@x.com")).await,
        Resolution::Disabled(_)
    ));
}

#[tokio::test]
async fn test_directory_stream_lists_principals() {
    let store = Arc::new(MemoryStore::new());
    let directory = Directory::new(store);
    let mut live = directory.stream_principals().await.unwrap();
    assert!(timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap().is_empty());

    directory
        .register("uid-a", "a@x.com", Role::Faculty)
        .await
        .unwrap();
    let snapshot = timeout(WAIT, live.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "uid-a");
    assert_eq!(snapshot[0].role, Role::Faculty);
    assert!(!snapshot[0].disabled);
}
