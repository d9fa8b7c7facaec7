//! Campus Board - role-gated community board
//!
//! Principals post into a fixed set of categories, comment, subscribe to
//! categories and get notified about new posts in them. Posts are mirrored
//! into a full-text index for search. Administrators can disable accounts.
//!
//! ## Components
//!
//! - **Identity gate**: session changes resolved to an active principal and role
//! - **Content store**: posts and comments, atomic cascading delete
//! - **Notifications**: category subscriptions and best-effort fan-out
//! - **Search sync**: best-effort index writes, fail-soft queries
//! - **Directory**: live principal listing and the disabled flag
//!
//! Everything persistent goes through the [`store::DocumentStore`] boundary,
//! backed by MongoDB in production and an in-process store in dev mode.

pub mod auth;
pub mod board;
pub mod config;
pub mod content;
pub mod directory;
pub mod identity;
pub mod media;
pub mod model;
pub mod notify;
pub mod routes;
pub mod search;
pub mod server;
pub mod store;
pub mod types;

pub use board::Board;
pub use config::Args;
pub use server::{run, AppState};
pub use types::{BoardError, Result};
