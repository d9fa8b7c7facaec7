//! Authentication and authorization for Campus Board
//!
//! Provides:
//! - Session token verification (tokens are issued by the identity provider)
//! - Role permissions for board actions

pub mod jwt;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, SessionValidator};
pub use permissions::{allowed_roles, is_action_allowed, Action};
