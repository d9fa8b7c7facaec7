//! Role permissions for board actions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Role;

/// Actions a principal can attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReadPosts,
    CreatePost,
    /// Edit a post the caller did not author
    EditAnyPost,
    DeletePost,
    Comment,
    Subscribe,
    Search,
    ReadNotifications,
    ListPrincipals,
    ToggleDisabled,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(get_action_description(*self))
    }
}

/// Roles allowed to perform an action
pub fn allowed_roles(action: Action) -> &'static [Role] {
    const EVERYONE: &[Role] = &[
        Role::Faculty,
        Role::Student,
        Role::Staff,
        Role::Moderator,
        Role::Administrator,
    ];
    const MODERATION: &[Role] = &[Role::Moderator, Role::Administrator];
    const ADMINISTRATION: &[Role] = &[Role::Administrator];

    match action {
        Action::ReadPosts
        | Action::CreatePost
        | Action::Comment
        | Action::Subscribe
        | Action::Search
        | Action::ReadNotifications => EVERYONE,

        Action::EditAnyPost | Action::DeletePost => MODERATION,

        Action::ListPrincipals | Action::ToggleDisabled => ADMINISTRATION,
    }
}

/// Check if a role may perform an action
pub fn is_action_allowed(role: Role, action: Action) -> bool {
    allowed_roles(action).contains(&role)
}

/// Get a human-readable description of an action for logging
pub fn get_action_description(action: Action) -> &'static str {
    match action {
        Action::ReadPosts => "Read posts",
        Action::CreatePost => "Create post",
        Action::EditAnyPost => "Edit another author's post",
        Action::DeletePost => "Delete post",
        Action::Comment => "Add comment",
        Action::Subscribe => "Subscribe to categories",
        Action::Search => "Search posts",
        Action::ReadNotifications => "Read notifications",
        Action::ListPrincipals => "List principals",
        Action::ToggleDisabled => "Enable or disable principal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everyone_can_post() {
        for role in [Role::Faculty, Role::Student, Role::Staff] {
            assert!(is_action_allowed(role, Action::CreatePost));
            assert!(is_action_allowed(role, Action::Subscribe));
            assert!(!is_action_allowed(role, Action::DeletePost));
        }
    }

    #[test]
    fn test_moderation() {
        assert!(is_action_allowed(Role::Moderator, Action::DeletePost));
        assert!(is_action_allowed(Role::Administrator, Action::DeletePost));
        assert!(!is_action_allowed(Role::Moderator, Action::ToggleDisabled));
    }

    #[test]
    fn test_administration() {
        assert!(is_action_allowed(Role::Administrator, Action::ListPrincipals));
        assert!(is_action_allowed(Role::Administrator, Action::ToggleDisabled));
        assert!(!is_action_allowed(Role::Staff, Action::ListPrincipals));
    }
}
