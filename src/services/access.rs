//! Access control predicates
//!
//! Pure functions answering, for a given (actor, action, optional target
//! ownership) triple, whether the action is permitted. No side effects, no
//! I/O; the API layer calls these before touching any service.
//!
//! Role precedence is strict and total:
//! SUPERADMIN > MODERATOR > USER (own resources only) > GUEST (list view only).
//!
//! The approval status is an independent gate: an account that is not
//! APPROVED cannot create content or comments regardless of role.

use crate::models::{Comment, User, UserRole};

/// Anyone may view the item list, even anonymous visitors.
pub fn can_view_item_list(_actor: Option<&User>) -> bool {
    true
}

/// Guests cannot open item details.
pub fn can_view_item_detail(actor: Option<&User>) -> bool {
    matches!(actor, Some(user) if user.role != UserRole::Guest)
}

/// Guests cannot see comments.
pub fn can_view_comments(actor: Option<&User>) -> bool {
    matches!(actor, Some(user) if user.role != UserRole::Guest)
}

/// Guests cannot view member profiles.
pub fn can_view_user_profile(actor: Option<&User>) -> bool {
    matches!(actor, Some(user) if user.role != UserRole::Guest)
}

/// Creating content requires a non-guest role AND an approved account.
pub fn can_create_item(actor: Option<&User>) -> bool {
    matches!(actor, Some(user) if user.role != UserRole::Guest && user.is_approved())
}

/// Same rule as item creation.
pub fn can_create_comment(actor: Option<&User>) -> bool {
    can_create_item(actor)
}

/// Same rule as item creation.
pub fn can_favorite_items(actor: Option<&User>) -> bool {
    can_create_item(actor)
}

/// Moderators and superadmins may edit any item; a USER only their own.
pub fn can_edit_item(actor: Option<&User>, author_id: i64) -> bool {
    match actor {
        Some(user) if user.is_privileged() => true,
        Some(user) if user.role == UserRole::User => user.id == author_id,
        _ => false,
    }
}

/// Identical rule to edit.
pub fn can_delete_item(actor: Option<&User>, author_id: i64) -> bool {
    can_edit_item(actor, author_id)
}

/// Edit rule for comments; a soft-deleted comment is never editable.
pub fn can_edit_comment(actor: Option<&User>, comment: &Comment) -> bool {
    if comment.is_deleted {
        return false;
    }
    can_edit_item(actor, comment.user_id)
}

/// Delete rule for comments; a soft-deleted comment is never re-deletable.
pub fn can_delete_comment(actor: Option<&User>, comment: &Comment) -> bool {
    if comment.is_deleted {
        return false;
    }
    can_edit_item(actor, comment.user_id)
}

/// Moderators and superadmins may approve or reject registrations.
pub fn can_approve_users(actor: Option<&User>) -> bool {
    matches!(actor, Some(user) if user.is_privileged())
}

/// Only a superadmin may change roles, and never their own.
pub fn can_change_user_role(actor: Option<&User>, target_id: i64) -> bool {
    matches!(actor, Some(user) if user.role == UserRole::Superadmin && user.id != target_id)
}

/// Only a superadmin may delete accounts, and never their own.
pub fn can_delete_user_account(actor: Option<&User>, target_id: i64) -> bool {
    matches!(actor, Some(user) if user.role == UserRole::Superadmin && user.id != target_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;
    use chrono::Utc;

    fn user_with(id: i64, role: UserRole, status: ApprovalStatus) -> User {
        let mut user = User::new(
            format!("user-{}", id),
            format!("user{}@example.com", id),
            "hash".to_string(),
            "".to_string(),
        );
        user.id = id;
        user.role = role;
        user.status = status;
        user
    }

    fn comment_owned_by(user_id: i64, is_deleted: bool) -> Comment {
        let now = Utc::now();
        Comment {
            id: 1,
            item_id: 1,
            user_id,
            content: "words".to_string(),
            screenshot: None,
            is_deleted,
            deletion_reason: if is_deleted { Some("spam".to_string()) } else { None },
            created_at: now,
            updated_at: now,
        }
    }

    fn superadmin() -> User {
        user_with(1, UserRole::Superadmin, ApprovalStatus::Approved)
    }

    fn moderator() -> User {
        user_with(2, UserRole::Moderator, ApprovalStatus::Approved)
    }

    fn member() -> User {
        user_with(3, UserRole::User, ApprovalStatus::Approved)
    }

    fn guest() -> User {
        user_with(4, UserRole::Guest, ApprovalStatus::Pending)
    }

    #[test]
    fn test_anyone_views_item_list() {
        assert!(can_view_item_list(None));
        assert!(can_view_item_list(Some(&guest())));
        assert!(can_view_item_list(Some(&member())));
    }

    #[test]
    fn test_guest_cannot_open_details_or_comments() {
        assert!(!can_view_item_detail(None));
        assert!(!can_view_item_detail(Some(&guest())));
        assert!(!can_view_comments(Some(&guest())));
        assert!(!can_view_user_profile(Some(&guest())));

        assert!(can_view_item_detail(Some(&member())));
        assert!(can_view_comments(Some(&moderator())));
        assert!(can_view_user_profile(Some(&superadmin())));
    }

    #[test]
    fn test_create_requires_approved_non_guest() {
        assert!(!can_create_item(None));
        assert!(!can_create_item(Some(&guest())));
        assert!(can_create_item(Some(&member())));
        assert!(can_create_item(Some(&moderator())));
        assert!(can_create_item(Some(&superadmin())));

        // Approval status cannot be substituted by role: a pending moderator
        // cannot create content
        let pending_mod = user_with(9, UserRole::Moderator, ApprovalStatus::Pending);
        assert!(!can_create_item(Some(&pending_mod)));

        // Nor can approval substitute for role: an approved guest stays
        // read-only
        let approved_guest = user_with(10, UserRole::Guest, ApprovalStatus::Approved);
        assert!(!can_create_item(Some(&approved_guest)));
    }

    #[test]
    fn test_rejected_user_cannot_create() {
        let rejected = user_with(11, UserRole::User, ApprovalStatus::Rejected);
        assert!(!can_create_item(Some(&rejected)));
        assert!(!can_create_comment(Some(&rejected)));
        assert!(!can_favorite_items(Some(&rejected)));
    }

    #[test]
    fn test_edit_item_ownership() {
        let me = member();

        // Own item
        assert!(can_edit_item(Some(&me), me.id));
        // Someone else's item
        assert!(!can_edit_item(Some(&me), 999));

        // Privileged roles edit anything
        assert!(can_edit_item(Some(&moderator()), 999));
        assert!(can_edit_item(Some(&superadmin()), 999));

        // Guests never edit, even "their own"
        let g = guest();
        assert!(!can_edit_item(Some(&g), g.id));
        assert!(!can_edit_item(None, 1));
    }

    #[test]
    fn test_delete_item_matches_edit_rule() {
        let me = member();
        assert_eq!(can_delete_item(Some(&me), me.id), can_edit_item(Some(&me), me.id));
        assert_eq!(can_delete_item(Some(&me), 999), can_edit_item(Some(&me), 999));
    }

    #[test]
    fn test_soft_deleted_comment_is_frozen() {
        let deleted = comment_owned_by(3, true);

        // Not even a superadmin can edit or re-delete a soft-deleted comment
        assert!(!can_edit_comment(Some(&superadmin()), &deleted));
        assert!(!can_delete_comment(Some(&superadmin()), &deleted));
        assert!(!can_edit_comment(Some(&member()), &deleted));
        assert!(!can_delete_comment(Some(&member()), &deleted));
    }

    #[test]
    fn test_active_comment_permissions() {
        let comment = comment_owned_by(3, false);

        assert!(can_edit_comment(Some(&member()), &comment));
        assert!(can_delete_comment(Some(&member()), &comment));
        assert!(can_edit_comment(Some(&moderator()), &comment));

        let other = user_with(5, UserRole::User, ApprovalStatus::Approved);
        assert!(!can_edit_comment(Some(&other), &comment));
        assert!(!can_delete_comment(Some(&other), &comment));
    }

    #[test]
    fn test_approve_users() {
        assert!(can_approve_users(Some(&superadmin())));
        assert!(can_approve_users(Some(&moderator())));
        assert!(!can_approve_users(Some(&member())));
        assert!(!can_approve_users(Some(&guest())));
        assert!(!can_approve_users(None));
    }

    #[test]
    fn test_role_change_superadmin_only_never_self() {
        let admin = superadmin();
        assert!(can_change_user_role(Some(&admin), 999));
        assert!(!can_change_user_role(Some(&admin), admin.id));
        assert!(!can_change_user_role(Some(&moderator()), 999));
        assert!(!can_change_user_role(Some(&member()), 999));
    }

    #[test]
    fn test_account_delete_superadmin_only_never_self() {
        let admin = superadmin();
        assert!(can_delete_user_account(Some(&admin), 999));
        assert!(!can_delete_user_account(Some(&admin), admin.id));
        assert!(!can_delete_user_account(Some(&moderator()), 999));
    }

    /// Role monotonicity: any action granted to some role is also granted to
    /// every higher role under the same ownership facts.
    #[test]
    fn test_role_monotonicity() {
        let roles = [
            UserRole::Guest,
            UserRole::User,
            UserRole::Moderator,
            UserRole::Superadmin,
        ];

        let others_comment = comment_owned_by(999, false);

        for window in roles.windows(2) {
            let lower = user_with(50, window[0], ApprovalStatus::Approved);
            let higher = user_with(50, window[1], ApprovalStatus::Approved);

            let checks: Vec<(bool, bool)> = vec![
                (can_view_item_detail(Some(&lower)), can_view_item_detail(Some(&higher))),
                (can_create_item(Some(&lower)), can_create_item(Some(&higher))),
                (can_edit_item(Some(&lower), 999), can_edit_item(Some(&higher), 999)),
                (
                    can_delete_comment(Some(&lower), &others_comment),
                    can_delete_comment(Some(&higher), &others_comment),
                ),
                (can_approve_users(Some(&lower)), can_approve_users(Some(&higher))),
                (
                    can_change_user_role(Some(&lower), 999),
                    can_change_user_role(Some(&higher), 999),
                ),
            ];

            for (lower_allowed, higher_allowed) in checks {
                assert!(
                    !lower_allowed || higher_allowed,
                    "{:?} was granted an action denied to {:?}",
                    window[0],
                    window[1]
                );
            }
        }
    }
}
