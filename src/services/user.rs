//! User service
//!
//! Implements business logic for accounts and authentication:
//! - Registration (new accounts start PENDING with the GUEST role)
//! - Login with database-backed sessions
//! - The approval workflow: PENDING -> APPROVED | REJECTED, with
//!   REJECTED -> PENDING on reapply
//! - Profile and password management
//! - Admin user management and platform stats
//!
//! Login resolves the account, verifies the password, and only then
//! branches on approval status. Unknown email and wrong password are
//! indistinguishable to the caller; the status-specific messages are only
//! reachable after the password matched, so approval state cannot be
//! probed without the credential.

use crate::db::repositories::{
    CommentRepository, ItemRepository, SessionRepository, UserRepository,
};
use crate::models::{ApprovalStatus, Session, UpdateProfileInput, User, UserRole};
use crate::services::access;
use crate::services::password::{hash_password, verify_password};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Minimum password length at registration (and admin reset)
const MIN_PASSWORD_LEN: usize = 6;

/// Minimum password length when a member changes their own password
const MIN_NEW_PASSWORD_LEN: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials (unknown email or wrong password - deliberately
    /// indistinguishable)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Credentials were valid but the account is still pending approval
    #[error("Your registration is awaiting administrator approval")]
    PendingApproval,

    /// Credentials were valid but the account was rejected
    #[error("Your registration was rejected: {0}")]
    Rejected(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Actor is not allowed to perform this operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// User not found
    #[error("User not found: {0}")]
    NotFound(i64),

    /// The account is not in a state that allows this transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Aggregate platform statistics for the admin dashboard
#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub pending_users: i64,
    pub approved_users: i64,
    pub rejected_users: i64,
    pub superadmins: i64,
    pub moderators: i64,
    pub users: i64,
    pub guests: i64,
    pub total_items: i64,
    pub total_comments: i64,
}

/// User service for account management and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    item_repo: Arc<dyn ItemRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        item_repo: Arc<dyn ItemRepository>,
        comment_repo: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            item_repo,
            comment_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Override the session expiration (used by tests)
    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days;
        self
    }

    // ========================================================================
    // Registration and login
    // ========================================================================

    /// Register a new account.
    ///
    /// The account starts as a PENDING GUEST and stays read-only until an
    /// administrator approves it.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        self.validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::EmailTaken(input.email));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let avatar = input
            .avatar
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| default_avatar(&input.email));

        let mut user = User::new(input.name, input.email, password_hash, avatar);
        user.bio = input.bio.filter(|b| !b.trim().is_empty());

        self.user_repo
            .create(&user)
            .await
            .context("Failed to create user")
            .map_err(Into::into)
    }

    /// Login with email and password.
    ///
    /// Check order: resolve account, verify password, then branch on
    /// approval status. See the module docs for why.
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid email or password".to_string())
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid email or password".to_string(),
            ));
        }

        match user.status {
            ApprovalStatus::Pending => Err(UserServiceError::PendingApproval),
            ApprovalStatus::Rejected => Err(UserServiceError::Rejected(
                user.rejection_reason
                    .clone()
                    .unwrap_or_else(|| "contact an administrator, or reapply".to_string()),
            )),
            ApprovalStatus::Approved => {
                let session = self.create_session(user.id).await?;
                Ok((session, user))
            }
        }
    }

    /// Logout (invalidate the session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")
            .map_err(Into::into)
    }

    /// Validate a session token, returning the user when the session exists
    /// and has not expired. Expired sessions are cleaned up on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")
            .map_err(Into::into)
    }

    /// Delete all expired sessions, returning the number removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        self.session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")
            .map_err(Into::into)
    }

    // ========================================================================
    // Approval workflow
    // ========================================================================

    /// Approve a pending registration.
    ///
    /// APPROVED status and the GUEST -> USER promotion are one transition,
    /// written in a single update.
    pub async fn approve(&self, actor: &User, target_id: i64) -> Result<User, UserServiceError> {
        if !access::can_approve_users(Some(actor)) {
            return Err(UserServiceError::PermissionDenied(
                "Only moderators may approve registrations".to_string(),
            ));
        }

        let mut target = self.get_existing(target_id).await?;
        if target.status != ApprovalStatus::Pending {
            return Err(UserServiceError::InvalidState(format!(
                "User is already {}",
                target.status
            )));
        }

        target.status = ApprovalStatus::Approved;
        target.role = UserRole::User;
        target.rejection_reason = None;

        self.user_repo
            .update(&target)
            .await
            .context("Failed to approve user")
            .map_err(Into::into)
    }

    /// Reject a pending registration, optionally recording a reason.
    /// The role stays GUEST.
    pub async fn reject(
        &self,
        actor: &User,
        target_id: i64,
        reason: Option<String>,
    ) -> Result<User, UserServiceError> {
        if !access::can_approve_users(Some(actor)) {
            return Err(UserServiceError::PermissionDenied(
                "Only moderators may reject registrations".to_string(),
            ));
        }

        let mut target = self.get_existing(target_id).await?;
        if target.status != ApprovalStatus::Pending {
            return Err(UserServiceError::InvalidState(format!(
                "User is already {}",
                target.status
            )));
        }

        target.status = ApprovalStatus::Rejected;
        target.rejection_reason = reason.filter(|r| !r.trim().is_empty());

        self.user_repo
            .update(&target)
            .await
            .context("Failed to reject user")
            .map_err(Into::into)
    }

    /// Re-enter the approval queue after a rejection.
    ///
    /// REJECTED -> PENDING, clearing the stored reason. Calling this while
    /// already PENDING is a no-op; calling it from APPROVED is an error.
    pub async fn reapply(&self, actor: &User) -> Result<User, UserServiceError> {
        let mut user = self.get_existing(actor.id).await?;

        match user.status {
            ApprovalStatus::Pending => Ok(user),
            ApprovalStatus::Approved => Err(UserServiceError::InvalidState(
                "Account is already approved".to_string(),
            )),
            ApprovalStatus::Rejected => {
                user.status = ApprovalStatus::Pending;
                user.rejection_reason = None;
                self.user_repo
                    .update(&user)
                    .await
                    .context("Failed to reapply")
                    .map_err(Into::into)
            }
        }
    }

    /// Reapply by proving the credential.
    ///
    /// A rejected account holds no live session, so the reapply endpoint
    /// authenticates with email and password instead of a token. The check
    /// order mirrors login: resolve, verify password, then transition - the
    /// account's state is never revealed to a caller without the password.
    pub async fn reapply_with_credentials(
        &self,
        input: LoginInput,
    ) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid email or password".to_string())
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid email or password".to_string(),
            ));
        }

        self.reapply(&user).await
    }

    // ========================================================================
    // Profile management
    // ========================================================================

    /// Update the actor's own profile
    pub async fn update_profile(
        &self,
        actor: &User,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        if actor.role == UserRole::Guest {
            return Err(UserServiceError::PermissionDenied(
                "Guests cannot edit their profile".to_string(),
            ));
        }

        let mut user = self.get_existing(actor.id).await?;

        if let Some(name) = input.name {
            if name.trim().len() < 2 {
                return Err(UserServiceError::ValidationError(
                    "Name must be at least 2 characters".to_string(),
                ));
            }
            user.name = name.trim().to_string();
        }
        if let Some(bio) = input.bio {
            user.bio = if bio.trim().is_empty() {
                None
            } else {
                Some(bio.trim().to_string())
            };
        }
        if let Some(avatar) = input.avatar {
            user.avatar = if avatar.trim().is_empty() {
                default_avatar(&user.email)
            } else {
                avatar.trim().to_string()
            };
        }
        if let Some(is_public) = input.is_public_profile {
            user.is_public_profile = is_public;
        }
        if let Some(links) = input.social_links {
            user.social_links = links;
        }

        self.user_repo
            .update(&user)
            .await
            .context("Failed to update profile")
            .map_err(Into::into)
    }

    /// Change the actor's own password, verifying the current one first
    pub async fn change_password(
        &self,
        actor: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if new_password.len() < MIN_NEW_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_NEW_PASSWORD_LEN
            )));
        }

        let valid = verify_password(current_password, &actor.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::ValidationError(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut user = self.get_existing(actor.id).await?;
        user.password_hash = hash_password(new_password).context("Failed to hash password")?;

        self.user_repo
            .update(&user)
            .await
            .context("Failed to change password")?;
        Ok(())
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// List users, optionally filtered by status and/or role
    pub async fn list_users(
        &self,
        actor: &User,
        status: Option<ApprovalStatus>,
        role: Option<UserRole>,
    ) -> Result<Vec<User>, UserServiceError> {
        if !access::can_approve_users(Some(actor)) {
            return Err(UserServiceError::PermissionDenied(
                "Only moderators may list users".to_string(),
            ));
        }

        self.user_repo
            .list(status, role)
            .await
            .context("Failed to list users")
            .map_err(Into::into)
    }

    /// Change a user's role. Superadmin only, never on oneself.
    pub async fn change_role(
        &self,
        actor: &User,
        target_id: i64,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        if !access::can_change_user_role(Some(actor), target_id) {
            return Err(UserServiceError::PermissionDenied(
                "You cannot change this user's role".to_string(),
            ));
        }

        let mut target = self.get_existing(target_id).await?;
        target.role = role;

        self.user_repo
            .update(&target)
            .await
            .context("Failed to change role")
            .map_err(Into::into)
    }

    /// Edit another user's profile fields (privileged)
    pub async fn admin_update_user(
        &self,
        actor: &User,
        target_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        if !access::can_approve_users(Some(actor)) {
            return Err(UserServiceError::PermissionDenied(
                "Only moderators may edit users".to_string(),
            ));
        }

        let mut target = self.get_existing(target_id).await?;

        if let Some(name) = input.name {
            if name.trim().len() < 2 {
                return Err(UserServiceError::ValidationError(
                    "Name must be at least 2 characters".to_string(),
                ));
            }
            target.name = name.trim().to_string();
        }
        if let Some(bio) = input.bio {
            target.bio = if bio.trim().is_empty() { None } else { Some(bio) };
        }
        if let Some(avatar) = input.avatar {
            if !avatar.trim().is_empty() {
                target.avatar = avatar;
            }
        }

        self.user_repo
            .update(&target)
            .await
            .context("Failed to update user")
            .map_err(Into::into)
    }

    /// Reset another user's password (privileged)
    pub async fn admin_reset_password(
        &self,
        actor: &User,
        target_id: i64,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if !access::can_approve_users(Some(actor)) {
            return Err(UserServiceError::PermissionDenied(
                "Only moderators may reset passwords".to_string(),
            ));
        }

        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let mut target = self.get_existing(target_id).await?;
        target.password_hash = hash_password(new_password).context("Failed to hash password")?;

        self.user_repo
            .update(&target)
            .await
            .context("Failed to reset password")?;
        Ok(())
    }

    /// Delete a user account. Superadmin only, never on oneself.
    pub async fn delete_account(
        &self,
        actor: &User,
        target_id: i64,
    ) -> Result<(), UserServiceError> {
        if !access::can_delete_user_account(Some(actor), target_id) {
            return Err(UserServiceError::PermissionDenied(
                "You cannot delete this account".to_string(),
            ));
        }

        let deleted = self
            .user_repo
            .delete(target_id)
            .await
            .context("Failed to delete user")?;
        if !deleted {
            return Err(UserServiceError::NotFound(target_id));
        }
        Ok(())
    }

    /// Aggregate platform statistics (privileged)
    pub async fn stats(&self, actor: &User) -> Result<PlatformStats, UserServiceError> {
        if !access::can_approve_users(Some(actor)) {
            return Err(UserServiceError::PermissionDenied(
                "Only moderators may view stats".to_string(),
            ));
        }

        let count_status = |s| self.user_repo.count(Some(s), None);
        let count_role = |r| self.user_repo.count(None, Some(r));

        Ok(PlatformStats {
            total_users: self.user_repo.count(None, None).await.context("count users")?,
            pending_users: count_status(ApprovalStatus::Pending).await.context("count")?,
            approved_users: count_status(ApprovalStatus::Approved).await.context("count")?,
            rejected_users: count_status(ApprovalStatus::Rejected).await.context("count")?,
            superadmins: count_role(UserRole::Superadmin).await.context("count")?,
            moderators: count_role(UserRole::Moderator).await.context("count")?,
            users: count_role(UserRole::User).await.context("count")?,
            guests: count_role(UserRole::Guest).await.context("count")?,
            total_items: self.item_repo.count().await.context("count items")?,
            total_comments: self.comment_repo.count().await.context("count comments")?,
        })
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")
            .map_err(Into::into)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn validate_register_input(&self, input: &RegisterInput) -> Result<(), UserServiceError> {
        if input.name.trim().len() < 2 {
            return Err(UserServiceError::ValidationError(
                "Name must be at least 2 characters".to_string(),
            ));
        }
        if !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    async fn get_existing(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound(id))
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")
            .map_err(Into::into)
    }
}

/// Default avatar derived from the email, gravatar-style
pub fn default_avatar(email: &str) -> String {
    let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
    format!("https://www.gravatar.com/avatar/{}?d=identicon&s=160", hash)
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl RegisterInput {
    /// Create a registration input without the optional fields
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            bio: None,
            avatar: None,
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    /// Create a new login input
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}
