//! User model
//!
//! This module defines the User entity and related types for the Devshare
//! platform. A user carries two independent dimensions of state: a privilege
//! role and an approval status. Registration creates a PENDING GUEST; an
//! administrator approval promotes the account to an APPROVED USER in a
//! single transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered member of the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Privilege role
    pub role: UserRole,
    /// Approval status
    pub status: ApprovalStatus,
    /// Avatar URI
    pub avatar: String,
    /// Short bio or job title
    pub bio: Option<String>,
    /// Whether the profile is listed publicly
    pub is_public_profile: bool,
    /// Sparse provider -> URI map (github, linkedin, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub social_links: BTreeMap<String, String>,
    /// Reason recorded when the account was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User in the registration default state (PENDING GUEST).
    ///
    /// Note: The password should already be hashed before calling this
    /// function. Use `services::password::hash_password()` to hash it.
    pub fn new(name: String, email: String, password_hash: String, avatar: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            role: UserRole::Guest,
            status: ApprovalStatus::Pending,
            avatar,
            bio: None,
            is_public_profile: false,
            social_links: BTreeMap::new(),
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user holds moderation privileges (moderator or superadmin)
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, UserRole::Superadmin | UserRole::Moderator)
    }

    /// Check if the user account has been approved
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }
}

/// User role for authorization.
///
/// The four tiers form a strict total order:
/// Guest < User < Moderator < Superadmin. The derived `Ord` follows the
/// declaration order, so precedence checks can use comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Visitor or account awaiting approval - list view only
    Guest,
    /// Approved contributor - full CRUD on own resources
    User,
    /// Moderates content and approves registrations
    Moderator,
    /// Unrestricted access, manages users and roles
    Superadmin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Guest
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Superadmin => write!(f, "SUPERADMIN"),
            UserRole::Moderator => write!(f, "MODERATOR"),
            UserRole::User => write!(f, "USER"),
            UserRole::Guest => write!(f, "GUEST"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUPERADMIN" => Ok(UserRole::Superadmin),
            "MODERATOR" => Ok(UserRole::Moderator),
            "USER" => Ok(UserRole::User),
            "GUEST" => Ok(UserRole::Guest),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Approval status gating what an account may do, independent of role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    /// Awaiting administrator review
    Pending,
    /// Full member
    Approved,
    /// Rejected; may reapply
    Rejected,
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "PENDING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid approval status: {}", s)),
        }
    }
}

/// Input for updating a user's own profile
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_public_profile: Option<bool>,
    pub social_links: Option<BTreeMap<String, String>>,
}
