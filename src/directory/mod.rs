//! Directory entities and the store collaborator contract.
//!
//! The bridge does not own persistence. Users and groups live in a host
//! application's directory, reached through the [`DirectoryStore`] trait.
//! The trait is async-first and deliberately name-agnostic: any backend
//! that can look records up by id, by unique email or list them wholesale
//! can sit behind the protocol engine.
//!
//! Store invariants the engine relies on:
//!
//! * email uniqueness for users is enforced by the store; the engine
//!   surfaces a Conflict before writing rather than depending on it, but a
//!   racing write must still be refused;
//! * group member id lists have set semantics (duplicates collapse,
//!   dangling ids are tolerated);
//! * `updated_at` is maintained by the store on every successful update.

pub mod in_memory;

pub use in_memory::{InMemoryDirectory, WriteStats};

use serde::{Deserialize, Serialize};
use std::future::Future;

/// Role of a directory user.
///
/// Exactly one value, [`UserRole::Pending`], means "provisioned but
/// inactive"; every other role is active. SCIM's `active` flag is a pure
/// projection of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Pending,
    User,
    Admin,
}

impl UserRole {
    /// Whether this role counts as active for provisioning purposes.
    pub fn is_active(self) -> bool {
        self != Self::Pending
    }

    /// Canonical lowercase name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// A user record as stored by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Unique; doubles as the SCIM `userName`
    pub email: String,
    /// Free-text display name
    pub name: String,
    pub role: UserRole,
    /// Creation time, epoch seconds
    pub created_at: i64,
    /// Last modification time, epoch seconds; `None` means never modified
    pub updated_at: Option<i64>,
}

/// A group record as stored by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    /// Unique display name
    pub name: String,
    pub description: String,
    /// Owning user's id
    pub owner_id: String,
    /// Member user ids; set semantics, dangling ids tolerated
    pub user_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

/// Fields for creating a user.
///
/// The credential secret is generated by the caller and hashed by the host
/// application's auth layer; the bridge never stores or returns it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub credential_secret: String,
    pub role: UserRole,
}

/// Partial update for a user; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

impl UserUpdate {
    /// Update only the email.
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Update only the role.
    pub fn role(role: UserRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.role.is_none()
    }
}

/// Partial update for a group; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub user_ids: Option<Vec<String>>,
}

impl GroupUpdate {
    /// Update only the display name.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Update only the member set.
    pub fn members(user_ids: Vec<String>) -> Self {
        Self {
            user_ids: Some(user_ids),
            ..Self::default()
        }
    }
}

/// Store collaborator contract for the identity directory.
///
/// All operations are black boxes with the pre/post-conditions documented
/// per method. Update and create operations return `None` where the target
/// does not exist or the store refused the write; the engine maps an
/// unexpected `None` to an internal error.
pub trait DirectoryStore: Send + Sync {
    /// The error type returned by store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look a user up by id.
    fn find_user_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;

    /// Look a user up by unique email (exact match).
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;

    /// List users in a stable order, optionally restricted to one role.
    fn list_users(
        &self,
        role: Option<UserRole>,
    ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send;

    /// Create a user; `None` when the email is already taken.
    fn create_user(
        &self,
        new_user: NewUser,
    ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;

    /// Apply a partial update; `None` when the user does not exist.
    fn update_user(
        &self,
        id: &str,
        fields: UserUpdate,
    ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;

    /// Delete a user; `false` when the user did not exist.
    fn delete_user(&self, id: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Look a group up by id.
    fn find_group_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send;

    /// List all groups in a stable order.
    fn list_groups(&self) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send;

    /// Create a group owned by `owner_id`; membership starts empty.
    fn create_group(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send;

    /// Apply a partial update; `None` when the group does not exist.
    fn update_group(
        &self,
        id: &str,
        fields: GroupUpdate,
    ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send;

    /// Delete a group; `false` when the group did not exist.
    fn delete_group(&self, id: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Fetch the user records for the given ids; unknown ids are skipped.
    fn list_users_by_ids(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send;
}
