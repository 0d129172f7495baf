//! SCIM 2.0 provisioning bridge for an application-owned identity directory.
//!
//! Exposes Users and Groups held by a host application through the SCIM
//! 2.0 protocol so external identity providers can provision accounts and
//! group memberships over a standard REST contract. The crate is the
//! protocol engine only: persistence stays behind the [`DirectoryStore`]
//! trait and HTTP transport is left to the host.
//!
//! # Core Components
//!
//! - [`ScimService`] - Protocol engine: one method per endpoint action
//! - [`DirectoryStore`] - Trait the host's persistence layer implements
//! - [`SchemaIntrospector`] - Derives and caches the `/Schemas` documents
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scim_bridge::{InMemoryDirectory, ListQuery, ScimService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ScimService::new(InMemoryDirectory::new());
//! let page = service
//!     .list_users(&ListQuery::new().with_count(10), "https://host/scim/v2")
//!     .await?;
//! println!("{} users", page.total_results);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod directory;
pub mod discovery;
pub mod error;
pub mod introspect;
pub mod list;
pub mod mapper;
pub mod patch;
pub mod protocol;
pub mod service;
pub mod validate;

// Re-export commonly used types for convenience
pub use auth::{ScimConfig, verify_request};
pub use directory::{
    DirectoryStore, Group, GroupUpdate, InMemoryDirectory, NewUser, User, UserRole, UserUpdate,
};
pub use error::{ScimError, ScimResult};
pub use introspect::{SchemaDefinition, SchemaIntrospector, ScimResourceKind};
pub use list::ListQuery;
pub use protocol::{
    ErrorBody, ListResponse, PatchOperation, PatchRequest, ScimGroup, ScimUser,
};
pub use service::{Created, ScimService};

// Additional types for transport layers and advanced usage
pub use discovery::{ResourceType, ServiceProviderConfig};
pub use mapper::{group_to_scim, user_to_scim};
pub use patch::{GroupPatchOp, UserPatchOp};
