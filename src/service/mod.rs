//! The protocol engine facade.
//!
//! [`ScimService`] ties the mapper, listing pipeline, patch engine,
//! conflict rules and introspector together over a [`DirectoryStore`]. One
//! method corresponds to one SCIM endpoint action; all of them are
//! transport-agnostic: the HTTP layer hands in the request's base URL and
//! gets back wire-ready values or a [`crate::error::ScimError`] that maps
//! 1:1 onto an error response.
//!
//! User operations live in [`users`], group operations in [`groups`]; the
//! read-only discovery documents are served from here.

pub mod groups;
pub mod users;

use crate::directory::DirectoryStore;
use crate::discovery::{
    ResourceType, ServiceProviderConfig, resource_type_by_name, resource_types,
    service_provider_config,
};
use crate::error::{ScimError, ScimResult};
use crate::introspect::{SchemaDefinition, SchemaIntrospector};
use crate::protocol::ListResponse;

/// A freshly created resource plus its canonical URL.
///
/// The transport layer surfaces `location` as the `Location` response
/// header of the 201 response.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<T> {
    pub resource: T,
    pub location: String,
}

/// SCIM protocol engine over a directory store.
#[derive(Debug)]
pub struct ScimService<S> {
    store: S,
    schemas: SchemaIntrospector,
}

impl<S: DirectoryStore> ScimService<S> {
    /// Create an engine over the given store, with a cold schema cache.
    pub fn new(store: S) -> Self {
        Self {
            store,
            schemas: SchemaIntrospector::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The schema introspector (exposed so tests can reset the cache).
    pub fn introspector(&self) -> &SchemaIntrospector {
        &self.schemas
    }

    /// The `/Schemas` collection.
    pub fn schemas(&self, base_url: &str) -> ListResponse<SchemaDefinition> {
        let resources = self.schemas.definitions(base_url);
        ListResponse::new(resources.len(), 1, resources)
    }

    /// One `/Schemas/{urn}` document.
    pub fn schema_by_urn(&self, urn: &str, base_url: &str) -> ScimResult<SchemaDefinition> {
        self.schemas
            .definition_by_urn(urn, base_url)
            .ok_or_else(|| ScimError::not_found(format!("Schema with ID '{urn}' not found.")))
    }

    /// The `/ResourceTypes` collection.
    pub fn resource_types(&self, base_url: &str) -> ListResponse<ResourceType> {
        let resources = resource_types(base_url);
        ListResponse::new(resources.len(), 1, resources)
    }

    /// One `/ResourceTypes/{name}` document.
    pub fn resource_type(&self, name: &str, base_url: &str) -> ScimResult<ResourceType> {
        resource_type_by_name(name, base_url)
            .ok_or_else(|| ScimError::not_found(format!("ResourceType '{name}' not found.")))
    }

    /// The `/ServiceProviderConfig` document.
    pub fn service_provider_config(&self, base_url: &str) -> ServiceProviderConfig {
        service_provider_config(base_url)
    }
}
