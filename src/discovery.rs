//! Static discovery documents: resource types and provider capabilities.
//!
//! `/ResourceTypes` and `/ServiceProviderConfig` advertise what this bridge
//! serves and which protocol features it supports. Unlike the `/Schemas`
//! documents they are not derived from anything. The feature matrix is a
//! statement of fact about the engine: PATCH and single-clause filtering
//! are supported; bulk, sorting, ETags and password changes are not.

use crate::introspect::ScimResourceKind;
use crate::protocol::{Meta, RESOURCE_TYPE_URN, SERVICE_PROVIDER_CONFIG_URN};
use serde::{Deserialize, Serialize};

/// A `/ResourceTypes` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub schemas: Vec<String>,
    /// "User" or "Group"
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path relative to the SCIM base URL, e.g. "/Users"
    pub endpoint: String,
    /// URN of the resource's core schema
    #[serde(rename = "schema")]
    pub schema_urn: String,
    pub meta: Meta,
}

/// Build the resource type document for one kind.
pub fn resource_type(kind: ScimResourceKind, base_url: &str) -> ResourceType {
    ResourceType {
        schemas: vec![RESOURCE_TYPE_URN.to_string()],
        id: kind.type_name().to_string(),
        name: kind.type_name().to_string(),
        description: Some(kind.description().to_string()),
        endpoint: kind.endpoint().to_string(),
        schema_urn: kind.schema_urn().to_string(),
        meta: Meta {
            resource_type: "ResourceType".to_string(),
            created: None,
            last_modified: None,
            location: Some(format!("{base_url}/ResourceTypes/{}", kind.type_name())),
            version: None,
        },
    }
}

/// Both resource type documents, in collection order.
pub fn resource_types(base_url: &str) -> Vec<ResourceType> {
    vec![
        resource_type(ScimResourceKind::User, base_url),
        resource_type(ScimResourceKind::Group, base_url),
    ]
}

/// Look a resource type up by name, case-insensitively.
pub fn resource_type_by_name(name: &str, base_url: &str) -> Option<ResourceType> {
    if name.eq_ignore_ascii_case("user") {
        Some(resource_type(ScimResourceKind::User, base_url))
    } else if name.eq_ignore_ascii_case("group") {
        Some(resource_type(ScimResourceKind::Group, base_url))
    } else {
        None
    }
}

/// Support entry for one optional protocol feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSupport {
    pub supported: bool,
    #[serde(rename = "maxOperations", skip_serializing_if = "Option::is_none")]
    pub max_operations: Option<u32>,
    #[serde(rename = "maxPayloadSize", skip_serializing_if = "Option::is_none")]
    pub max_payload_size: Option<u64>,
    #[serde(rename = "maxResults", skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

impl FeatureSupport {
    fn supported() -> Self {
        Self {
            supported: true,
            max_operations: None,
            max_payload_size: None,
            max_results: None,
        }
    }

    fn unsupported() -> Self {
        Self {
            supported: false,
            max_operations: None,
            max_payload_size: None,
            max_results: None,
        }
    }
}

/// Advertised authentication scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "specUri", skip_serializing_if = "Option::is_none")]
    pub spec_uri: Option<String>,
    #[serde(rename = "documentationUri", skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    pub primary: bool,
}

/// The `/ServiceProviderConfig` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,
    #[serde(rename = "documentationUri", skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    pub patch: FeatureSupport,
    pub bulk: FeatureSupport,
    pub filter: FeatureSupport,
    #[serde(rename = "changePassword")]
    pub change_password: FeatureSupport,
    pub sort: FeatureSupport,
    pub etag: FeatureSupport,
    #[serde(rename = "authenticationSchemes")]
    pub authentication_schemes: Vec<AuthenticationScheme>,
    pub meta: Meta,
}

/// Build the provider capability document.
pub fn service_provider_config(base_url: &str) -> ServiceProviderConfig {
    ServiceProviderConfig {
        schemas: vec![SERVICE_PROVIDER_CONFIG_URN.to_string()],
        documentation_uri: None,
        patch: FeatureSupport::supported(),
        bulk: FeatureSupport {
            max_operations: Some(0),
            max_payload_size: Some(0),
            ..FeatureSupport::unsupported()
        },
        filter: FeatureSupport {
            max_results: Some(100),
            ..FeatureSupport::supported()
        },
        change_password: FeatureSupport::unsupported(),
        sort: FeatureSupport::unsupported(),
        etag: FeatureSupport::unsupported(),
        authentication_schemes: vec![AuthenticationScheme {
            scheme_type: "oauthbearertoken".to_string(),
            name: "Bearer Token".to_string(),
            description: "Authentication using a static bearer token.".to_string(),
            spec_uri: None,
            documentation_uri: None,
            primary: true,
        }],
        meta: Meta {
            resource_type: "ServiceProviderConfig".to_string(),
            created: None,
            last_modified: None,
            location: Some(format!("{base_url}/ServiceProviderConfig")),
            version: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://host.example.com/scim/v2";

    #[test]
    fn resource_types_cover_users_and_groups() {
        let types = resource_types(BASE);
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].endpoint, "/Users");
        assert_eq!(types[1].endpoint, "/Groups");
        assert_eq!(
            types[0].meta.location.as_deref(),
            Some("https://host.example.com/scim/v2/ResourceTypes/User")
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(resource_type_by_name("USER", BASE).is_some());
        assert!(resource_type_by_name("group", BASE).is_some());
        assert!(resource_type_by_name("Device", BASE).is_none());
    }

    #[test]
    fn schema_field_serializes_as_schema() {
        let value = serde_json::to_value(resource_type(ScimResourceKind::User, BASE)).unwrap();
        assert_eq!(value["schema"], crate::protocol::USER_SCHEMA_URN);
        assert_eq!(value["id"], "User");
    }

    #[test]
    fn capability_matrix_matches_the_engine() {
        let config = service_provider_config(BASE);
        assert!(config.patch.supported);
        assert!(config.filter.supported);
        assert_eq!(config.filter.max_results, Some(100));
        assert!(!config.bulk.supported);
        assert!(!config.sort.supported);
        assert!(!config.etag.supported);
        assert!(!config.change_password.supported);
        assert!(config.authentication_schemes[0].primary);
    }
}
