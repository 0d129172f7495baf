//! Schema introspection: derive SCIM attribute metadata from the wire types.
//!
//! The `/Schemas` discovery documents are not hand-maintained. Each one is
//! derived from the JSON-Schema reflection of the corresponding wire type
//! ([`ScimUser`], [`ScimGroup`]) and translated into SCIM's attribute
//! vocabulary:
//!
//! * `$ref`s are resolved against the reflection's definitions table;
//! * nullable wrappers (`anyOf [T, null]`, `type: [T, "null"]`) are
//!   unwrapped to the underlying shape;
//! * strings map to `string` (`dateTime` when formatted as date-time),
//!   integers to `integer`, numbers to `decimal`, booleans to `boolean`;
//! * arrays map to `complex` with `multiValued = true`, recursing into
//!   object items for `subAttributes`;
//! * objects map to `complex` with recursive `subAttributes`;
//! * anything unresolvable falls back to `string`.
//!
//! Definitions are computed once per resource kind for the life of the
//! process and cached in an explicit [`SchemaCache`] (resettable, so tests
//! can start cold). Only `meta.location` is rewritten per call, from the
//! caller's base URL; the rest of a cached definition never changes. Two
//! requests racing on a cold cache compute the same value; the duplicate
//! write is benign.
//!
//! This is advertisement metadata only: it describes the wire types, it is
//! never consulted to validate them.

use crate::protocol::{
    GROUP_SCHEMA_URN, Meta, SCHEMA_URN, ScimGroup, ScimUser, USER_SCHEMA_URN,
};
use schemars::schema::{
    InstanceType, RootSchema, Schema, SchemaObject, SingleOrVec,
};
use schemars::{Map, schema_for};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// The two resource kinds this directory exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScimResourceKind {
    User,
    Group,
}

impl ScimResourceKind {
    /// URN of the kind's core schema.
    pub fn schema_urn(self) -> &'static str {
        match self {
            Self::User => USER_SCHEMA_URN,
            Self::Group => GROUP_SCHEMA_URN,
        }
    }

    /// Resource type tag, e.g. "User".
    pub fn type_name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
        }
    }

    /// Endpoint path relative to the SCIM base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::User => "/Users",
            Self::Group => "/Groups",
        }
    }

    /// Human-readable description for discovery documents.
    pub fn description(self) -> &'static str {
        match self {
            Self::User => "User Account",
            Self::Group => "Group",
        }
    }
}

/// One attribute of a published schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub multi_valued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub case_exact: bool,
    pub mutability: String,
    pub returned: String,
    pub uniqueness: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_attributes: Option<Vec<SchemaAttribute>>,
}

impl SchemaAttribute {
    fn new(name: &str, attribute_type: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: attribute_type.to_string(),
            multi_valued: false,
            description: None,
            required: false,
            case_exact: false,
            mutability: "readWrite".to_string(),
            returned: "default".to_string(),
            uniqueness: "none".to_string(),
            sub_attributes: None,
        }
    }
}

/// A published schema document, as served from `/Schemas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub schemas: Vec<String>,
    /// The schema's URN
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<SchemaAttribute>,
    pub meta: Meta,
}

/// Explicit per-process memoization table for schema definitions.
///
/// Owned by the introspector rather than living in a global so tests can
/// construct and reset their own instance.
#[derive(Debug, Default)]
pub struct SchemaCache {
    inner: RwLock<HashMap<ScimResourceKind, SchemaDefinition>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_insert_with(
        &self,
        kind: ScimResourceKind,
        build: impl FnOnce() -> SchemaDefinition,
    ) -> SchemaDefinition {
        if let Some(definition) = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
        {
            return definition.clone();
        }

        // Computed outside the lock; racing computations produce identical
        // values and the last writer wins.
        let definition = build();
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, definition.clone());
        definition
    }

    /// Drop all cached definitions.
    pub fn reset(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Derives and serves the published schema documents.
#[derive(Debug, Default)]
pub struct SchemaIntrospector {
    cache: SchemaCache,
}

impl SchemaIntrospector {
    /// Create an introspector with a cold cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The schema document for one resource kind.
    ///
    /// Cached after the first call per kind; `meta.location` is rebuilt
    /// from `base_url` on every call.
    pub fn definition(&self, kind: ScimResourceKind, base_url: &str) -> SchemaDefinition {
        let mut definition = self.cache.get_or_insert_with(kind, || build_definition(kind));
        definition.meta.location = Some(format!("{base_url}/Schemas/{}", definition.id));
        definition
    }

    /// Both schema documents, for the `/Schemas` collection.
    pub fn definitions(&self, base_url: &str) -> Vec<SchemaDefinition> {
        vec![
            self.definition(ScimResourceKind::User, base_url),
            self.definition(ScimResourceKind::Group, base_url),
        ]
    }

    /// Look a schema document up by its URN.
    pub fn definition_by_urn(&self, urn: &str, base_url: &str) -> Option<SchemaDefinition> {
        let kind = match urn {
            USER_SCHEMA_URN => ScimResourceKind::User,
            GROUP_SCHEMA_URN => ScimResourceKind::Group,
            _ => return None,
        };
        Some(self.definition(kind, base_url))
    }

    /// Drop the cached definitions (tests only need this).
    pub fn reset(&self) {
        self.cache.reset();
    }
}

fn build_definition(kind: ScimResourceKind) -> SchemaDefinition {
    let root = match kind {
        ScimResourceKind::User => schema_for!(ScimUser),
        ScimResourceKind::Group => schema_for!(ScimGroup),
    };

    SchemaDefinition {
        schemas: vec![SCHEMA_URN.to_string()],
        id: kind.schema_urn().to_string(),
        name: kind.type_name().to_string(),
        description: Some(format!("SCIM {} schema", kind.type_name())),
        attributes: attributes_of(&root),
        meta: Meta {
            resource_type: "Schema".to_string(),
            created: None,
            last_modified: None,
            location: None,
            version: None,
        },
    }
}

fn attributes_of(root: &RootSchema) -> Vec<SchemaAttribute> {
    let Some(object) = &root.schema.object else {
        return Vec::new();
    };
    object
        .properties
        .iter()
        .map(|(name, schema)| {
            attribute_from(name, schema, object.required.contains(name), &root.definitions)
        })
        .collect()
}

fn attribute_from(
    name: &str,
    schema: &Schema,
    required: bool,
    definitions: &Map<String, Schema>,
) -> SchemaAttribute {
    let description = description_of(schema, definitions);

    let Some(resolved) = resolve(schema, definitions) else {
        // Unresolvable shape: advertise it as a plain string
        let mut attribute = SchemaAttribute::new(name, "string");
        attribute.required = required;
        attribute.description = description;
        return attribute;
    };

    let mut attribute = match primary_type(&resolved) {
        Some(InstanceType::String) => {
            if resolved.format.as_deref() == Some("date-time") {
                SchemaAttribute::new(name, "dateTime")
            } else {
                SchemaAttribute::new(name, "string")
            }
        }
        Some(InstanceType::Integer) => SchemaAttribute::new(name, "integer"),
        Some(InstanceType::Number) => SchemaAttribute::new(name, "decimal"),
        Some(InstanceType::Boolean) => SchemaAttribute::new(name, "boolean"),
        Some(InstanceType::Array) => {
            let mut attribute = SchemaAttribute::new(name, "complex");
            attribute.multi_valued = true;
            attribute.sub_attributes = item_sub_attributes(&resolved, definitions);
            attribute
        }
        Some(InstanceType::Object) => {
            let mut attribute = SchemaAttribute::new(name, "complex");
            attribute.sub_attributes = object_sub_attributes(&resolved, definitions);
            attribute
        }
        _ => SchemaAttribute::new(name, "string"),
    };

    attribute.required = required;
    attribute.description = description;
    attribute
}

/// Sub-attributes of a single complex object.
fn object_sub_attributes(
    resolved: &SchemaObject,
    definitions: &Map<String, Schema>,
) -> Option<Vec<SchemaAttribute>> {
    let object = resolved.object.as_ref()?;
    if object.properties.is_empty() {
        return None;
    }
    Some(
        object
            .properties
            .iter()
            .map(|(name, schema)| {
                attribute_from(name, schema, object.required.contains(name), definitions)
            })
            .collect(),
    )
}

/// Sub-attributes of a multi-valued attribute whose items are objects.
///
/// Arrays of plain values stay `complex` + `multiValued` with no
/// sub-attributes.
fn item_sub_attributes(
    resolved: &SchemaObject,
    definitions: &Map<String, Schema>,
) -> Option<Vec<SchemaAttribute>> {
    let array = resolved.array.as_ref()?;
    let item = match array.items.as_ref()? {
        SingleOrVec::Single(schema) => schema.as_ref(),
        SingleOrVec::Vec(schemas) => schemas.first()?,
    };
    let item = resolve(item, definitions)?;
    if primary_type(&item) == Some(InstanceType::Object) {
        object_sub_attributes(&item, definitions)
    } else {
        None
    }
}

/// Resolve a schema to its underlying non-null object shape.
fn resolve(schema: &Schema, definitions: &Map<String, Schema>) -> Option<SchemaObject> {
    let Schema::Object(object) = schema else {
        return None;
    };

    if let Some(reference) = &object.reference {
        let name = reference.rsplit('/').next()?;
        return definitions.get(name).and_then(|s| resolve(s, definitions));
    }

    if let Some(subschemas) = &object.subschemas {
        // Nullable wrappers and doc-comment wrappers: take the first branch
        // that resolves to something other than the null schema.
        if let Some(any_of) = &subschemas.any_of {
            return any_of
                .iter()
                .filter_map(|branch| resolve(branch, definitions))
                .find(|resolved| !is_null_schema(resolved));
        }
        if let Some(all_of) = &subschemas.all_of {
            return all_of.first().and_then(|first| resolve(first, definitions));
        }
    }

    Some(object.clone())
}

fn is_null_schema(object: &SchemaObject) -> bool {
    matches!(
        object.instance_type.as_ref(),
        Some(SingleOrVec::Single(single)) if **single == InstanceType::Null
    )
}

/// The first non-null instance type a schema object declares.
fn primary_type(object: &SchemaObject) -> Option<InstanceType> {
    match object.instance_type.as_ref()? {
        SingleOrVec::Single(single) => Some(**single),
        SingleOrVec::Vec(types) => types
            .iter()
            .find(|t| **t != InstanceType::Null)
            .copied(),
    }
}

fn description_of(schema: &Schema, definitions: &Map<String, Schema>) -> Option<String> {
    let own = match schema {
        Schema::Object(object) => object
            .metadata
            .as_ref()
            .and_then(|m| m.description.clone()),
        Schema::Bool(_) => None,
    };
    own.or_else(|| {
        resolve(schema, definitions)?
            .metadata
            .as_ref()
            .and_then(|m| m.description.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute<'a>(definition: &'a SchemaDefinition, name: &str) -> &'a SchemaAttribute {
        definition
            .attributes
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("attribute '{name}' missing"))
    }

    #[test]
    fn user_schema_advertises_core_attributes() {
        let introspector = SchemaIntrospector::new();
        let definition = introspector.definition(ScimResourceKind::User, "https://host/scim/v2");

        assert_eq!(definition.id, USER_SCHEMA_URN);
        assert_eq!(definition.schemas, vec![SCHEMA_URN.to_string()]);

        let user_name = attribute(&definition, "userName");
        assert_eq!(user_name.attribute_type, "string");
        assert!(user_name.required);
        assert!(!user_name.multi_valued);

        let active = attribute(&definition, "active");
        assert_eq!(active.attribute_type, "boolean");
    }

    #[test]
    fn emails_are_multi_valued_complex_with_sub_attributes() {
        let introspector = SchemaIntrospector::new();
        let definition = introspector.definition(ScimResourceKind::User, "https://host/scim/v2");

        let emails = attribute(&definition, "emails");
        assert_eq!(emails.attribute_type, "complex");
        assert!(emails.multi_valued);
        let sub = emails.sub_attributes.as_ref().unwrap();
        assert!(sub.iter().any(|a| a.name == "value"));
        assert!(sub.iter().any(|a| a.name == "primary" && a.attribute_type == "boolean"));
    }

    #[test]
    fn nested_meta_resolves_to_complex_with_datetimes() {
        let introspector = SchemaIntrospector::new();
        let definition = introspector.definition(ScimResourceKind::User, "https://host/scim/v2");

        let meta = attribute(&definition, "meta");
        assert_eq!(meta.attribute_type, "complex");
        assert!(!meta.multi_valued);
        let sub = meta.sub_attributes.as_ref().unwrap();
        let created = sub.iter().find(|a| a.name == "created").unwrap();
        assert_eq!(created.attribute_type, "dateTime");
    }

    #[test]
    fn plain_string_arrays_have_no_sub_attributes() {
        let introspector = SchemaIntrospector::new();
        let definition = introspector.definition(ScimResourceKind::User, "https://host/scim/v2");

        let schemas = attribute(&definition, "schemas");
        assert_eq!(schemas.attribute_type, "complex");
        assert!(schemas.multi_valued);
        assert!(schemas.sub_attributes.is_none());
    }

    #[test]
    fn group_schema_has_members() {
        let introspector = SchemaIntrospector::new();
        let definition = introspector.definition(ScimResourceKind::Group, "https://host/scim/v2");

        assert_eq!(definition.id, GROUP_SCHEMA_URN);
        let members = attribute(&definition, "members");
        assert!(members.multi_valued);
        let sub = members.sub_attributes.as_ref().unwrap();
        assert!(sub.iter().any(|a| a.name == "value" && a.required));
        assert!(sub.iter().any(|a| a.name == "$ref"));
    }

    #[test]
    fn cache_is_stable_except_location() {
        let introspector = SchemaIntrospector::new();
        let first = introspector.definition(ScimResourceKind::User, "https://a/scim/v2");
        let second = introspector.definition(ScimResourceKind::User, "https://b/scim/v2");

        assert_ne!(first.meta.location, second.meta.location);
        assert_eq!(
            second.meta.location.as_deref(),
            Some(format!("https://b/scim/v2/Schemas/{USER_SCHEMA_URN}").as_str())
        );
        assert_eq!(first.attributes, second.attributes);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn reset_recomputes_identically() {
        let introspector = SchemaIntrospector::new();
        let before = introspector.definition(ScimResourceKind::Group, "https://a/scim/v2");
        introspector.reset();
        let after = introspector.definition(ScimResourceKind::Group, "https://a/scim/v2");
        assert_eq!(before, after);
    }

    #[test]
    fn unknown_urn_is_not_found() {
        let introspector = SchemaIntrospector::new();
        assert!(introspector.definition_by_urn("urn:unknown", "https://a").is_none());
        assert!(
            introspector
                .definition_by_urn(USER_SCHEMA_URN, "https://a")
                .is_some()
        );
    }
}
