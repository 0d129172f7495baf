//! Bidirectional mapping between directory records and SCIM resources.
//!
//! The read direction ([`user_to_scim`], [`group_to_scim`]) is total and
//! side-effect-free: every record maps to a wire resource. The write
//! direction ([`user_fields_from_scim`], [`group_fields_from_scim`])
//! extracts the attribute set the directory actually owns (email, display
//! name and the active flag for users; display name and member ids for
//! groups) without silently dropping anything a client provided for those
//! attributes.
//!
//! `active` is never stored. It is a projection of the role (`active ⇔
//! role != pending`), so writes of `active` are resolved into role
//! transitions by [`resolve_role`].

use crate::directory::{Group, User, UserRole};
use crate::protocol::{
    Email, GROUP_SCHEMA_URN, Member, Meta, Name, ScimGroup, ScimUser, USER_SCHEMA_URN,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// The user attributes a SCIM write can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub email: String,
    pub name: String,
    pub active: bool,
}

/// The group attributes a SCIM write can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub member_ids: Vec<String>,
}

/// Resolve a requested `active` flag into a concrete role.
///
/// Deactivation always lands on `pending`. Activation promotes `pending`
/// to `user` but leaves any already-active role (e.g. `admin`) untouched,
/// so a provisioning round-trip cannot demote elevated users.
pub fn resolve_role(current: UserRole, active: bool) -> UserRole {
    if !active {
        UserRole::Pending
    } else if current == UserRole::Pending {
        UserRole::User
    } else {
        current
    }
}

fn timestamp(epoch_seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_seconds, 0).unwrap_or_default()
}

/// Render a directory user as a SCIM User resource.
pub fn user_to_scim(user: &User, base_url: &str) -> ScimUser {
    let (given_name, family_name) = match user.name.split_once(' ') {
        Some((given, family)) => (Some(given.to_string()), Some(family.to_string())),
        None if user.name.is_empty() => (None, None),
        None => (Some(user.name.clone()), None),
    };
    let display_name = (!user.name.is_empty()).then(|| user.name.clone());

    let created = timestamp(user.created_at);
    // Last modified defaults to the creation time rather than being omitted
    let last_modified = timestamp(user.updated_at.unwrap_or(user.created_at));

    ScimUser {
        schemas: vec![USER_SCHEMA_URN.to_string()],
        id: user.id.clone(),
        external_id: None,
        user_name: user.email.clone(),
        name: Some(Name {
            formatted: display_name.clone(),
            family_name,
            given_name,
            ..Name::default()
        }),
        display_name,
        nick_name: None,
        profile_url: None,
        title: None,
        user_type: None,
        preferred_language: None,
        locale: None,
        timezone: None,
        active: user.role.is_active(),
        password: None,
        emails: Some(vec![Email {
            value: Some(user.email.clone()),
            display: None,
            email_type: Some("work".to_string()),
            primary: Some(true),
        }]),
        phone_numbers: None,
        addresses: None,
        groups: None,
        meta: Some(Meta {
            resource_type: "User".to_string(),
            created: Some(created),
            last_modified: Some(last_modified),
            location: Some(format!("{base_url}/Users/{}", user.id)),
            version: None,
        }),
    }
}

/// Extract the writable user fields from a SCIM User payload.
///
/// Name resolution precedence: `name.formatted`, then `displayName`, then
/// `givenName familyName`, then `givenName` alone, then `familyName`
/// alone, falling back to `userName`.
pub fn user_fields_from_scim(payload: &ScimUser) -> UserDraft {
    fn nonempty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|s| !s.is_empty())
    }

    let given = payload.name.as_ref().and_then(|n| nonempty(&n.given_name));
    let family = payload.name.as_ref().and_then(|n| nonempty(&n.family_name));

    let name = payload
        .name
        .as_ref()
        .and_then(|n| nonempty(&n.formatted))
        .map(str::to_string)
        .or_else(|| nonempty(&payload.display_name).map(str::to_string))
        .or_else(|| match (given, family) {
            (Some(given), Some(family)) => Some(format!("{given} {family}")),
            (Some(given), None) => Some(given.to_string()),
            (None, Some(family)) => Some(family.to_string()),
            (None, None) => None,
        })
        .unwrap_or_else(|| payload.user_name.clone());

    UserDraft {
        email: payload.user_name.clone(),
        name,
        active: payload.active,
    }
}

/// Render a directory group as a SCIM Group resource.
///
/// `users` supplies the member records that could be resolved; member ids
/// with no matching record are kept, with the raw id as display text, so
/// provisioning diffs never see members silently vanish.
pub fn group_to_scim(group: &Group, users: &[User], base_url: &str) -> ScimGroup {
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    let members = group
        .user_ids
        .iter()
        .map(|user_id| {
            let display = by_id
                .get(user_id.as_str())
                .map(|u| u.email.clone())
                .unwrap_or_else(|| user_id.clone());
            Member {
                value: user_id.clone(),
                reference: Some(format!("{base_url}/Users/{user_id}")),
                member_type: Some("User".to_string()),
                display: Some(display),
            }
        })
        .collect();

    let created = timestamp(group.created_at);
    let last_modified = timestamp(group.updated_at.unwrap_or(group.created_at));

    ScimGroup {
        schemas: vec![GROUP_SCHEMA_URN.to_string()],
        id: group.id.clone(),
        external_id: None,
        display_name: group.name.clone(),
        members: Some(members),
        meta: Some(Meta {
            resource_type: "Group".to_string(),
            created: Some(created),
            last_modified: Some(last_modified),
            location: Some(format!("{base_url}/Groups/{}", group.id)),
            version: None,
        }),
    }
}

/// Extract the writable group fields from a SCIM Group payload.
pub fn group_fields_from_scim(payload: &ScimGroup) -> GroupDraft {
    GroupDraft {
        name: payload.display_name.clone(),
        member_ids: payload
            .members
            .as_ref()
            .map(|members| members.iter().map(|m| m.value.clone()).collect())
            .unwrap_or_default(),
    }
}
