//! Typed PATCH operations.
//!
//! A PATCH request arrives as loosely-typed `{op, path, value}` triples.
//! Rather than inspecting value shapes ad hoc at each application site,
//! the engine admits a closed set of (op, path) pairs and parses the whole
//! request into tagged operations up front:
//!
//! | resource | op      | path                        |
//! |----------|---------|-----------------------------|
//! | User     | replace | `active`                    |
//! | User     | replace | `userName`                  |
//! | Group    | replace | `displayName`               |
//! | Group    | replace | `members`                   |
//! | Group    | add     | `members`                   |
//! | Group    | remove  | `members[value eq "<id>"]`  |
//!
//! Parsing is eager and fail-fast: any unsupported combination aborts the
//! request before a single write is issued, so there is no partial
//! application past an unsupported operation. A supported combination with
//! a malformed value (wrong JSON type, member entry without a `value`
//! string) is a bad request rather than not-implemented.

use crate::error::{ScimError, ScimResult};
use crate::protocol::{PatchOperation, PatchRequest};
use serde_json::Value;

/// A validated PATCH operation against a User resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPatchOp {
    /// `replace active`, resolved into a role transition by the engine
    ReplaceActive(bool),
    /// `replace userName`, subject to the email uniqueness check
    ReplaceUserName(String),
}

/// A validated PATCH operation against a Group resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPatchOp {
    /// `replace displayName`, subject to the name uniqueness check
    ReplaceDisplayName(String),
    /// `replace members`: the staged member set becomes exactly this list
    ReplaceMembers(Vec<String>),
    /// `add members`: union into the staged member set
    AddMembers(Vec<String>),
    /// `remove members[value eq "<id>"]`; absence is a no-op
    RemoveMember(String),
}

/// Parse every operation of a User PATCH request.
pub fn parse_user_patch(request: &PatchRequest) -> ScimResult<Vec<UserPatchOp>> {
    request.operations.iter().map(parse_user_op).collect()
}

/// Parse every operation of a Group PATCH request.
pub fn parse_group_patch(request: &PatchRequest) -> ScimResult<Vec<GroupPatchOp>> {
    request.operations.iter().map(parse_group_op).collect()
}

fn unsupported(operation: &PatchOperation) -> ScimError {
    ScimError::not_implemented(format!(
        "PATCH operation '{}' on path '{}' is not implemented.",
        operation.op,
        operation.path.as_deref().unwrap_or("")
    ))
}

fn normalized_path(operation: &PatchOperation) -> Option<String> {
    operation
        .path
        .as_deref()
        .map(|p| p.trim().to_ascii_lowercase())
}

fn parse_user_op(operation: &PatchOperation) -> ScimResult<UserPatchOp> {
    let op = operation.op.to_ascii_lowercase();
    let path = normalized_path(operation);

    match (op.as_str(), path.as_deref()) {
        ("replace", Some("active")) => match operation.value.as_ref() {
            Some(Value::Bool(active)) => Ok(UserPatchOp::ReplaceActive(*active)),
            _ => Err(ScimError::bad_request(
                "Invalid value for 'active', boolean expected.",
            )),
        },
        ("replace", Some("username")) => match operation.value.as_ref() {
            Some(Value::String(email)) => Ok(UserPatchOp::ReplaceUserName(email.clone())),
            _ => Err(ScimError::bad_request(
                "Invalid value for 'userName', string expected.",
            )),
        },
        _ => Err(unsupported(operation)),
    }
}

fn parse_group_op(operation: &PatchOperation) -> ScimResult<GroupPatchOp> {
    let op = operation.op.to_ascii_lowercase();
    let path = normalized_path(operation);

    match (op.as_str(), path.as_deref()) {
        ("replace", Some("displayname")) => match operation.value.as_ref() {
            Some(Value::String(name)) => Ok(GroupPatchOp::ReplaceDisplayName(name.clone())),
            _ => Err(ScimError::bad_request(
                "Invalid value for 'displayName', string expected.",
            )),
        },
        ("replace", Some("members")) => match operation.value.as_ref() {
            // Replacing with nothing clears membership
            None | Some(Value::Null) => Ok(GroupPatchOp::ReplaceMembers(Vec::new())),
            Some(Value::Array(entries)) => {
                Ok(GroupPatchOp::ReplaceMembers(member_ids(entries, "replace")?))
            }
            Some(_) => Err(ScimError::bad_request(
                "Invalid value for 'members' replace operation; list expected.",
            )),
        },
        ("add", Some("members")) => match operation.value.as_ref() {
            Some(Value::Array(entries)) => {
                Ok(GroupPatchOp::AddMembers(member_ids(entries, "add")?))
            }
            _ => Err(ScimError::bad_request(
                "Invalid value for 'members' add operation; list expected.",
            )),
        },
        ("remove", Some(path)) if path.starts_with("members[") => {
            parse_member_filter(operation, path).map(GroupPatchOp::RemoveMember)
        }
        _ => Err(unsupported(operation)),
    }
}

/// Extract member ids from a PATCH value list.
///
/// Each entry must be an object carrying a string `value` key; anything
/// else is a malformed request, not an unsupported feature.
fn member_ids(entries: &[Value], operation_name: &str) -> ScimResult<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ScimError::bad_request(format!(
                        "Invalid member object in 'members' {operation_name} operation."
                    ))
                })
        })
        .collect()
}

/// Parse the removal path `members[value eq "<id>"]` into the target id.
fn parse_member_filter(operation: &PatchOperation, normalized: &str) -> ScimResult<String> {
    let malformed = || {
        ScimError::bad_request("Invalid path filter for 'members' remove operation.".to_string())
    };

    if !normalized.starts_with("members[value eq") {
        return Err(unsupported(operation));
    }

    // Take the quoted id from the original (case-preserved) path text
    let raw = operation.path.as_deref().unwrap_or("");
    let mut quoted = raw.split('"');
    let _prefix = quoted.next().ok_or_else(malformed)?;
    let id = quoted.next().ok_or_else(malformed)?;
    if id.is_empty() {
        return Err(malformed());
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operation(op: &str, path: Option<&str>, value: Option<Value>) -> PatchOperation {
        PatchOperation {
            op: op.to_string(),
            path: path.map(str::to_string),
            value,
        }
    }

    fn request(operations: Vec<PatchOperation>) -> PatchRequest {
        PatchRequest {
            schemas: vec![crate::protocol::PATCH_OP_URN.to_string()],
            operations,
        }
    }

    #[test]
    fn replace_active_requires_boolean() {
        let ops = parse_user_patch(&request(vec![operation(
            "Replace",
            Some("Active"),
            Some(json!(false)),
        )]))
        .unwrap();
        assert_eq!(ops, vec![UserPatchOp::ReplaceActive(false)]);

        let error = parse_user_patch(&request(vec![operation(
            "replace",
            Some("active"),
            Some(json!("true")),
        )]))
        .unwrap_err();
        assert_eq!(error.scim_type(), "invalidValue");
    }

    #[test]
    fn replace_username_requires_string() {
        let ops = parse_user_patch(&request(vec![operation(
            "replace",
            Some("userName"),
            Some(json!("new@example.com")),
        )]))
        .unwrap();
        assert_eq!(
            ops,
            vec![UserPatchOp::ReplaceUserName("new@example.com".to_string())]
        );

        let error = parse_user_patch(&request(vec![operation(
            "replace",
            Some("userName"),
            Some(json!(7)),
        )]))
        .unwrap_err();
        assert_eq!(error.status(), 400);
    }

    #[test]
    fn unsupported_user_combinations_fail_fast() {
        for (op, path) in [
            ("add", Some("emails")),
            ("remove", Some("active")),
            ("replace", Some("name.givenName")),
            ("replace", None),
        ] {
            let error = parse_user_patch(&request(vec![operation(op, path, Some(json!("x")))]))
                .unwrap_err();
            assert_eq!(error.scim_type(), "notImplemented", "{op} {path:?}");
        }
    }

    #[test]
    fn one_bad_operation_rejects_the_whole_request() {
        let error = parse_user_patch(&request(vec![
            operation("replace", Some("active"), Some(json!(true))),
            operation("add", Some("members"), Some(json!([]))),
        ]))
        .unwrap_err();
        assert_eq!(error.scim_type(), "notImplemented");
    }

    #[test]
    fn group_replace_members_parses_value_objects() {
        let ops = parse_group_patch(&request(vec![operation(
            "replace",
            Some("members"),
            Some(json!([{"value": "u1"}, {"value": "u2", "display": "x"}])),
        )]))
        .unwrap();
        assert_eq!(
            ops,
            vec![GroupPatchOp::ReplaceMembers(vec![
                "u1".to_string(),
                "u2".to_string()
            ])]
        );
    }

    #[test]
    fn group_replace_members_with_null_clears() {
        let ops = parse_group_patch(&request(vec![operation("replace", Some("members"), None)]))
            .unwrap();
        assert_eq!(ops, vec![GroupPatchOp::ReplaceMembers(Vec::new())]);
    }

    #[test]
    fn malformed_member_entry_is_bad_request() {
        let error = parse_group_patch(&request(vec![operation(
            "add",
            Some("members"),
            Some(json!([{"display": "no value key"}])),
        )]))
        .unwrap_err();
        assert_eq!(error.scim_type(), "invalidValue");

        let error = parse_group_patch(&request(vec![operation(
            "add",
            Some("members"),
            Some(json!("u1")),
        )]))
        .unwrap_err();
        assert_eq!(error.status(), 400);
    }

    #[test]
    fn remove_member_parses_quoted_id() {
        let ops = parse_group_patch(&request(vec![operation(
            "remove",
            Some("members[value eq \"u2\"]"),
            None,
        )]))
        .unwrap();
        assert_eq!(ops, vec![GroupPatchOp::RemoveMember("u2".to_string())]);
    }

    #[test]
    fn remove_member_without_quotes_is_bad_request() {
        let error = parse_group_patch(&request(vec![operation(
            "remove",
            Some("members[value eq u2]"),
            None,
        )]))
        .unwrap_err();
        assert_eq!(error.status(), 400);
    }

    #[test]
    fn unsupported_group_combinations_fail_fast() {
        for (op, path) in [
            ("remove", None),
            ("remove", Some("displayName")),
            ("add", Some("displayName")),
            ("replace", Some("externalId")),
        ] {
            let error = parse_group_patch(&request(vec![operation(op, path, Some(json!("x")))]))
                .unwrap_err();
            assert_eq!(error.scim_type(), "notImplemented", "{op} {path:?}");
        }
    }
}
