//! Uniqueness checks shared by the create, replace and patch paths.
//!
//! Both checks run before the write they guard. The email check leans on
//! the store's indexed lookup; the display-name check scans all groups
//! because the store contract offers no lookup by name. Comparison is
//! case-sensitive in both cases.

use crate::directory::DirectoryStore;
use crate::error::{ScimError, ScimResult, store_error};
use log::debug;

/// Fail with a uniqueness conflict when `candidate` is already another
/// user's email.
///
/// `exclude_id` names the user being updated, so an update that keeps the
/// same email passes.
pub async fn ensure_email_available<S: DirectoryStore>(
    store: &S,
    candidate: &str,
    exclude_id: Option<&str>,
) -> ScimResult<()> {
    let existing = store
        .find_user_by_email(candidate)
        .await
        .map_err(store_error)?;

    match existing {
        Some(user) if Some(user.id.as_str()) != exclude_id => {
            debug!("email '{candidate}' already belongs to user '{}'", user.id);
            Err(ScimError::conflict(format!(
                "User with userName '{candidate}' already exists."
            )))
        }
        _ => Ok(()),
    }
}

/// Fail with a uniqueness conflict when `candidate` is already another
/// group's display name.
pub async fn ensure_group_name_available<S: DirectoryStore>(
    store: &S,
    candidate: &str,
    exclude_id: Option<&str>,
) -> ScimResult<()> {
    let groups = store.list_groups().await.map_err(store_error)?;

    let taken = groups
        .iter()
        .any(|group| group.name == candidate && Some(group.id.as_str()) != exclude_id);
    if taken {
        debug!("group display name '{candidate}' already taken");
        return Err(ScimError::conflict(format!(
            "Group with displayName '{candidate}' already exists."
        )));
    }
    Ok(())
}
