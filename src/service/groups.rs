//! Group endpoint operations.
//!
//! Membership writes are staged: a PATCH may touch the member set several
//! times, but at most one `{user_ids}` store write happens per request,
//! and only when the final set differs from the snapshot. Scalar changes
//! (`displayName`) write immediately after their conflict check. The two
//! kinds of write are not atomic with each other; a failure in between
//! leaves a partially updated group, observed on the next read.

use crate::directory::{DirectoryStore, Group, GroupUpdate, UserRole};
use crate::error::{ScimError, ScimResult, store_error};
use crate::list::{ListQuery, paginate, parse_eq_filter};
use crate::mapper::{group_fields_from_scim, group_to_scim};
use crate::patch::{GroupPatchOp, parse_group_patch};
use crate::protocol::{ListResponse, PatchRequest, ScimGroup};
use crate::service::{Created, ScimService};
use crate::validate::ensure_group_name_available;
use log::{debug, info, warn};
use std::collections::BTreeSet;

impl<S: DirectoryStore> ScimService<S> {
    /// List groups with optional `displayName eq` filtering and pagination.
    pub async fn list_groups(
        &self,
        query: &ListQuery,
        base_url: &str,
    ) -> ScimResult<ListResponse<ScimGroup>> {
        query.ensure_supported()?;

        let all = self.store().list_groups().await.map_err(store_error)?;
        let filtered: Vec<Group> = match &query.filter {
            Some(raw) => {
                let name = parse_eq_filter(raw, "displayName")?;
                all.into_iter().filter(|g| g.name == name).collect()
            }
            None => all,
        };

        let (page, total) = paginate(filtered, query);
        let mut resources = Vec::with_capacity(page.len());
        for group in &page {
            resources.push(self.render_group(group, base_url).await?);
        }
        Ok(ListResponse::new(
            total,
            query.effective_start_index(),
            resources,
        ))
    }

    /// Fetch one group by id.
    pub async fn get_group(&self, id: &str, base_url: &str) -> ScimResult<ScimGroup> {
        let group = self.require_group(id).await?;
        self.render_group(&group, base_url).await
    }

    /// Create a group from a POSTed resource.
    ///
    /// Creation is two-phase: the group record is created empty under the
    /// first admin user's ownership, then membership is assigned with a
    /// second write. The phases are not atomic; a failure after the first
    /// leaves an empty group behind.
    pub async fn create_group(
        &self,
        payload: &ScimGroup,
        base_url: &str,
    ) -> ScimResult<Created<ScimGroup>> {
        if payload.display_name.is_empty() {
            return Err(ScimError::bad_request(
                "displayName is a required field for groups.",
            ));
        }
        ensure_group_name_available(self.store(), &payload.display_name, None).await?;

        let draft = group_fields_from_scim(payload);

        let admins = self
            .store()
            .list_users(Some(UserRole::Admin))
            .await
            .map_err(store_error)?;
        let owner = admins
            .first()
            .ok_or_else(|| ScimError::internal("No admin user available to own the group."))?;

        info!("provisioning group '{}'", draft.name);
        let mut group = self
            .store()
            .create_group(&owner.id, &draft.name, "")
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::internal("Failed to create group."))?;

        if !draft.member_ids.is_empty() {
            match self
                .store()
                .update_group(&group.id, GroupUpdate::members(draft.member_ids))
                .await
                .map_err(store_error)?
            {
                Some(updated) => group = updated,
                None => {
                    // The group exists but without its members; surfaced on
                    // the next read rather than rolled back.
                    warn!("failed to assign members to new group '{}'", group.id);
                }
            }
        }

        let resource = self.render_group(&group, base_url).await?;
        Ok(Created {
            location: format!("{base_url}/Groups/{}", group.id),
            resource,
        })
    }

    /// Replace a group from a PUT payload.
    pub async fn replace_group(
        &self,
        id: &str,
        payload: &ScimGroup,
        base_url: &str,
    ) -> ScimResult<ScimGroup> {
        if !payload.id.is_empty() && payload.id != id {
            return Err(ScimError::bad_request(
                "Group ID in payload must match the requested group.",
            ));
        }

        let current = self.require_group(id).await?;
        if payload.display_name != current.name {
            ensure_group_name_available(self.store(), &payload.display_name, Some(id)).await?;
        }

        let draft = group_fields_from_scim(payload);
        let fields = GroupUpdate {
            name: Some(draft.name),
            description: None,
            user_ids: Some(draft.member_ids),
        };

        let updated = self
            .store()
            .update_group(id, fields)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::internal("Failed to update group."))?;

        self.render_group(&updated, base_url).await
    }

    /// Apply a PATCH request to a group.
    pub async fn patch_group(
        &self,
        id: &str,
        request: &PatchRequest,
        base_url: &str,
    ) -> ScimResult<ScimGroup> {
        let operations = parse_group_patch(request)?;
        let mut group = self.require_group(id).await?;

        // Membership is staged across operations; scalars write immediately.
        let original: BTreeSet<String> = group.user_ids.iter().cloned().collect();
        let mut staged = original.clone();

        for operation in operations {
            match operation {
                GroupPatchOp::ReplaceDisplayName(name) => {
                    if name != group.name {
                        ensure_group_name_available(self.store(), &name, Some(id)).await?;
                        group = self
                            .store()
                            .update_group(id, GroupUpdate::name(name))
                            .await
                            .map_err(store_error)?
                            .ok_or_else(|| {
                                ScimError::internal("Failed to apply PATCH updates to group.")
                            })?;
                    }
                }
                GroupPatchOp::ReplaceMembers(ids) => {
                    staged = ids.into_iter().collect();
                }
                GroupPatchOp::AddMembers(ids) => {
                    staged.extend(ids);
                }
                GroupPatchOp::RemoveMember(member_id) => {
                    // Removing an absent member is a no-op, not an error
                    staged.remove(&member_id);
                }
            }
        }

        if staged != original {
            debug!("group '{id}': members {:?} -> {:?}", original, staged);
            self.store()
                .update_group(id, GroupUpdate::members(staged.into_iter().collect()))
                .await
                .map_err(store_error)?
                .ok_or_else(|| {
                    ScimError::internal("Failed to apply PATCH updates to group.")
                })?;
        }

        let group = self
            .store()
            .find_group_by_id(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::internal("Group record disappeared during PATCH."))?;
        self.render_group(&group, base_url).await
    }

    /// Delete a group by id.
    pub async fn delete_group(&self, id: &str) -> ScimResult<()> {
        self.require_group(id).await?;
        let deleted = self.store().delete_group(id).await.map_err(store_error)?;
        if !deleted {
            return Err(ScimError::internal(format!(
                "Failed to delete group '{id}'."
            )));
        }
        info!("deprovisioned group '{id}'");
        Ok(())
    }

    async fn require_group(&self, id: &str) -> ScimResult<Group> {
        self.store()
            .find_group_by_id(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::not_found(format!("Group with ID '{id}' not found.")))
    }

    /// Map a group to the wire, resolving member records for display.
    async fn render_group(&self, group: &Group, base_url: &str) -> ScimResult<ScimGroup> {
        let members = self
            .store()
            .list_users_by_ids(&group.user_ids)
            .await
            .map_err(store_error)?;
        Ok(group_to_scim(group, &members, base_url))
    }
}
