//! User endpoint operations.
//!
//! Every conflict and validation check runs before the store write it
//! guards; once a write is issued its result is trusted. PATCH applies its
//! operations against the in-request snapshot, writing each changed
//! attribute group (`{role}`, `{email}`) at most once, and always returns
//! the canonical representation; a request that changes nothing is a
//! success, indistinguishable from one that changed a value back.

use crate::directory::{DirectoryStore, NewUser, User, UserRole, UserUpdate};
use crate::error::{ScimError, ScimResult, store_error};
use crate::list::{ListQuery, paginate, parse_eq_filter};
use crate::mapper::{resolve_role, user_fields_from_scim, user_to_scim};
use crate::patch::{UserPatchOp, parse_user_patch};
use crate::protocol::{ListResponse, PatchRequest, ScimUser};
use crate::service::{Created, ScimService};
use crate::validate::ensure_email_available;
use log::{debug, info};
use uuid::Uuid;

impl<S: DirectoryStore> ScimService<S> {
    /// List users with optional `userName eq` filtering and pagination.
    pub async fn list_users(
        &self,
        query: &ListQuery,
        base_url: &str,
    ) -> ScimResult<ListResponse<ScimUser>> {
        query.ensure_supported()?;

        let all = self.store().list_users(None).await.map_err(store_error)?;
        let filtered: Vec<User> = match &query.filter {
            Some(raw) => {
                let email = parse_eq_filter(raw, "userName")?;
                all.into_iter().filter(|u| u.email == email).collect()
            }
            None => all,
        };

        let (page, total) = paginate(filtered, query);
        let resources = page.iter().map(|u| user_to_scim(u, base_url)).collect();
        Ok(ListResponse::new(
            total,
            query.effective_start_index(),
            resources,
        ))
    }

    /// Fetch one user by id.
    pub async fn get_user(&self, id: &str, base_url: &str) -> ScimResult<ScimUser> {
        let user = self.require_user(id).await?;
        Ok(user_to_scim(&user, base_url))
    }

    /// Create a user from a POSTed resource.
    ///
    /// The client may supply the id; otherwise one is generated. A missing
    /// password gets a generated throwaway secret.
    pub async fn create_user(
        &self,
        payload: &ScimUser,
        base_url: &str,
    ) -> ScimResult<Created<ScimUser>> {
        if payload.user_name.is_empty() {
            return Err(ScimError::bad_request("userName is a required field."));
        }
        ensure_email_available(self.store(), &payload.user_name, None).await?;

        let draft = user_fields_from_scim(payload);
        let id = if payload.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            payload.id.clone()
        };
        let credential_secret = payload
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let role = if draft.active {
            UserRole::User
        } else {
            UserRole::Pending
        };

        info!("provisioning user '{id}' ({})", draft.email);
        let user = self
            .store()
            .create_user(NewUser {
                id,
                email: draft.email,
                name: draft.name,
                credential_secret,
                role,
            })
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::internal("Failed to create user."))?;

        Ok(Created {
            location: format!("{base_url}/Users/{}", user.id),
            resource: user_to_scim(&user, base_url),
        })
    }

    /// Replace a user from a PUT payload.
    pub async fn replace_user(
        &self,
        id: &str,
        payload: &ScimUser,
        base_url: &str,
    ) -> ScimResult<ScimUser> {
        if !payload.id.is_empty() && payload.id != id {
            return Err(ScimError::bad_request(
                "User ID in payload must match the requested user.",
            ));
        }

        let current = self.require_user(id).await?;
        if payload.user_name != current.email {
            ensure_email_available(self.store(), &payload.user_name, Some(id)).await?;
        }

        let draft = user_fields_from_scim(payload);
        let fields = UserUpdate {
            email: Some(draft.email),
            name: Some(draft.name),
            role: Some(resolve_role(current.role, draft.active)),
        };

        let updated = self
            .store()
            .update_user(id, fields)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::internal("Failed to update user."))?;

        Ok(user_to_scim(&updated, base_url))
    }

    /// Apply a PATCH request to a user.
    pub async fn patch_user(
        &self,
        id: &str,
        request: &PatchRequest,
        base_url: &str,
    ) -> ScimResult<ScimUser> {
        // Parse everything first so an unsupported operation aborts the
        // request before any write.
        let operations = parse_user_patch(request)?;
        let mut user = self.require_user(id).await?;

        for operation in operations {
            match operation {
                UserPatchOp::ReplaceActive(active) => {
                    let role = resolve_role(user.role, active);
                    if role != user.role {
                        debug!("user '{id}': role {} -> {}", user.role.as_str(), role.as_str());
                        user = self
                            .store()
                            .update_user(id, UserUpdate::role(role))
                            .await
                            .map_err(store_error)?
                            .ok_or_else(|| {
                                ScimError::internal("Failed to apply PATCH updates.")
                            })?;
                    }
                }
                UserPatchOp::ReplaceUserName(email) => {
                    if email != user.email {
                        ensure_email_available(self.store(), &email, Some(id)).await?;
                        user = self
                            .store()
                            .update_user(id, UserUpdate::email(email))
                            .await
                            .map_err(store_error)?
                            .ok_or_else(|| {
                                ScimError::internal("Failed to apply PATCH updates.")
                            })?;
                    }
                }
            }
        }

        // Canonical re-read to pick up store-maintained timestamps
        let user = self
            .store()
            .find_user_by_id(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::internal("User record disappeared during PATCH."))?;
        Ok(user_to_scim(&user, base_url))
    }

    /// Delete a user by id.
    pub async fn delete_user(&self, id: &str) -> ScimResult<()> {
        self.require_user(id).await?;
        let deleted = self.store().delete_user(id).await.map_err(store_error)?;
        if !deleted {
            return Err(ScimError::internal(format!("Failed to delete user '{id}'.")));
        }
        info!("deprovisioned user '{id}'");
        Ok(())
    }

    async fn require_user(&self, id: &str) -> ScimResult<User> {
        self.store()
            .find_user_by_id(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ScimError::not_found(format!("User with ID '{id}' not found.")))
    }
}
