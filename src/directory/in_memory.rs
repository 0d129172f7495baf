//! In-memory reference implementation of the directory store.
//!
//! Thread-safe via `tokio::sync::RwLock` over plain `HashMap`s. Intended
//! for tests, demos and as executable documentation of the
//! [`DirectoryStore`] contract: email uniqueness is enforced on create and
//! update, `updated_at` is bumped on every successful write, and listings
//! come back in a stable (creation time, id) order.
//!
//! Mutation counters are kept so tests can assert how many writes an engine
//! operation actually issued.

use crate::directory::{DirectoryStore, Group, GroupUpdate, NewUser, User, UserRole, UserUpdate};
use chrono::Utc;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Counts of mutating store calls, by entity and kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub user_creates: usize,
    pub user_updates: usize,
    pub user_deletes: usize,
    pub group_creates: usize,
    pub group_updates: usize,
    pub group_deletes: usize,
}

#[derive(Default)]
struct Counters {
    user_creates: AtomicUsize,
    user_updates: AtomicUsize,
    user_deletes: AtomicUsize,
    group_creates: AtomicUsize,
    group_updates: AtomicUsize,
    group_deletes: AtomicUsize,
}

/// Thread-safe in-memory identity directory.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<String, User>>>,
    groups: Arc<RwLock<HashMap<String, Group>>>,
    counters: Arc<Counters>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record directly, bypassing uniqueness checks.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Seed a group record directly.
    pub async fn insert_group(&self, group: Group) {
        self.groups.write().await.insert(group.id.clone(), group);
    }

    /// Snapshot the mutation counters.
    pub fn write_stats(&self) -> WriteStats {
        WriteStats {
            user_creates: self.counters.user_creates.load(Ordering::Relaxed),
            user_updates: self.counters.user_updates.load(Ordering::Relaxed),
            user_deletes: self.counters.user_deletes.load(Ordering::Relaxed),
            group_creates: self.counters.group_creates.load(Ordering::Relaxed),
            group_updates: self.counters.group_updates.load(Ordering::Relaxed),
            group_deletes: self.counters.group_deletes.load(Ordering::Relaxed),
        }
    }

    /// Remove all records and reset counters (useful between tests).
    pub async fn clear(&self) {
        self.users.write().await.clear();
        self.groups.write().await.clear();
        self.counters.user_creates.store(0, Ordering::Relaxed);
        self.counters.user_updates.store(0, Ordering::Relaxed);
        self.counters.user_deletes.store(0, Ordering::Relaxed);
        self.counters.group_creates.store(0, Ordering::Relaxed);
        self.counters.group_updates.store(0, Ordering::Relaxed);
        self.counters.group_deletes.store(0, Ordering::Relaxed);
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }
}

impl DirectoryStore for InMemoryDirectory {
    type Error = Infallible;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, Self::Error> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Self::Error> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, Self::Error> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        result.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(result)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<Option<User>, Self::Error> {
        let mut users = self.users.write().await;
        let taken = users
            .values()
            .any(|u| u.email == new_user.email || u.id == new_user.id);
        if taken {
            return Ok(None);
        }
        let user = User {
            id: new_user.id,
            email: new_user.email,
            name: new_user.name,
            role: new_user.role,
            created_at: Self::now(),
            updated_at: None,
        };
        users.insert(user.id.clone(), user.clone());
        self.counters.user_creates.fetch_add(1, Ordering::Relaxed);
        Ok(Some(user))
    }

    async fn update_user(&self, id: &str, fields: UserUpdate) -> Result<Option<User>, Self::Error> {
        let mut users = self.users.write().await;
        if let Some(email) = &fields.email {
            let taken = users.values().any(|u| u.email == *email && u.id != id);
            if taken {
                return Ok(None);
            }
        }
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(email) = fields.email {
            user.email = email;
        }
        if let Some(name) = fields.name {
            user.name = name;
        }
        if let Some(role) = fields.role {
            user.role = role;
        }
        user.updated_at = Some(Self::now());
        self.counters.user_updates.fetch_add(1, Ordering::Relaxed);
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> Result<bool, Self::Error> {
        let removed = self.users.write().await.remove(id).is_some();
        if removed {
            self.counters.user_deletes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn find_group_by_id(&self, id: &str) -> Result<Option<Group>, Self::Error> {
        Ok(self.groups.read().await.get(id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, Self::Error> {
        let groups = self.groups.read().await;
        let mut result: Vec<Group> = groups.values().cloned().collect();
        result.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(result)
    }

    async fn create_group(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Option<Group>, Self::Error> {
        let mut groups = self.groups.write().await;
        let group = Group {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            owner_id: owner_id.to_string(),
            user_ids: Vec::new(),
            created_at: Self::now(),
            updated_at: None,
        };
        groups.insert(group.id.clone(), group.clone());
        self.counters.group_creates.fetch_add(1, Ordering::Relaxed);
        Ok(Some(group))
    }

    async fn update_group(
        &self,
        id: &str,
        fields: GroupUpdate,
    ) -> Result<Option<Group>, Self::Error> {
        let mut groups = self.groups.write().await;
        let Some(group) = groups.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = fields.name {
            group.name = name;
        }
        if let Some(description) = fields.description {
            group.description = description;
        }
        if let Some(mut user_ids) = fields.user_ids {
            // Set semantics: collapse duplicates, keep a stable order
            user_ids.sort();
            user_ids.dedup();
            group.user_ids = user_ids;
        }
        group.updated_at = Some(Self::now());
        self.counters.group_updates.fetch_add(1, Ordering::Relaxed);
        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, id: &str) -> Result<bool, Self::Error> {
        let removed = self.groups.write().await.remove(id).is_some();
        if removed {
            self.counters.group_deletes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn list_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, Self::Error> {
        let users = self.users.read().await;
        let mut result: Vec<User> = ids.iter().filter_map(|id| users.get(id).cloned()).collect();
        result.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(id: &str, email: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            email: email.to_string(),
            name: format!("User {id}"),
            credential_secret: "secret".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn create_enforces_email_uniqueness() {
        let store = InMemoryDirectory::new();
        let first = store.create_user(new_user("u1", "a@example.com")).await.unwrap();
        assert!(first.is_some());

        let duplicate = store.create_user(new_user("u2", "a@example.com")).await.unwrap();
        assert!(duplicate.is_none());
        assert_eq!(store.write_stats().user_creates, 1);
    }

    #[tokio::test]
    async fn update_refuses_email_collision() {
        let store = InMemoryDirectory::new();
        store.create_user(new_user("u1", "a@example.com")).await.unwrap();
        store.create_user(new_user("u2", "b@example.com")).await.unwrap();

        let collided = store
            .update_user("u2", UserUpdate::email("a@example.com"))
            .await
            .unwrap();
        assert!(collided.is_none());

        let moved = store
            .update_user("u2", UserUpdate::email("c@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.email, "c@example.com");
        assert!(moved.updated_at.is_some());
    }

    #[tokio::test]
    async fn member_ids_collapse_duplicates() {
        let store = InMemoryDirectory::new();
        let group = store.create_group("owner", "Eng", "").await.unwrap().unwrap();
        let updated = store
            .update_group(
                &group.id,
                GroupUpdate::members(vec![
                    "u1".to_string(),
                    "u2".to_string(),
                    "u1".to_string(),
                ]),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.user_ids, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryDirectory::new();
        store.create_user(new_user("u1", "a@example.com")).await.unwrap();
        assert!(store.delete_user("u1").await.unwrap());
        assert!(!store.delete_user("u1").await.unwrap());
        assert_eq!(store.write_stats().user_deletes, 1);
    }

    #[tokio::test]
    async fn listing_is_role_filtered_and_ordered() {
        let store = InMemoryDirectory::new();
        let mut admin = new_user("u1", "a@example.com");
        admin.role = UserRole::Admin;
        store.create_user(admin).await.unwrap();
        store.create_user(new_user("u2", "b@example.com")).await.unwrap();

        let admins = store.list_users(Some(UserRole::Admin)).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, "u1");

        let all = store.list_users(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
