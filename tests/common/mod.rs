//! Shared fixtures for integration tests.

#![allow(dead_code)]

use scim_bridge::{Group, InMemoryDirectory, ScimService, User, UserRole};

/// Base URL a transport layer would hand to the engine.
pub const BASE_URL: &str = "https://app.example.com/scim/v2";

pub fn user(id: &str, email: &str, name: &str, role: UserRole, created_at: i64) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        created_at,
        updated_at: None,
    }
}

pub fn group(id: &str, name: &str, user_ids: &[&str], created_at: i64) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        owner_id: "admin-1".to_string(),
        user_ids: user_ids.iter().map(|s| s.to_string()).collect(),
        created_at,
        updated_at: None,
    }
}

/// A directory with one admin, three members and two groups.
pub async fn seeded_directory() -> InMemoryDirectory {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = InMemoryDirectory::new();
    store
        .insert_user(user(
            "admin-1",
            "root@example.com",
            "Root Admin",
            UserRole::Admin,
            1_700_000_000,
        ))
        .await;
    store
        .insert_user(user(
            "u1",
            "ada@example.com",
            "Ada Lovelace",
            UserRole::User,
            1_700_000_010,
        ))
        .await;
    store
        .insert_user(user(
            "u2",
            "grace@example.com",
            "Grace Hopper",
            UserRole::User,
            1_700_000_020,
        ))
        .await;
    store
        .insert_user(user(
            "u3",
            "alan@example.com",
            "Alan Turing",
            UserRole::Pending,
            1_700_000_030,
        ))
        .await;
    store
        .insert_group(group("g1", "Engineering", &["u1"], 1_700_000_100))
        .await;
    store
        .insert_group(group("g2", "Research", &["u1", "u2"], 1_700_000_200))
        .await;
    store
}

pub async fn seeded_service() -> ScimService<InMemoryDirectory> {
    ScimService::new(seeded_directory().await)
}
