//! End-to-end user provisioning flows against the in-memory directory.

mod common;

use common::{BASE_URL, seeded_service, user};
use proptest::prelude::*;
use scim_bridge::{
    DirectoryStore, InMemoryDirectory, ListQuery, PatchOperation, PatchRequest, ScimService,
    ScimUser, UserRole,
};
use serde_json::json;

fn patch(operations: Vec<(&str, Option<&str>, Option<serde_json::Value>)>) -> PatchRequest {
    PatchRequest {
        schemas: vec!["urn:ietf:params:scim:api:messages:2.0:PatchOp".to_string()],
        operations: operations
            .into_iter()
            .map(|(op, path, value)| PatchOperation {
                op: op.to_string(),
                path: path.map(str::to_string),
                value,
            })
            .collect(),
    }
}

fn minimal_user(user_name: &str, name: &str, active: bool) -> ScimUser {
    serde_json::from_value(json!({
        "userName": user_name,
        "name": {"formatted": name},
        "active": active,
    }))
    .unwrap()
}

#[tokio::test]
async fn listing_pages_cover_the_directory() {
    let service = seeded_service().await;

    let mut collected = Vec::new();
    let mut start_index = 1;
    loop {
        let query = ListQuery::new().with_start_index(start_index).with_count(2);
        let page = service.list_users(&query, BASE_URL).await.unwrap();
        assert_eq!(page.total_results, 4);
        assert!(page.items_per_page <= 2);
        assert_eq!(page.items_per_page, page.resources.len());
        if page.resources.is_empty() {
            break;
        }
        start_index += page.resources.len();
        collected.extend(page.resources);
    }

    assert_eq!(collected.len(), 4);
    // Stable ordering by creation time
    assert_eq!(collected[0].user_name, "root@example.com");
    assert_eq!(collected[3].user_name, "alan@example.com");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Walking successive pages covers every record exactly once, and no
    /// page exceeds the requested count.
    #[test]
    fn pages_partition_any_directory(user_count in 0usize..25, count in 1usize..8) {
        tokio_test::block_on(async {
            let store = InMemoryDirectory::new();
            for i in 0..user_count {
                store
                    .insert_user(user(
                        &format!("u{i}"),
                        &format!("user{i}@example.com"),
                        "Some User",
                        UserRole::User,
                        1_700_000_000 + i as i64,
                    ))
                    .await;
            }
            let service = ScimService::new(store);

            let mut seen = 0usize;
            let mut start_index = 1usize;
            loop {
                let query = ListQuery::new().with_start_index(start_index).with_count(count);
                let page = service.list_users(&query, BASE_URL).await.unwrap();
                assert_eq!(page.total_results, user_count);
                assert!(page.items_per_page <= count);
                if page.items_per_page == 0 {
                    break;
                }
                seen += page.items_per_page;
                start_index += page.items_per_page;
            }
            assert_eq!(seen, user_count);
        });
    }
}

#[tokio::test]
async fn out_of_range_page_is_empty_not_an_error() {
    let service = seeded_service().await;
    let query = ListQuery::new().with_start_index(100);
    let page = service.list_users(&query, BASE_URL).await.unwrap();
    assert_eq!(page.total_results, 4);
    assert_eq!(page.items_per_page, 0);
    assert!(page.resources.is_empty());
    assert_eq!(page.start_index, 100);
}

#[tokio::test]
async fn filter_matches_exact_email() {
    let service = seeded_service().await;
    let query = ListQuery::new().with_filter("userName eq \"ada@example.com\"");
    let page = service.list_users(&query, BASE_URL).await.unwrap();
    assert_eq!(page.total_results, 1);
    assert_eq!(page.resources[0].id, "u1");

    let query = ListQuery::new().with_filter("userName eq \"nobody@example.com\"");
    let page = service.list_users(&query, BASE_URL).await.unwrap();
    assert_eq!(page.total_results, 0);
}

#[tokio::test]
async fn unsupported_filters_and_sorting_are_rejected() {
    let service = seeded_service().await;

    let query = ListQuery::new().with_filter("displayName eq \"Ada\"");
    let error = service.list_users(&query, BASE_URL).await.unwrap_err();
    assert_eq!(error.scim_type(), "notImplemented");

    let query = ListQuery::new().with_filter("userName eq \"a\" and active eq true");
    assert!(service.list_users(&query, BASE_URL).await.is_err());

    let mut query = ListQuery::new();
    query.sort_by = Some("userName".to_string());
    let error = service.list_users(&query, BASE_URL).await.unwrap_err();
    assert_eq!(error.status(), 501);
}

#[tokio::test]
async fn create_returns_location_and_projects_active() {
    let service = seeded_service().await;
    let created = service
        .create_user(&minimal_user("new@example.com", "New Person", true), BASE_URL)
        .await
        .unwrap();

    assert!(!created.resource.id.is_empty());
    assert_eq!(
        created.location,
        format!("{BASE_URL}/Users/{}", created.resource.id)
    );
    assert!(created.resource.active);
    assert_eq!(created.resource.user_name, "new@example.com");

    let stored = service
        .store()
        .find_user_by_id(&created.resource.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, UserRole::User);
    assert_eq!(stored.name, "New Person");
}

#[tokio::test]
async fn create_inactive_user_lands_on_pending() {
    let service = seeded_service().await;
    let created = service
        .create_user(&minimal_user("idle@example.com", "Idle", false), BASE_URL)
        .await
        .unwrap();
    assert!(!created.resource.active);

    let stored = service
        .store()
        .find_user_by_id(&created.resource.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, UserRole::Pending);
}

#[tokio::test]
async fn duplicate_email_is_a_uniqueness_conflict() {
    let service = seeded_service().await;
    let error = service
        .create_user(&minimal_user("ada@example.com", "Imposter", true), BASE_URL)
        .await
        .unwrap_err();
    assert_eq!(error.status(), 409);
    assert_eq!(error.scim_type(), "uniqueness");
    assert_eq!(service.store().write_stats().user_creates, 0);
}

#[tokio::test]
async fn replace_keeps_elevated_roles_across_round_trips() {
    let service = seeded_service().await;

    // PUT back what a GET returned: the admin must stay an admin
    let wire = service.get_user("admin-1", BASE_URL).await.unwrap();
    let replaced = service.replace_user("admin-1", &wire, BASE_URL).await.unwrap();
    assert!(replaced.active);
    let stored = service
        .store()
        .find_user_by_id("admin-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, UserRole::Admin);

    // Deactivating via PUT parks the account on pending
    let mut wire = service.get_user("admin-1", BASE_URL).await.unwrap();
    wire.active = false;
    service.replace_user("admin-1", &wire, BASE_URL).await.unwrap();
    let stored = service
        .store()
        .find_user_by_id("admin-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, UserRole::Pending);
}

#[tokio::test]
async fn replace_with_mismatched_id_is_a_bad_request() {
    let service = seeded_service().await;
    let mut wire = service.get_user("u1", BASE_URL).await.unwrap();
    wire.id = "someone-else".to_string();
    let error = service.replace_user("u1", &wire, BASE_URL).await.unwrap_err();
    assert_eq!(error.status(), 400);
}

#[tokio::test]
async fn patch_active_toggles_the_role() {
    let service = seeded_service().await;

    // Deactivate an active user
    let result = service
        .patch_user(
            "u1",
            &patch(vec![("replace", Some("active"), Some(json!(false)))]),
            BASE_URL,
        )
        .await
        .unwrap();
    assert!(!result.active);
    let stored = service.store().find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::Pending);

    // Reactivate: pending promotes to plain user
    service
        .patch_user(
            "u1",
            &patch(vec![("replace", Some("active"), Some(json!(true)))]),
            BASE_URL,
        )
        .await
        .unwrap();
    let stored = service.store().find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::User);
}

#[tokio::test]
async fn patch_active_true_on_admin_changes_nothing() {
    let service = seeded_service().await;
    let result = service
        .patch_user(
            "admin-1",
            &patch(vec![("replace", Some("active"), Some(json!(true)))]),
            BASE_URL,
        )
        .await
        .unwrap();

    // Success with the canonical representation, and no write happened
    assert!(result.active);
    assert_eq!(service.store().write_stats().user_updates, 0);
    let stored = service
        .store()
        .find_user_by_id("admin-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, UserRole::Admin);
}

#[tokio::test]
async fn patch_username_checks_uniqueness() {
    let service = seeded_service().await;

    let error = service
        .patch_user(
            "u1",
            &patch(vec![(
                "replace",
                Some("userName"),
                Some(json!("grace@example.com")),
            )]),
            BASE_URL,
        )
        .await
        .unwrap_err();
    assert_eq!(error.scim_type(), "uniqueness");

    let result = service
        .patch_user(
            "u1",
            &patch(vec![(
                "replace",
                Some("userName"),
                Some(json!("countess@example.com")),
            )]),
            BASE_URL,
        )
        .await
        .unwrap();
    assert_eq!(result.user_name, "countess@example.com");
}

#[tokio::test]
async fn patch_with_wrong_value_type_is_a_bad_request() {
    let service = seeded_service().await;
    let error = service
        .patch_user(
            "u1",
            &patch(vec![("replace", Some("active"), Some(json!("yes")))]),
            BASE_URL,
        )
        .await
        .unwrap_err();
    assert_eq!(error.status(), 400);
    assert_eq!(error.scim_type(), "invalidValue");
}

#[tokio::test]
async fn unsupported_operation_aborts_before_any_write() {
    let service = seeded_service().await;
    let error = service
        .patch_user(
            "u1",
            &patch(vec![
                ("replace", Some("active"), Some(json!(false))),
                ("add", Some("emails"), Some(json!([{"value": "x@y"}]))),
            ]),
            BASE_URL,
        )
        .await
        .unwrap_err();

    assert_eq!(error.scim_type(), "notImplemented");
    // The valid first operation must not have been applied
    assert_eq!(service.store().write_stats().user_updates, 0);
    let stored = service.store().find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::User);
}

#[tokio::test]
async fn patch_unknown_user_is_not_found() {
    let service = seeded_service().await;
    let error = service
        .patch_user(
            "ghost",
            &patch(vec![("replace", Some("active"), Some(json!(true)))]),
            BASE_URL,
        )
        .await
        .unwrap_err();
    assert_eq!(error.status(), 404);
}

#[tokio::test]
async fn delete_removes_the_user() {
    let service = seeded_service().await;
    service.delete_user("u2").await.unwrap();

    let error = service.get_user("u2", BASE_URL).await.unwrap_err();
    assert_eq!(error.status(), 404);

    let error = service.delete_user("u2").await.unwrap_err();
    assert_eq!(error.status(), 404);
}

#[tokio::test]
async fn wire_output_defaults_last_modified_to_created() {
    let service = seeded_service().await;
    let wire = service.get_user("u1", BASE_URL).await.unwrap();
    let meta = wire.meta.unwrap();
    assert_eq!(meta.created, meta.last_modified);
    assert_eq!(
        meta.location.as_deref(),
        Some(format!("{BASE_URL}/Users/u1").as_str())
    );
}
