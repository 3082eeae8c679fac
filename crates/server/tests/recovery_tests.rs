//! Integration tests for storage failure recovery.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use invoicer_database::repos::ProjectRepo;
use std::time::Duration;

async fn break_table(server: &TestServer, cookie: Option<&str>, table: &str) {
    let tenant = cookie.map(TestServer::tenant_of);
    let mut session = server.session(tenant.as_ref()).await;
    sqlx::query(&format!("DROP TABLE {table}"))
        .execute(session.conn())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_operational_error_recreates_and_retries() {
    let server = TestServer::demo().await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);

    break_table(&server, Some(&cookie), "project").await;

    let response = server.get("/?page=1", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/?page=1"));
    assert_eq!(server.proxy.recreate_calls(), vec![Some(tenant.clone())]);

    // The retry finds a fresh schema.
    let response = server.get("/?page=1", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(server.proxy.recreate_calls().len(), 1);
}

#[tokio::test]
async fn test_recreate_wipes_existing_data() {
    let server = TestServer::demo().await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);

    let response = server
        .post_form("/projects", "name=Before+the+crash", Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    break_table(&server, Some(&cookie), "invoice").await;

    let project_id = server
        .session(Some(&tenant))
        .await
        .list_projects()
        .await
        .unwrap()[0]
        .id;
    let response = server
        .get(&format!("/projects/{project_id}"), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let mut session = server.session(Some(&tenant)).await;
    assert!(session.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_static_deployment_passes_error_through() {
    let server = TestServer::local().await;
    break_table(&server, None, "project").await;

    let response = server.get("/", None).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.contains("database_error"), "{}", response.body);
    assert!(server.proxy.recreate_calls().is_empty());
}

#[tokio::test]
async fn test_over_quota_redirects_to_limit_page() {
    let server = TestServer::demo().await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);

    let path = server.tenant_path(&tenant);
    tokio::fs::write(&path, vec![0u8; 10 * 1024 * 1024])
        .await
        .unwrap();

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/db-limit-exceeded"));
    assert!(server.proxy.recreate_calls().is_empty());

    // The confirmation page needs no database.
    let response = server.get("/db-limit-exceeded", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("<form action=\"/db-limit-exceeded\""));
}

#[tokio::test]
async fn test_wipe_restores_access() {
    let server = TestServer::demo().await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);

    tokio::fs::write(server.tenant_path(&tenant), vec![0u8; 10 * 1024 * 1024])
        .await
        .unwrap();
    assert_eq!(
        server.get("/", Some(&cookie)).await.location.as_deref(),
        Some("/db-limit-exceeded")
    );

    let response = server.post_form("/db-limit-exceeded", "", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));
    assert_eq!(server.proxy.recreate_calls(), vec![Some(tenant.clone())]);

    let size = tokio::fs::metadata(server.tenant_path(&tenant))
        .await
        .unwrap()
        .len();
    assert!(size < 10 * 1024 * 1024);

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_wipe_unsupported_in_static_deployment() {
    let server = TestServer::local().await;
    let response = server.post_form("/db-limit-exceeded", "", None).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        response.body.contains("unsupported_operation"),
        "{}",
        response.body
    );
}

#[tokio::test]
async fn test_other_tenants_unaffected_by_recovery() {
    let server = TestServer::demo().await;
    let alice = server.new_visitor().await;
    let bob = server.new_visitor().await;

    server.post_form("/projects", "name=Bob", Some(&bob)).await;
    break_table(&server, Some(&alice), "project").await;

    assert_eq!(
        server.get("/", Some(&alice)).await.status,
        StatusCode::SEE_OTHER
    );
    let response = server.get("/", Some(&bob)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Bob"));
}

#[tokio::test]
async fn test_connection_contention_keeps_data() {
    let server = TestServer::demo_with_acquire_timeout(Duration::from_millis(300)).await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);
    server
        .post_form("/projects", "name=Precious", Some(&cookie))
        .await;

    // The tenant's only connection is checked out for the whole request.
    let held = server.session(Some(&tenant)).await;
    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.body.contains("database_busy"), "{}", response.body);
    assert!(response.location.is_none());
    assert!(server.proxy.recreate_calls().is_empty());
    drop(held);

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Precious"));
}

#[tokio::test]
async fn test_corrupt_file_recreated_via_redirect() {
    let server = TestServer::demo().await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);
    server
        .post_form("/projects", "name=Doomed", Some(&cookie))
        .await;

    std::fs::write(server.tenant_path(&tenant), vec![0xA5u8; 4096]).unwrap();

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));
    assert_eq!(server.proxy.recreate_calls(), vec![Some(tenant.clone())]);

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("Doomed"));
}

#[tokio::test]
async fn test_deleted_file_reopened() {
    let server = TestServer::demo().await;
    let cookie = server.new_visitor().await;
    let tenant = TestServer::tenant_of(&cookie);
    server
        .post_form("/projects", "name=Gone", Some(&cookie))
        .await;

    let path = server.tenant_path(&tenant);
    std::fs::remove_file(&path).unwrap();

    let response = server.get("/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("Gone"));
    assert!(path.exists());
    assert!(server.proxy.recreate_calls().is_empty());

    let response = server
        .post_form("/projects", "name=Again", Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(server.get("/", Some(&cookie)).await.body.contains("Again"));
}
