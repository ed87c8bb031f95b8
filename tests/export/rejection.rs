//! Requests that must be refused without leaving anything on disk.

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use dbexport_durability::{CapacityGuard, FixedFreeSpace};
use dbexport_server::{configure, AppState, ExportOrchestrator, CSRF_COOKIE, DEFAULT_CHUNK_SIZE};

use crate::common::*;

fn get(uri: &str, csrf: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .cookie(Cookie::new(CSRF_COOKIE, csrf.to_string()))
}

fn state(orchestrator: ExportOrchestrator) -> web::Data<AppState> {
    web::Data::new(AppState::new(orchestrator, DEFAULT_CHUNK_SIZE))
}

#[actix_web::test]
async fn test_bad_signature() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(state(env.orchestrator())).configure(configure)).await;

    for uri in [
        "/data/-/export-database?s=bad",
        "/data/-/export-database?s=",
        "/data/-/export-database",
    ] {
        let resp = test::call_service(&app, get(uri, "csrf").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(test::read_body(resp).await, "Bad signature");
    }
    assert!(artifact_names(&env.export_dir).is_empty());
}

#[actix_web::test]
async fn test_token_from_another_session() {
    let env = TestEnv::new();
    let orchestrator = env.orchestrator();
    let token = orchestrator.authorizer().mint("data", "session-one");
    let app = test::init_service(App::new().app_data(state(orchestrator)).configure(configure)).await;

    let uri = format!("/data/-/export-database?s={}", token);
    let resp = test::call_service(&app, get(&uri, "session-two").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        test::read_body(resp).await,
        "Signature csrftoken did not match"
    );

    // No csrf cookie at all
    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        test::read_body(resp).await,
        "Signature csrftoken did not match"
    );
    assert!(artifact_names(&env.export_dir).is_empty());
}

#[actix_web::test]
async fn test_token_for_another_database() {
    let env = TestEnv::new();
    let orchestrator = env.orchestrator();
    let token = orchestrator.authorizer().mint("other", "csrf");
    let app = test::init_service(App::new().app_data(state(orchestrator)).configure(configure)).await;

    let uri = format!("/data/-/export-database?s={}", token);
    let resp = test::call_service(&app, get(&uri, "csrf").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(test::read_body(resp).await, "Bad signature");
}

#[actix_web::test]
async fn test_expired_token() {
    let env = TestEnv::new();
    let orchestrator = env.orchestrator_with_max_age(Some(Duration::from_secs(3600)));
    let token = orchestrator.authorizer().mint_at(
        "data",
        "csrf",
        Utc::now() - chrono::Duration::hours(2),
    );
    let app = test::init_service(App::new().app_data(state(orchestrator)).configure(configure)).await;

    let uri = format!("/data/-/export-database?s={}", token);
    let resp = test::call_service(&app, get(&uri, "csrf").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(test::read_body(resp).await, "Signature expired");
}

#[actix_web::test]
async fn test_unknown_and_in_memory_databases() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(state(env.orchestrator())).configure(configure)).await;

    let resp = test::call_service(&app, get("/nope/-/export-database?s=x", "csrf").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(test::read_body(resp).await, "Database not found: nope");

    let resp = test::call_service(&app, get("/memory/-/export-database?s=x", "csrf").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        test::read_body(resp).await,
        dbexport_core::ExportError::NotExportable.to_string()
    );
}

#[actix_web::test]
async fn test_not_enough_space() {
    let env = TestEnv::new();
    let orchestrator = env
        .orchestrator()
        .with_capacity(CapacityGuard::new(Arc::new(FixedFreeSpace(20))));
    let token = orchestrator.authorizer().mint("data", "csrf");
    let app = test::init_service(App::new().app_data(state(orchestrator)).configure(configure)).await;

    let uri = format!("/data/-/export-database?s={}", token);
    let resp = test::call_service(&app, get(&uri, "csrf").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        test::read_body(resp).await,
        format!(
            "Not enough space in {} to export this database",
            env.export_dir.display()
        )
    );
    assert!(artifact_names(&env.export_dir).is_empty());
}

#[actix_web::test]
async fn test_corrupt_source_reports_snapshot_error() {
    let env = TestEnv::new();
    std::fs::write(&env.source, vec![b'x'; 8192]).unwrap();
    let orchestrator = env.orchestrator();
    let token = orchestrator.authorizer().mint("data", "csrf");
    let app = test::init_service(App::new().app_data(state(orchestrator)).configure(configure)).await;

    let uri = format!("/data/-/export-database?s={}", token);
    let resp = test::call_service(&app, get(&uri, "csrf").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test::read_body(resp).await;
    assert!(!body.is_empty());
    assert!(artifact_names(&env.export_dir).is_empty());
}
