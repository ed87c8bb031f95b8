//! Successful exports and their cleanup.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use dbexport_server::{configure, AppState, CSRF_COOKIE, ACTOR_COOKIE, DEFAULT_CHUNK_SIZE};

use crate::common::*;

#[actix_web::test]
async fn test_link_to_download_round_trip() {
    let env = TestEnv::new();
    let before = artifact_names(&env.export_dir);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(env.orchestrator(), DEFAULT_CHUNK_SIZE)))
            .configure(configure),
    )
    .await;

    // The page shows root a link bound to its session
    let req = test::TestRequest::get()
        .uri("/data")
        .cookie(Cookie::new(CSRF_COOKIE, "session-one"))
        .cookie(Cookie::new(ACTOR_COOKIE, env.root_cookie()))
        .to_request();
    let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let href = page["actions"][0]["href"].as_str().unwrap().to_string();
    let description = page["actions"][0]["description"].as_str().unwrap();
    assert!(description.starts_with("Create and download a snapshot of this SQLite database ("));
    assert!(description.ends_with(" kB)"), "{}", description);

    let req = test::TestRequest::get()
        .uri(&href)
        .cookie(Cookie::new(CSRF_COOKIE, "session-one"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"data-"), "{}", disposition);

    let body = test::read_body(resp).await;
    let downloaded = env.dir.path().join("downloaded.db");
    std::fs::write(&downloaded, &body).unwrap();
    assert_eq!(row_count(&downloaded), ROWS as i64);

    assert_eq!(artifact_names(&env.export_dir), before);
}

#[actix_web::test]
async fn test_concurrent_writes_do_not_tear_snapshot() {
    let env = TestEnv::new();
    let orchestrator = env.orchestrator();
    let token = orchestrator.authorizer().mint("data", "csrf");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(orchestrator, DEFAULT_CHUNK_SIZE)))
            .configure(configure),
    )
    .await;

    let writer = {
        let source = env.source.clone();
        std::thread::spawn(move || {
            let conn = rusqlite::Connection::open(&source).unwrap();
            conn.busy_timeout(std::time::Duration::from_secs(30)).unwrap();
            for _ in 0..200 {
                conn.execute("insert into big (string) values ('x')", [])
                    .unwrap();
            }
        })
    };

    let req = test::TestRequest::get()
        .uri(&format!("/data/-/export-database?s={}", token))
        .cookie(Cookie::new(CSRF_COOKIE, "csrf"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    writer.join().unwrap();

    // A busy source may fail the copy, but never yields a torn file.
    if status == StatusCode::OK {
        let downloaded = env.dir.path().join("downloaded.db");
        std::fs::write(&downloaded, &body).unwrap();
        let rows = row_count(&downloaded);
        assert!(rows >= ROWS as i64 && rows <= ROWS as i64 + 200);
        let check: String = rusqlite::Connection::open(&downloaded)
            .unwrap()
            .query_row("pragma integrity_check", [], |row| row.get(0))
            .unwrap();
        assert_eq!(check, "ok");
    } else {
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert!(artifact_names(&env.export_dir).is_empty());
}

#[actix_web::test]
async fn test_orphans_from_a_crash_are_reaped() {
    use dbexport_durability::sweep;
    use std::time::{Duration, SystemTime};

    let env = TestEnv::new();
    let orphan = env
        .export_dir
        .join(format!("{}data-crashed.db", dbexport_core::ARTIFACT_PREFIX));
    let file = std::fs::File::create(&orphan).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))
        .unwrap();
    drop(file);
    let keep = env.export_dir.join("unrelated.db");
    std::fs::write(&keep, b"x").unwrap();

    let report = sweep(&env.export_dir, Duration::from_secs(3600)).unwrap();
    assert_eq!(report.removed, 1);
    assert!(!orphan.exists());
    assert!(keep.exists());
}
