//! End-to-end sync passes: wiremock directory, real SQLite cache.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dirmirror_core::{SyncObserver, SyncService, UserCache};
use dirmirror_domain::{MirrorError, PageRequest, SyncConfig, SyncPhase};
use serde_json::json;
use support::{directory, mount_first_page, mount_page, page_url, sync_service, TestDatabase};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct PageCounter {
    pages: AtomicUsize,
}

impl SyncObserver for PageCounter {
    fn on_fetch_progress(&self, pages: usize, _records: usize) {
        self.pages.store(pages, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn two_page_scenario_mirrors_both_users() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();

    let second = page_url(&server, "u1");
    mount_first_page(&server, json!([{"id": "u1", "profile": {"firstName": "A"}}]), Some(&second))
        .await;
    mount_page(&server, "u1", json!([{"id": "u2", "profile": {"firstName": "B"}}]), None).await;

    let observer = Arc::new(PageCounter::default());
    let service = sync_service(&server, &db, 1).with_observer(observer.clone());
    let report = service.run().await.expect("sync pass should succeed");

    assert_eq!(report.fetched, 2);
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed(), 0);
    assert_eq!(observer.pages.load(Ordering::SeqCst), 2);
    assert_eq!(service.phase(), SyncPhase::Completed { synced: 2, failed: 0, skipped: 0 });

    let u1 = db.cache.get_by_id("u1").await.unwrap().expect("u1 should be cached");
    assert_eq!(u1.profile.first_name.as_deref(), Some("A"));

    let page = db.cache.list(PageRequest::new(1, 10).unwrap()).await.unwrap();
    assert_eq!(page.total_users, 2);

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_on_second_page_writes_nothing() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();

    let second = page_url(&server, "u1");
    mount_first_page(&server, json!([{"id": "u1"}]), Some(&second)).await;
    Mock::given(method("GET"))
        .and(query_param("after", "u1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let service = sync_service(&server, &db, 1);
    let err = service.run().await.unwrap_err();

    assert!(matches!(err, MirrorError::RemoteUnavailable(msg) if msg.contains("503")));
    assert_eq!(service.phase(), SyncPhase::FetchFailed);
    assert_eq!(db.row_count("user"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_records_are_counted_not_fatal() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();

    mount_first_page(
        &server,
        json!([
            {"id": "u1", "type": {"id": "oty1"}},
            {"status": "ACTIVE"},
            {"id": "u3", "profile": {"firstName": 7}},
            {"id": "u4", "profile": {"reportGroupList": "north", "ackNewBusiness": 1}},
            {"id": "u5"}
        ]),
        None,
    )
    .await;

    let report = sync_service(&server, &db, 1).run().await.unwrap();

    assert_eq!(report.synced, 3);
    assert_eq!(report.failed(), 2);
    assert!(report.is_balanced());
    let failed: Vec<_> = report.failures.iter().map(|f| (f.index, f.id.clone())).collect();
    assert_eq!(failed, vec![(1, None), (2, Some("u3".to_string()))]);
    assert!(report.failures.iter().all(|f| matches!(f.error, MirrorError::Validation(_))));

    assert_eq!(db.cache.count().await.unwrap(), 3);
    let u4 = db.cache.get_by_id("u4").await.unwrap().unwrap();
    assert_eq!(u4.profile.report_group_list, Some(vec!["north".to_string()]));
    assert_eq!(u4.profile.ack_new_business, Some(true));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_directory_is_a_successful_empty_pass() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();
    mount_first_page(&server, json!([]), None).await;

    let report = sync_service(&server, &db, 1).run().await.unwrap();

    assert!(report.source_was_empty());
    assert_eq!(db.cache.count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_pass_converges_and_keeps_local_extras() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();

    db.cache
        .upsert(&dirmirror_domain::User { id: "stale".into(), ..Default::default() })
        .await
        .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "u1", "status": "ACTIVE", "profile": {"email": "a@example.com"}},
            {"id": "u2", "status": "ACTIVE"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let service = sync_service(&server, &db, 1);
    service.run().await.unwrap();
    let first = db.cache.list(PageRequest::new(1, 10).unwrap()).await.unwrap();
    service.run().await.unwrap();
    let second = db.cache.list(PageRequest::new(1, 10).unwrap()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.total_users, 3);
    assert_eq!(db.row_count("profile"), 3);
    assert!(db.cache.get_by_id("stale").await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_workers_write_every_record() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();

    let users: Vec<_> = (0..40)
        .map(|n| json!({"id": format!("u{n:02}"), "type": {"id": format!("oty{}", n % 3)}}))
        .collect();
    mount_first_page(&server, json!(users), None).await;

    let report = sync_service(&server, &db, 4).run().await.unwrap();

    assert_eq!(report.synced, 40);
    assert_eq!(db.cache.count().await.unwrap(), 40);
    assert_eq!(db.row_count("user_type"), 3);
    assert_eq!(db.manager.metrics().writes_committed, 40);
}

#[tokio::test(flavor = "multi_thread")]
async fn write_that_misses_its_deadline_leaves_nothing_cached() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();
    mount_first_page(&server, json!([{"id": "u1", "profile": {"firstName": "A"}}]), None).await;

    // Another process holds the write lock for longer than the deadline but
    // shorter than the busy timeout, so the upsert eventually gets in late.
    let outside = rusqlite::Connection::open(db.manager.path()).unwrap();
    outside.execute_batch("BEGIN IMMEDIATE").unwrap();
    let holder = thread::spawn(move || {
        thread::sleep(Duration::from_secs(2));
        outside.execute_batch("COMMIT").unwrap();
    });

    let service = SyncService::new(
        directory(&server),
        db.cache_port(),
        SyncConfig { write_timeout_secs: 1, ..SyncConfig::default() },
    );
    let report = service.run().await.expect("fetch should succeed");
    holder.join().unwrap();

    assert_eq!(report.synced, 0);
    assert_eq!(report.failed(), 1);
    assert!(matches!(report.failures[0].error, MirrorError::Storage(_)));
    assert!(db.cache.get_by_id("u1").await.unwrap().is_none());
    assert_eq!(db.row_count("user"), 0);
    assert_eq!(db.row_count("profile"), 0);
}
