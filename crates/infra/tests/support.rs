#![allow(dead_code)]

use std::sync::Arc;

use dirmirror_core::{DirectoryClient, SyncService, UserCache, UserService};
use dirmirror_domain::{RemoteConfig, SyncConfig};
use dirmirror_infra::database::{DbManager, SqliteUserCache};
use dirmirror_infra::directory::DirectoryApiClient;
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PREFIX: &str = "/api/v1";

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub cache: Arc<SqliteUserCache>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the schema applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("mirror.db");

        let manager = Arc::new(DbManager::new(&db_path, 4).expect("db manager should be created"));
        manager.run_migrations().expect("schema migrations should apply");
        let cache = Arc::new(SqliteUserCache::new(Arc::clone(&manager)));

        Self { manager, cache, _temp_dir: temp_dir }
    }

    pub fn cache_port(&self) -> Arc<dyn UserCache> {
        self.cache.clone()
    }

    /// Count rows of `table` directly.
    pub fn row_count(&self, table: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), &[], |row| row.get(0))
            .expect("count query should succeed")
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory client pointed at the mock server.
pub fn directory(server: &MockServer) -> Arc<dyn DirectoryClient> {
    let config = RemoteConfig {
        base_url: format!("{}{API_PREFIX}", server.uri()),
        api_token: "test-token".into(),
        ..RemoteConfig::default()
    };
    Arc::new(DirectoryApiClient::from_config(&config).expect("directory client should build"))
}

pub fn sync_service(server: &MockServer, db: &TestDatabase, workers: usize) -> SyncService {
    SyncService::new(
        directory(server),
        db.cache_port(),
        SyncConfig { workers, ..SyncConfig::default() },
    )
}

pub fn user_service(server: &MockServer, db: &TestDatabase) -> UserService {
    UserService::new(directory(server), db.cache_port())
}

/// URL of collection page `cursor`, as the directory would put in a next link.
pub fn page_url(server: &MockServer, cursor: &str) -> String {
    format!("{}{API_PREFIX}/users?after={cursor}&limit=200", server.uri())
}

/// Serve `body` for the first collection page, linking to `next` if given.
pub async fn mount_first_page(server: &MockServer, body: Value, next: Option<&str>) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/users")))
        .and(query_param_is_missing("after"))
        .respond_with(page_response(body, next))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `body` for the page whose cursor is `cursor`.
pub async fn mount_page(server: &MockServer, cursor: &str, body: Value, next: Option<&str>) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/users")))
        .and(query_param("after", cursor))
        .respond_with(page_response(body, next))
        .expect(1)
        .mount(server)
        .await;
}

fn page_response(body: Value, next: Option<&str>) -> ResponseTemplate {
    let response = ResponseTemplate::new(200).set_body_json(body);
    match next {
        Some(url) => response.insert_header("link", format!("<{url}>; rel=\"next\"").as_str()),
        None => response,
    }
}
