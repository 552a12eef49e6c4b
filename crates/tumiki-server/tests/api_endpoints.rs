use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use time::macros::datetime;
use tokio::task::JoinHandle;
use tumiki_auth::password::hash_password;
use tumiki_core::ManualClock;
use tumiki_db_memory::InMemoryDocumentStore;
use tumiki_server::config::{AppConfig, StorageBackend};
use tumiki_server::{AppState, build_app};
use tumiki_storage::{Document, DocumentStore, FieldFilter, Record, StorageResult};

const AFFILIATION: &str = "株式会社ネクストステージ";

struct TestServer {
    base: String,
    store: Arc<InMemoryDocumentStore>,
    clock: Arc<ManualClock>,
    client: reqwest::Client,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .unwrap()
    }

    async fn token(&self, username: &str, password: &str) -> String {
        let body: Value = self.login(username, password).await.json().await.unwrap();
        body["token"].as_str().expect("token in login response").to_string()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn record(v: Value) -> Record {
    v.as_object().cloned().expect("object")
}

fn seed(store: &InMemoryDocumentStore) {
    store.insert(
        "employees",
        "alice",
        record(json!({
            "password": hash_password("pw123").unwrap(),
            "name": "Alice",
            "role": "admin",
            "permission": ["all"],
            "affiliation": AFFILIATION
        })),
    );
    store.insert(
        "employees",
        "bob",
        record(json!({
            "password": hash_password("pw456").unwrap(),
            "name": "Bob",
            "role": "staff",
            "affiliation": AFFILIATION
        })),
    );
    store.insert(
        "employees",
        "carol",
        record(json!({"name": "Carol", "role": "staff", "affiliation": "elsewhere"})),
    );

    store.insert(
        "users",
        "5",
        record(json!({"name": "Sato", "mobilitySupport": {"availableTime": "20"}})),
    );
    store.insert(
        "users",
        "6",
        record(json!({"name": "Suzuki", "behaviorSupport": {"availableTime": ""}})),
    );
    store.insert(
        "monthly_hours",
        "user_5_2025-10",
        record(json!({"mobilitySupport": {"remaining": 12}})),
    );
}

/// Serves `app` on an ephemeral port until the sender fires.
async fn serve(app: axum::Router) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });
    (format!("http://{addr}"), tx, handle)
}

async fn start_server() -> TestServer {
    let store = InMemoryDocumentStore::shared();
    seed(&store);

    let mut config = AppConfig::default();
    config.auth.jwt_secret = "api-test-secret".into();
    config.storage.backend = StorageBackend::Memory;

    let clock = Arc::new(ManualClock::new(datetime!(2025-10-15 09:00 UTC)));
    let state = AppState::new(config, store.clone(), clock.clone()).expect("state");
    let (base, tx, handle) = serve(build_app(state)).await;

    TestServer {
        base,
        store,
        clock,
        client: reqwest::Client::new(),
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

#[tokio::test]
async fn health_unknown_routes_and_request_ids() {
    let srv = start_server().await;

    let resp = srv.client.get(srv.url("/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "status": "ok", "backend": "memory"}));

    let resp = srv
        .client
        .get(srv.url("/api/nothing-here"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.headers()["x-request-id"], "req-123");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Unknown endpoint"}));

    // Known path, unsupported method
    let resp = srv.client.put(srv.url("/api/data")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    srv.stop().await;
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let srv = start_server().await;

    let resp = srv
        .client
        .request(reqwest::Method::OPTIONS, srv.url("/api/records"))
        .header("origin", "https://recorder.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,authorization")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-max-age"], "86400");
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("DELETE"));

    srv.stop().await;
}

#[tokio::test]
async fn login_succeeds_and_failures_are_uniform() {
    let srv = start_server().await;

    let resp = srv.login("alice", "pw123").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| t.split('.').count() == 3));
    assert_eq!(body["user"]["id"], "alice");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["affiliation"], AFFILIATION);
    assert!(body["user"].get("password").is_none());

    let wrong = srv.login("alice", "wrong").await;
    assert_eq!(wrong.status(), 401);
    let wrong: Value = wrong.json().await.unwrap();

    let unknown = srv.login("mallory", "pw123").await;
    assert_eq!(unknown.status(), 401);
    let unknown: Value = unknown.json().await.unwrap();

    assert_eq!(wrong, unknown);
    assert_eq!(wrong, json!({"success": false, "error": "Invalid username or password"}));

    // Account without a password hash behaves like an unknown one
    let no_hash = srv.login("carol", "anything").await;
    assert_eq!(no_hash.status(), 401);

    let missing = srv
        .client
        .post(srv.url("/api/auth/login"))
        .json(&json!({"username": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);

    srv.stop().await;
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let srv = start_server().await;

    for path in ["/api/data", "/api/auth/me", "/api/records/5/2025-10-01"] {
        let resp = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 401, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
    }

    let resp = srv
        .client
        .get(srv.url("/api/data"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let token = srv.token("bob", "pw456").await;
    let me: Value = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["user"]["id"], "bob");
    assert_eq!(me["user"]["role"], "staff");

    srv.stop().await;
}

#[tokio::test]
async fn app_data_is_served_from_cache_on_repeat() {
    let srv = start_server().await;
    let token = srv.token("alice", "pw123").await;
    let get_data = || srv.client.get(srv.url("/api/data")).bearer_auth(&token).send();

    srv.store.reset_stats();
    let first: Value = get_data().await.unwrap().json().await.unwrap();
    let after_first = srv.store.stats();
    assert!(after_first.total() > 0);

    let second: Value = get_data().await.unwrap().json().await.unwrap();
    let after_second = srv.store.stats();
    assert_eq!(after_second, after_first, "second read must not reach the store");
    assert_eq!(first, second);

    assert_eq!(first["success"], true);
    let users = first["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], "5");
    assert_eq!(first["supporters"], json!(["Alice", "Bob"]));
    assert_eq!(first["supportTypes"], json!(["移動支援", "行動援護", "通院等介助"]));
    assert_eq!(first["appearances"].as_array().map(Vec::len), Some(10));
    assert_eq!(
        first["monthlyHours"],
        json!({"5": {
            "behaviorSupport": {},
            "mobilitySupport": {"remaining": 12},
            "hospitalSupport": {}
        }})
    );

    srv.stop().await;
}

#[tokio::test]
async fn saving_the_same_slot_twice_reuses_the_document() {
    let srv = start_server().await;
    let token = srv.token("bob", "pw456").await;
    let form = json!({
        "userId": "5",
        "userName": "Sato",
        "date": "2025-10-01",
        "startTime": "09:00",
        "endTime": "10:00",
        "serviceType": "移動支援",
        "destination": "図書館",
        "staff1": "Bob"
    });

    let post = || {
        srv.client
            .post(srv.url("/api/records"))
            .bearer_auth(&token)
            .json(&form)
            .send()
    };

    let first: Value = post().await.unwrap().json().await.unwrap();
    assert_eq!(first["success"], true);
    assert_eq!(first["isDuplicate"], false);
    let id = first["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(first["data"]["serviceName"], "移動支援 - 図書館");
    assert_eq!(first["data"]["fileName"], "tumiki-recorder");
    assert_eq!(first["data"]["importedAt"], "2025-10-15T09:00:00Z");

    let second: Value = post().await.unwrap().json().await.unwrap();
    assert_eq!(second["isDuplicate"], true);
    assert_eq!(second["data"]["id"], id.as_str());
    assert_eq!(srv.store.len("csv-schedules"), 1);

    let listed: Value = srv
        .client
        .get(srv.url("/api/records/5/2025-10-01"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let schedules = listed["schedules"].as_array().unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0]["id"], id.as_str());

    let incomplete = srv
        .client
        .post(srv.url("/api/records"))
        .bearer_auth(&token)
        .json(&json!({"userId": "5", "date": "2025-10-01"}))
        .send()
        .await
        .unwrap();
    assert_eq!(incomplete.status(), 400);
    let body: Value = incomplete.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields: startTime, endTime");

    srv.stop().await;
}

#[tokio::test]
async fn records_match_numeric_user_ids() {
    let srv = start_server().await;
    srv.store.insert(
        "csv-schedules",
        "imported-1",
        record(json!({"userId": 7, "date": "2025-10-02", "startTime": "13:00", "endTime": "15:00"})),
    );
    let token = srv.token("bob", "pw456").await;

    let listed: Value = srv
        .client
        .get(srv.url("/api/records/7/2025-10-02"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["schedules"].as_array().map(Vec::len), Some(1));

    srv.stop().await;
}

#[tokio::test]
async fn attendance_punches_are_recorded_and_listed_in_order() {
    let srv = start_server().await;
    let token = srv.token("bob", "pw456").await;

    for (time, kind) in [("18:00", "clock-out"), ("09:00", "clock-in")] {
        let resp = srv
            .client
            .post(srv.url("/api/attendance"))
            .bearer_auth(&token)
            .json(&json!({
                "userId": "bob",
                "userName": "Bob",
                "date": "2025-10-15",
                "time": time,
                "type": kind
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        if kind == "clock-in" {
            assert_eq!(body["message"], "出勤を記録しました");
            assert_eq!(body["data"]["typeName"], "出勤");
            assert_eq!(body["data"]["id"], "bob_2025-10-15_1760518801000");
        }
        srv.clock.advance(Duration::from_secs(1));
    }
    assert_eq!(srv.store.len("attendance"), 2);

    let listed: Value = srv
        .client
        .get(srv.url("/api/attendance/bob/2025-10-15"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = listed["records"].as_array().unwrap();
    let kinds: Vec<&str> = records.iter().filter_map(|r| r["type"].as_str()).collect();
    assert_eq!(kinds, ["clock-in", "clock-out"]);

    let missing = srv
        .client
        .post(srv.url("/api/attendance"))
        .bearer_auth(&token)
        .json(&json!({"userId": "bob", "date": "2025-10-15"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);

    srv.stop().await;
}

#[tokio::test]
async fn cache_admin_routes_require_admin_role() {
    let srv = start_server().await;
    let admin = srv.token("alice", "pw123").await;
    let staff = srv.token("bob", "pw456").await;

    // Warm the cache
    let resp = srv.client.get(srv.url("/api/data")).bearer_auth(&staff).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = srv.client.delete(srv.url("/api/cache")).bearer_auth(&staff).send().await.unwrap();
    assert_eq!(resp.status(), 403);

    let stats: Value = srv
        .client
        .get(srv.url("/api/cache"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["stats"]["size"], 1);

    let resp = srv
        .client
        .delete(srv.url("/api/cache/app-data:2025-10"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "key": "app-data:2025-10", "cleared": true}));

    // The next read goes back to the store
    srv.store.reset_stats();
    srv.client.get(srv.url("/api/data")).bearer_auth(&staff).send().await.unwrap();
    assert!(srv.store.stats().reads() > 0);

    let body: Value = srv
        .client
        .delete(srv.url("/api/cache"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"success": true, "cleared": 1}));

    srv.stop().await;
}

/// Delegates to the in-memory store after a fixed delay on reads.
struct SlowStore {
    inner: Arc<InMemoryDocumentStore>,
    delay: Duration,
}

#[async_trait::async_trait]
impl DocumentStore for SlowStore {
    async fn get_document(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_document(collection, id).await
    }

    async fn query_collection(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> StorageResult<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.query_collection(collection, filters).await
    }

    async fn upsert_document(&self, collection: &str, id: &str, fields: Record) -> StorageResult<()> {
        self.inner.upsert_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StorageResult<()> {
        self.inner.delete_document(collection, id).await
    }

    fn backend_name(&self) -> &'static str {
        "slow-memory"
    }
}

fn memory_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "api-test-secret".into();
    config.storage.backend = StorageBackend::Memory;
    config
}

#[tokio::test]
async fn timed_out_requests_answer_with_json_error() {
    let inner = InMemoryDocumentStore::shared();
    seed(&inner);
    let store = Arc::new(SlowStore {
        inner,
        delay: Duration::from_millis(500),
    });

    let mut config = memory_config();
    config.server.request_timeout_ms = 50;
    let state = AppState::new(config, store, tumiki_core::system_clock()).expect("state");
    let (base, tx, handle) = serve(build_app(state)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"username": "alice", "password": "pw123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.expect("timeout body is JSON");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Request timed out");

    let _ = tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn oversized_bodies_keep_payload_too_large_status() {
    let store = InMemoryDocumentStore::shared();
    seed(&store);
    let mut config = memory_config();
    config.server.body_limit_bytes = 64;
    let state = AppState::new(config, store, tumiki_core::system_clock()).expect("state");
    let (base, tx, handle) = serve(build_app(state)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"username": "alice", "password": "x".repeat(256)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

    let _ = tx.send(());
    let _ = handle.await;
}
