//! Common test utilities and fixtures for integration tests
//!
//! Every test gets its own in-memory application:
//! - `MemoryStore` entity store
//! - `RecordingQueue`, drained explicitly through the real executor
//! - `MockBlobStore` for uploads
//! - HS256 tokens minted with the test secret

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use depot_app::{build_router, AppParts};
use depot_auth::{AuthBackend, AuthConfig};
use depot_catalog::MockBlobStore;
use depot_common::LockPolicy;
use depot_db::MemoryStore;
use depot_domain::entities::JobOutcome;
use depot_merges::MergeJobExecutor;
use depot_queue::{JobRunner, RecordingQueue};

pub const TEST_JWT_SECRET: &str = "depot_integration_secret";

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub role: &'static str,
}

impl Actor {
    pub fn admin() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: "admin",
        }
    }

    pub fn member() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: "artist",
        }
    }

    pub fn token(&self) -> String {
        create_test_jwt(self, TEST_JWT_SECRET)
    }
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    role: String,
    username: Option<String>,
    exp: u64,
}

pub fn create_test_jwt(actor: &Actor, secret: &str) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as u64;
    let claims = TestClaims {
        sub: actor.id.to_string(),
        role: actor.role.to_string(),
        username: Some(format!("user-{}", &actor.id.to_string()[0..8])),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub queue: RecordingQueue,
    pub blobs: MockBlobStore,
    pub executor: Arc<MergeJobExecutor>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_lock_policy(LockPolicy::LastWriterWins)
    }

    pub fn with_lock_policy(lock_policy: LockPolicy) -> Self {
        let store = MemoryStore::new();
        let queue = RecordingQueue::new();
        let blobs = MockBlobStore::new();
        let executor = Arc::new(MergeJobExecutor::new(Arc::new(store.clone()), None));

        let router = build_router(AppParts {
            store: Arc::new(store.clone()),
            queue: Arc::new(queue.clone()),
            blobs: Arc::new(blobs.clone()),
            auth: AuthBackend::new(AuthConfig {
                jwt_secret: TEST_JWT_SECRET.to_string(),
                issuer: None,
                audience: None,
            }),
            lock_policy,
        });

        Self {
            router,
            store,
            queue,
            blobs,
            executor,
        }
    }

    /// Run every dispatched job through the executor, in dispatch order
    pub async fn run_dispatched(&self) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        for job_id in self.queue.drain() {
            outcomes.push(self.executor.run(job_id).await.unwrap());
        }
        outcomes
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        actor: &Actor,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", actor.token()));
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, actor: &Actor) -> (StatusCode, Value) {
        self.call(Method::GET, uri, actor, None).await
    }

    pub async fn post(&self, uri: &str, actor: &Actor, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, actor, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, actor: &Actor, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, actor, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, actor: &Actor) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, actor, None).await
    }
}

/// Project with a main and a feature branch
#[allow(dead_code)]
pub struct ProjectFixture {
    pub admin: Actor,
    pub artist: Actor,
    pub project_id: Uuid,
    pub main_branch: Uuid,
    pub feature_branch: Uuid,
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"].as_str().unwrap().parse().unwrap()
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap()
}

impl ProjectFixture {
    pub async fn create(app: &TestApp) -> Self {
        let admin = Actor::admin();
        let artist = Actor::member();

        let (status, project) = app
            .post(
                "/v1/projects",
                &admin,
                serde_json::json!({ "name": "Harbor", "code": "HBR" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let project_id = id_of(&project);

        let branches = format!("/v1/projects/{}/branches", project_id);
        let (status, main) = app
            .post(&branches, &artist, serde_json::json!({ "name": "main" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let main_branch = id_of(&main);

        let (status, feature) = app
            .post(
                &branches,
                &artist,
                serde_json::json!({ "name": "feature", "parent_branch_id": main_branch }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        Self {
            admin,
            artist,
            project_id,
            main_branch,
            feature_branch: id_of(&feature),
        }
    }

    /// Workspace owned by the artist on the feature branch
    pub async fn workspace(&self, app: &TestApp) -> Uuid {
        let (status, workspace) = app
            .post(
                "/v1/workspaces",
                &self.artist,
                serde_json::json!({
                    "project_id": self.project_id,
                    "branch_id": self.feature_branch,
                    "name": "lighting",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        id_of(&workspace)
    }

    /// Asset with one version; returns (asset_id, version_id)
    pub async fn asset_with_version(&self, app: &TestApp, name: &str) -> (Uuid, Uuid) {
        let (status, asset) = app
            .post(
                "/v1/assets",
                &self.artist,
                serde_json::json!({
                    "project_id": self.project_id,
                    "name": name,
                    "type": "texture",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let asset_id = id_of(&asset);

        let (status, version) = app
            .post(
                &format!("/v1/assets/{}/versions", asset_id),
                &self.artist,
                serde_json::json!({ "version_number": 1, "branch_id": self.feature_branch }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (asset_id, id_of(&version))
    }
}
