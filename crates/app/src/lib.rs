//! Asset Depot application composition root
//!
//! Wires config → entity store → job executor → merge queue → domain
//! services, then composes the domain routers into one application.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use depot_auth::{AuthBackend, AuthConfig};
use depot_catalog::{BlobStore, CatalogService, CatalogState, FsBlobStore};
use depot_changelists::{ChangelistService, ChangelistsState};
use depot_common::{Config, LockPolicy, StoreBackend};
use depot_db::{EntityStore, MemoryStore, PgStore};
use depot_merges::{MergeJobExecutor, MergeService, MergesState};
use depot_queue::{JobQueue, JobQueueFactory, JobRunner, QueueConfig};

/// Collaborators the domain services are built from
#[derive(Clone)]
pub struct AppParts {
    pub store: Arc<dyn EntityStore>,
    pub queue: Arc<dyn JobQueue>,
    pub blobs: Arc<dyn BlobStore>,
    pub auth: AuthBackend,
    pub lock_policy: LockPolicy,
}

/// Open the configured entity store, running migrations on Postgres
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn EntityStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
            let store = PgStore::connect(url, config.database_max_connections)
                .await
                .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;
            store
                .migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Database migration failed: {}", e))?;
            tracing::info!("Postgres entity store ready");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory entity store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Create the main application router from environment configuration
pub async fn create_app(config: &Config) -> anyhow::Result<Router> {
    let store = open_store(config).await?;

    let runner: Arc<dyn JobRunner> = Arc::new(MergeJobExecutor::new(
        store.clone(),
        config.automation_user_id,
    ));
    let queue = JobQueueFactory::create(QueueConfig::from_env()?, runner)?;

    let parts = AppParts {
        store,
        queue,
        blobs: Arc::new(FsBlobStore::new(config.asset_storage_path.clone())),
        auth: AuthBackend::new(AuthConfig::from_env()?),
        lock_policy: config.lock_policy,
    };
    tracing::info!(lock_policy = %config.lock_policy, "Application wired");
    Ok(build_router(parts))
}

/// Compose domain routers with shared infrastructure routes
pub fn build_router(parts: AppParts) -> Router {
    let catalog = CatalogState {
        catalog: CatalogService::new(parts.store.clone(), parts.blobs)
            .with_lock_policy(parts.lock_policy),
        auth: parts.auth.clone(),
    };
    let changelists = ChangelistsState {
        changelists: ChangelistService::new(parts.store.clone()),
        auth: parts.auth.clone(),
    };
    let merges = MergesState {
        merges: MergeService::new(parts.store, parts.queue),
        auth: parts.auth,
    };

    Router::new()
        .route("/health", get(health_check))
        .merge(depot_catalog::routes().with_state(catalog))
        .merge(depot_changelists::routes().with_state(changelists))
        .merge(depot_merges::routes().with_state(merges))
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
