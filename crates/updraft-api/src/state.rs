//! Application state shared across handlers.

use crate::access::AccessPolicy;
use crate::services::ingest::UploadIngestor;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use updraft_core::{Config, UploadPolicy};
use updraft_db::UploadRepository;
use updraft_storage::{LocalStore, Store};

/// Main application state: config plus the wired collaborators.
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: PgPool,
    pub uploads: UploadRepository,
    /// The active backing store (local or S3, per configuration).
    pub store: Arc<dyn Store>,
    /// Always-available local store: serves files from before a migration to
    /// a remote backend, and answers URL-membership checks for them.
    pub local_store: Arc<LocalStore>,
    pub policy: UploadPolicy,
    pub access: Arc<dyn AccessPolicy>,
    pub ingestor: UploadIngestor,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: PgPool,
        store: Arc<dyn Store>,
        local_store: Arc<LocalStore>,
        access: Arc<dyn AccessPolicy>,
    ) -> Result<Arc<Self>, anyhow::Error> {
        let config = Arc::new(config);
        let uploads = UploadRepository::new(pool.clone());
        let policy = UploadPolicy::from_config(&config);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.url_fetch_timeout_secs))
            .build()?;
        let ingestor = UploadIngestor::new(
            uploads.clone(),
            store.clone(),
            policy,
            config.clone(),
            http,
        );

        Ok(Arc::new(Self {
            config,
            db_pool: pool,
            uploads,
            store,
            local_store,
            policy,
            access,
            ingestor,
        }))
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
