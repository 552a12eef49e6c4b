use std::sync::Arc;

use axum::extract::FromRef;
use serde_json::Value;
use tumiki_auth::{AdapterCredentialStore, AuthState, LoginService, SessionTokenIssuer};
use tumiki_core::{SharedClock, system_clock};
use tumiki_db_memory::InMemoryDocumentStore;
use tumiki_firestore::{FirestoreClient, ServiceAccountKey, ServiceAccountTokenProvider};
use tumiki_storage::{DynDocumentStore, StorageAdapter};

use crate::cache::{TtlCache, TtlPresets};
use crate::config::{AppConfig, FirestoreSettings, StorageBackend};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: StorageAdapter,
    pub login: LoginService,
    pub auth: AuthState,
    /// Read-through cache for aggregate reads such as `/api/data`.
    pub cache: Arc<TtlCache<Value>>,
    pub clock: SharedClock,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.storage.backend_name())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Builds the state over an already constructed document store.
    pub fn new(
        config: AppConfig,
        store: DynDocumentStore,
        clock: SharedClock,
    ) -> anyhow::Result<Self> {
        let storage = StorageAdapter::new(store).with_policy(config.storage.table_policy());

        let issuer = Arc::new(
            SessionTokenIssuer::new(&config.auth.jwt_secret)?
                .with_validity(config.auth.token_validity())
                .with_clock(clock.clone()),
        );
        let credentials = Arc::new(AdapterCredentialStore::new(storage.clone()));
        let login = LoginService::new(credentials, issuer.clone());
        let auth = AuthState::new(issuer, config.auth.admin_roles.clone());

        let cache = TtlCache::new(TtlPresets::from(&config.cache)).with_clock(clock.clone());

        Ok(Self {
            config: Arc::new(config),
            storage,
            login,
            auth,
            cache: Arc::new(cache),
            clock,
        })
    }

    /// Builds the state and the document store selected by `storage.backend`.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: DynDocumentStore = match config.storage.backend {
            StorageBackend::Firestore => Arc::new(firestore_store(&config.firestore)?),
            StorageBackend::Memory => {
                tracing::warn!("using the in-memory document store; data is not persisted");
                InMemoryDocumentStore::shared()
            }
        };
        Self::new(config, store, system_clock())
    }
}

fn firestore_store(settings: &FirestoreSettings) -> anyhow::Result<FirestoreClient> {
    let key = ServiceAccountKey::new(settings.client_email.clone(), settings.private_key.clone());
    let tokens = ServiceAccountTokenProvider::new(&key)?
        .with_token_url(settings.token_url.clone())
        .with_scope(settings.scope.clone())
        .with_request_timeout(settings.request_timeout())
        .into_shared();
    let client = FirestoreClient::new(settings.client_config(), tokens)?;
    tracing::info!(
        project_id = %settings.project_id,
        database = %settings.database,
        "Firestore document store configured"
    );
    Ok(client)
}
