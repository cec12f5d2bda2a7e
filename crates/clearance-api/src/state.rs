//! # Application State
//!
//! Shared state for the Axum application: the clearance engine, the
//! concrete adapters it drives, and the optional database pool.
//!
//! ## Persistence
//!
//! The engine commits to the in-memory repository. When a pool is
//! configured, handlers call [`AppState::persist`] after every successful
//! mutation so the `shipments` table follows the repository.

use std::sync::Arc;

use clearance_core::{Clock, ShipmentId, SystemClock};
use clearance_ports::{
    BroadcastChangeBus, HmacPaymentGateway, InMemoryDocumentStore, LogNotifier, Notifier,
    PortError,
};
use clearance_state::{
    ClearanceEngine, EngineConfig, EnginePorts, InMemoryShipmentRepository, ShipmentRepository,
};
use sqlx::PgPool;
use zeroize::Zeroizing;

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;

// -- Configuration -------------------------------------------------------------

/// Process configuration read from the environment.
///
/// Custom `Debug` redacts every secret.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. `None` disables authentication.
    pub auth_token: Option<Zeroizing<String>>,
    /// Postgres URL. `None` runs in-memory only.
    pub database_url: Option<String>,
    /// Merchant key id handed to checkout clients.
    pub gateway_key_id: String,
    /// Secret the gateway signs callbacks with.
    pub gateway_secret: Zeroizing<String>,
    /// Prefix of signed document URLs.
    pub document_base_url: String,
    /// Key signing document URLs.
    pub document_signing_key: Zeroizing<String>,
    /// Seconds between timeout sweeps. Zero disables the sweeper.
    pub sweep_interval_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("gateway_key_id", &self.gateway_key_id)
            .field("gateway_secret", &"[REDACTED]")
            .field("document_base_url", &self.document_base_url)
            .field("document_signing_key", &"[REDACTED]")
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            gateway_key_id: "key_local".to_string(),
            gateway_secret: Zeroizing::new(ephemeral_secret()),
            document_base_url: "http://localhost:8080/v1/files".to_string(),
            document_signing_key: Zeroizing::new(ephemeral_secret()),
            sweep_interval_secs: 300,
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment, falling back to defaults.
    ///
    /// Missing secrets are replaced by random per-process values, which
    /// invalidates outstanding signatures on restart.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let gateway_secret = match var("GATEWAY_SECRET") {
            Some(s) => Zeroizing::new(s),
            None => {
                tracing::warn!("GATEWAY_SECRET not set, using an ephemeral secret");
                defaults.gateway_secret
            }
        };
        let document_signing_key = match var("DOCUMENT_SIGNING_KEY") {
            Some(s) => Zeroizing::new(s),
            None => {
                tracing::warn!("DOCUMENT_SIGNING_KEY not set, using an ephemeral key");
                defaults.document_signing_key
            }
        };

        Self {
            port,
            auth_token: var("AUTH_TOKEN").map(Zeroizing::new),
            database_url: var("DATABASE_URL"),
            gateway_key_id: var("GATEWAY_KEY_ID").unwrap_or(defaults.gateway_key_id),
            gateway_secret,
            document_base_url: var("DOCUMENT_BASE_URL").unwrap_or(defaults.document_base_url),
            document_signing_key,
            sweep_interval_secs: var("SWEEP_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sweep_interval_secs),
        }
    }
}

fn ephemeral_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

// -- Application State ---------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The lifecycle engine.
    pub engine: Arc<ClearanceEngine>,
    /// Repository behind the engine, kept concrete for hydration.
    pub repo: Arc<InMemoryShipmentRepository>,
    /// Document storage, kept concrete for serving signed downloads.
    pub documents: Arc<InMemoryDocumentStore>,
    /// Change feed the engine publishes to.
    pub changes: BroadcastChangeBus,
    /// Prometheus registry for request and shipment metrics.
    pub metrics: ApiMetrics,
    /// Postgres pool for write-through. `None` means in-memory only.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// Wire the engine to the in-process adapters.
    pub fn from_config(
        config: AppConfig,
        engine_config: EngineConfig,
        clock: Arc<dyn Clock>,
        db_pool: Option<PgPool>,
    ) -> Result<Self, PortError> {
        Self::with_notifier(config, engine_config, clock, Arc::new(LogNotifier), db_pool)
    }

    /// Like [`AppState::from_config`] with a specific notifier.
    pub fn with_notifier(
        config: AppConfig,
        engine_config: EngineConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        db_pool: Option<PgPool>,
    ) -> Result<Self, PortError> {
        let repo = Arc::new(InMemoryShipmentRepository::new());
        let documents = Arc::new(InMemoryDocumentStore::new(
            config.document_base_url.clone(),
            config.document_signing_key.as_bytes().to_vec(),
            Arc::clone(&clock),
        ));
        let gateway = HmacPaymentGateway::new(
            config.gateway_key_id.clone(),
            config.gateway_secret.as_bytes().to_vec(),
        )?;
        let changes = BroadcastChangeBus::new(1024);
        let ports = EnginePorts {
            documents: documents.clone(),
            gateway: Arc::new(gateway),
            notifier,
            changes: Arc::new(changes.clone()),
        };
        let engine = ClearanceEngine::new(engine_config, repo.clone(), ports, clock);
        let metrics = ApiMetrics::new().map_err(|e| PortError::Configuration {
            reason: format!("metrics registry: {e}"),
        })?;

        Ok(Self {
            engine: Arc::new(engine),
            repo,
            documents,
            changes,
            metrics,
            db_pool,
            config,
        })
    }

    /// In-memory state on the system clock with default engine settings.
    pub fn in_memory(config: AppConfig) -> Result<Self, PortError> {
        Self::from_config(config, EngineConfig::default(), Arc::new(SystemClock), None)
    }

    /// Write the current snapshot of `id` through to the database.
    ///
    /// A no-op without a pool. A failed write is logged and surfaced as an
    /// internal error; the in-memory commit stands.
    pub async fn persist(&self, id: ShipmentId) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let Some(shipment) = self.repo.get(id) else {
            return Ok(());
        };
        match crate::db::shipments::upsert(pool, &shipment).await {
            Ok(written) => {
                if !written {
                    tracing::debug!(shipment_id = %id, version = shipment.version, "stored row already newer");
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(shipment_id = %id, error = %e, "failed to persist shipment");
                Err(AppError::Internal(format!("database persist failed: {e}")))
            }
        }
    }

    /// Persist several shipments, logging rather than failing on errors.
    pub async fn persist_all(&self, ids: &[ShipmentId]) {
        for id in ids {
            if let Err(e) = self.persist(*id).await {
                tracing::warn!(shipment_id = %id, error = %e, "sweep result not persisted");
            }
        }
    }

    /// Hydrate the repository from the database.
    ///
    /// Called once on startup when a pool is available.
    pub async fn hydrate_from_db(&self) -> Result<usize, crate::db::PersistenceError> {
        let Some(pool) = &self.db_pool else {
            return Ok(0);
        };
        let shipments = crate::db::shipments::load_all(pool).await?;
        let count = self.repo.hydrate(shipments);
        tracing::info!(shipments = count, "hydrated repository from database");
        Ok(count)
    }
}
