use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use aura_core::ConfigError;
use aura_gateway::GatewayError;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("settings I/O error at {path}: {source}")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid: {source}")]
    SettingsParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The catalog service failed and no catalog could be substituted.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(#[source] GatewayError),

    #[error("seed catalog error: {0}")]
    SeedCatalog(#[from] ConfigError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}
