mod catalog;
mod settings;
mod trials;
mod watch;

use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aura_core::{AppConfig, UserRole};
use aura_gateway::{GatewayError, HttpGateway, SessionResolver};
use aura_state::{AppStore, CatalogRefresher, JsonFileSettings};
use aura_trials::{RequestListObserver, TrialRepository};

use catalog::CatalogCommands;
use settings::SettingsCommands;
use trials::TrialsCommands;

#[derive(Debug, Parser)]
#[command(name = "aura-cli")]
#[command(about = "AuraSelect trial desk command line interface")]
struct Cli {
    /// Act as this role instead of the one resolved from the session
    #[arg(long, global = true)]
    role: Option<UserRole>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Submit and manage trial requests
    Trials {
        #[command(subcommand)]
        command: TrialsCommands,
    },
    /// Show or change persisted preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Refresh the catalog periodically and print state changes until Ctrl-C
    Watch,
}

/// Everything a command needs, wired once per invocation.
pub(crate) struct App {
    pub(crate) config: AppConfig,
    pub(crate) gateway: HttpGateway,
    pub(crate) store: Arc<AppStore>,
    pub(crate) repository: TrialRepository<HttpGateway>,
    pub(crate) role_override: Option<UserRole>,
    pub(crate) json: bool,
}

impl App {
    fn build(
        config: AppConfig,
        role_override: Option<UserRole>,
        json: bool,
    ) -> anyhow::Result<Self> {
        let gateway =
            HttpGateway::from_app_config(&config).context("failed to build gateway client")?;
        let store = Arc::new(AppStore::new(Arc::new(JsonFileSettings::new(
            config.settings_path.clone(),
        ))));
        let observer: Arc<dyn RequestListObserver> = Arc::<AppStore>::clone(&store);
        let repository = TrialRepository::new(gateway.clone()).with_observer(observer);

        Ok(Self {
            config,
            gateway,
            store,
            repository,
            role_override,
            json,
        })
    }

    pub(crate) fn refresher(&self) -> CatalogRefresher<HttpGateway> {
        CatalogRefresher::new(self.gateway.clone(), Arc::clone(&self.store))
            .with_seed(self.config.catalog_seed_path.clone())
    }

    /// The `--role` override, or the role of the signed-in user.
    pub(crate) async fn role(&self) -> anyhow::Result<UserRole> {
        if let Some(role) = self.role_override {
            return Ok(role);
        }
        match self.gateway.current_session().await {
            Ok(session) => Ok(session.role),
            Err(GatewayError::MissingToken) => Err(anyhow::anyhow!(
                "AURA_API_TOKEN is not set; pass --role to choose a role explicitly"
            )),
            Err(e) => Err(e).context("failed to resolve the current session"),
        }
    }

    pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("aura-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = aura_core::load_app_config().context("failed to load configuration")?;
    init_tracing(&config.log_level);
    tracing::debug!(env = %config.env, base_url = %config.api_base_url, "configuration loaded");

    let app = App::build(config, cli.role, cli.json)?;

    match command {
        Commands::Catalog { command } => catalog::run(&app, command).await,
        Commands::Trials { command } => trials::run(&app, command).await,
        Commands::Settings { command } => settings::run(&app, command),
        Commands::Watch => watch::run(&app).await,
    }
}
