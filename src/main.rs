use domain::provider_registry::ProviderRegistry;
use events::{EventPublisher, LogEventHandler};
use log::{error, info};
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize the logger: {e}");
        process::exit(1);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        process::exit(1);
    }

    info!("Starting up Social Connect [{:?}]...", config.runtime_env());

    let registry = match ProviderRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to set up the providers: {e}");
            process::exit(1);
        }
    };
    if registry.is_empty() {
        info!("No providers are enabled, set ENABLED_PROVIDERS to enable some");
    }

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = Migrator::up(db.as_ref(), None).await {
        error!("Failed to apply database migrations: {e}");
        process::exit(1);
    }

    let events = EventPublisher::new().with_handler(Arc::new(LogEventHandler));
    let service_state = service::AppState::new(config, &db);

    let app_state = match web::AppState::new(service_state, registry, events) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        process::exit(1);
    }
}
