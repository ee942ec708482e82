use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum_login::{
    tower_sessions::{Expiry, SessionManagerLayer},
    AuthManagerLayerBuilder,
};
use domain::provider_registry::ProviderRegistry;
use domain::Backend;
use events::EventPublisher;
use log::*;
use sea_orm::DatabaseConnection;
use service::config::{Config, ConfigError};
use social_auth::Signer;
use std::sync::Arc;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_sessions_sqlx_store::PostgresStore;

mod controller;
mod cookies;
mod error;
mod extractors;
mod router;
mod session;
mod visitor;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
    pub registry: Arc<ProviderRegistry>,
    pub events: EventPublisher,
    pub signer: Signer,
}

impl AppState {
    pub fn new(
        app_state: service::AppState,
        registry: ProviderRegistry,
        events: EventPublisher,
    ) -> Result<Self, ConfigError> {
        let secret_key = app_state
            .config
            .secret_key()
            .ok_or(ConfigError::MissingSecretKey)?;

        Ok(Self {
            database_connection: app_state.database_connection,
            config: app_state.config,
            registry: Arc::new(registry),
            events,
            signer: Signer::new(secret_key),
        })
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}

pub async fn init_server(app_state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to DB with URL: {}", app_state.config.database_url());

    // Session layer
    let session_store = PostgresStore::new(
        app_state
            .db_conn_ref()
            .get_postgres_connection_pool()
            .to_owned(),
    )
    .with_schema_name("social_connect")?
    .with_table_name("authorized_sessions")?;

    session_store.migrate().await?;

    let session_expiry_seconds = app_state.config.backend_session_expiry_seconds;
    info!("Session expiry configured for {session_expiry_seconds} seconds of inactivity");

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            session_expiry_seconds as i64,
        )));

    // Auth service
    let backend = Backend::new(&app_state.database_connection);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{host}:{}", app_state.config.port);
    let listener = TcpListener::bind(&server_url).await?;

    let allowed_origins = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<HeaderValue>>();
    info!("CORS allowed origins: {allowed_origins:?}");

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(allowed_origins);

    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(
        listener,
        router::define_routes(app_state)
            .layer(auth_layer)
            .layer(cors_layer),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
#[cfg(feature = "mock")]
pub(crate) mod test_app {
    use super::*;
    use axum::Router;
    use axum_login::tower_sessions::MemoryStore;
    use clap::Parser;
    use domain::flow::FlowSettings;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use social_auth::http::{build_client, HttpClientConfig};
    use social_auth::{AppCredentials, Client, Descriptor, ProviderKind};

    pub(crate) fn config() -> Config {
        Config::parse_from(["social_connect_rs", "--secret-key", "test-secret"])
    }

    pub(crate) fn github_registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::default();
        let client = Client::new(
            Descriptor::for_kind(ProviderKind::GitHub, false),
            AppCredentials {
                app_id: "gh-app".to_string(),
                app_secret: secrecy::SecretString::new("gh-secret".to_string()),
                app_access_token: None,
            },
            vec![],
            build_client(&HttpClientConfig::default()).unwrap(),
        );
        registry.register(
            ProviderKind::GitHub,
            Arc::new(client),
            FlowSettings {
                public_base_url: "http://localhost:4000".to_string(),
                email_is_username: true,
                activate_already_registered_users: false,
                setup_url: None,
            },
            "dsngh".to_string(),
        );
        registry
    }

    pub(crate) fn state(db: MockDatabase, registry: ProviderRegistry) -> AppState {
        let db = Arc::new(db.into_connection());
        let app_state = service::AppState::new(config(), &db);
        AppState::new(app_state, registry, EventPublisher::new()).unwrap()
    }

    pub(crate) fn empty_state() -> AppState {
        state(MockDatabase::new(DatabaseBackend::Postgres), github_registry())
    }

    /// The full router behind in-memory sessions.
    pub(crate) fn app(app_state: AppState) -> Router {
        let session_layer = SessionManagerLayer::new(MemoryStore::default())
            .with_secure(false)
            .with_expiry(Expiry::OnInactivity(Duration::days(1)));
        let backend = Backend::new(&app_state.database_connection);
        let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

        router::define_routes(app_state).layer(auth_layer)
    }
}
