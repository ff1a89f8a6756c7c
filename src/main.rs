use actix_web::{App, HttpServer, middleware::Compress};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

use academics::app;
use academics::auth::{AuthHandler, ProxyAuthHandler, UnconfiguredAuthHandler};
use academics::repo::{inmem::InMemRepo, pg::PgRepo, Repo};
use academics::{AppConfig, AppState, Security};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    info!("Bootstrapping academics server");

    match &config.frontend_url {
        Some(origin) => info!(%origin, "CORS origin configured"),
        None => warn!("FRONTEND_URL is not set; CORS will reject every cross-origin request"),
    }

    let repo: Arc<dyn Repo> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;
            let repo = PgRepo::new(pool);
            repo.migrate().await?;
            info!("Using Postgres repository backend");
            Arc::new(repo)
        }
        None => {
            warn!("DATABASE_URL is not set; records are kept in memory and lost on exit");
            Arc::new(InMemRepo::new())
        }
    };

    let auth: Arc<dyn AuthHandler> = match &config.auth_service_url {
        Some(url) => {
            info!(%url, "Delegating /api/auth/* to identity service");
            Arc::new(ProxyAuthHandler::new(url.as_str())?)
        }
        None => {
            warn!("AUTH_SERVICE_URL is not set; /api/auth/* will answer 503");
            Arc::new(UnconfiguredAuthHandler)
        }
    };

    let state = AppState { repo, auth };
    let security = Security::from_config(&config);
    let port = config.port;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(app::cors(&config))
            .configure(|cfg| app::configure(cfg, state.clone(), security.clone()))
    })
    .bind(("0.0.0.0", port))?;

    info!("Server is running on port {port}");

    server.run().await?;
    Ok(())
}
