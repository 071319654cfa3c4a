use std::net::SocketAddr;
use std::sync::Arc;

use helpdesk_users::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    middleware::{auth::AuthKeys, cors::permissive_cors},
    routes,
    services::{upload_service::ProfileUploads, user_store::PgUserStore},
    AppState,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let uploads = ProfileUploads::new(&config.uploads_dir);
    uploads.ensure_dir().await?;
    info!("Serving uploads from: {}", config.uploads_dir.display());

    let app_state = AppState::new(
        Arc::new(PgUserStore::new(pool)),
        uploads,
        AuthKeys::new(config.jwt_secret.as_str(), config.token_ttl_hours),
    );

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let created = app_state
            .user_service
            .bootstrap_admin(email, password)
            .await
            .map_err(|e| anyhow::anyhow!("Admin bootstrap failed: {}", e))?;
        match created {
            Some(user) => info!("Bootstrapped admin account {}", user.email),
            None => info!("Admin account {} already present", email),
        }
    }

    let app = routes::router(app_state)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
