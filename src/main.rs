mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into());

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    let store = Arc::new(services::storage::FsObjectStore::new(&data_dir));

    // Email delivery is optional: without it, access codes land in the log.
    let email = state::EmailConfig::from_env();
    match &email {
        Some(cfg) => tracing::info!(from = %cfg.from, "email delivery configured"),
        None => tracing::warn!("RESEND_API_KEY/RESEND_FROM not set — access codes will be logged"),
    }

    let state = state::AppState::new(pool, store, email);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, %data_dir, "fotomat listening");
    axum::serve(listener, app).await.expect("server failed");
}
