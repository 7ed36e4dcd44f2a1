use crate::config::Config;
use crate::payments::MercadoPagoClient;
use crate::startup::{AppState, build_router, with_sessions};
use crate::store::{MemoryStore, PgStore};
use std::sync::Arc;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

#[macro_use]
extern crate tracing;

mod admin;
mod auth;
mod completion;
mod config;
mod db;
mod elections;
mod error;
mod notify;
mod pages;
mod payments;
mod session;
mod startup;
mod store;
mod voting;

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("Invalid configuration");
    if config.mercado_pago_access_token.is_none() {
        warn!("MERCADO_PAGO_ACCESS_TOKEN not set, checkout will fail");
    }
    let payments = Arc::new(MercadoPagoClient::new(&config));
    let addr = config.bind_addr;

    let app = match config.database_url.clone() {
        Some(database_url) => {
            let store = PgStore::connect(&database_url)
                .await
                .expect("Failed to connect to database");

            let session_store = PostgresStore::new(store.pool().clone());
            session_store
                .migrate()
                .await
                .expect("Failed to migrate session store");
            tokio::spawn(
                session_store
                    .clone()
                    .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
            );

            let app_state = AppState::new(Arc::new(store), payments, config.clone());
            with_sessions(build_router(app_state), session_store, &config)
        }
        None => {
            warn!("DATABASE_URL not set, keeping everything in memory");
            let app_state = AppState::new(Arc::new(MemoryStore::new()), payments, config.clone());
            with_sessions(
                build_router(app_state),
                tower_sessions::MemoryStore::default(),
                &config,
            )
        }
    };

    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app).await.unwrap();
}
