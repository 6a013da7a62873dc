use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use std::sync::Arc;

use expense_server::config::{ServerConfig, StoreBackend};
use expense_server::db::{MemoryStore, MongoStore, Store};
use expense_server::error::Result;
use expense_server::handlers;

async fn open_store(config: &ServerConfig) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            log::info!("Connecting to MongoDB at {}...", config.mongodb_uri);
            let store = MongoStore::connect_uri(&config.mongodb_uri, &config.database_name).await?;

            log::info!("Initializing database indexes...");
            store.init_indexes().await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            log::warn!("Using in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if it exists (for development)
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting expense server...");

    let config = ServerConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load server configuration: {}", e);
        eprintln!("Hint: check CONFIG_PATH and the SERVER_*/MONGODB_URI/BCRYPT_COST variables");
        std::process::exit(1);
    });

    let store = open_store(&config).await.unwrap_or_else(|e| {
        log::error!("Failed to open {:?} store: {}", config.store_backend, e);
        std::process::exit(1);
    });
    let store: web::Data<dyn Store> = web::Data::from(store);

    let server_host = config.host.clone();
    let server_port = config.port;
    log::info!("Starting HTTP server at {}:{}...", server_host, server_port);

    HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(store.clone())
            .app_data(web::Data::new(config.clone()))
            // Middleware
            .wrap(actix_middleware::Logger::default())
            .wrap(actix_middleware::Compress::default())
            .configure(handlers::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
