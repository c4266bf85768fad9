use actix_files::Files;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use std::env;
use std::path::PathBuf;

use staffdesk_backend::{app_config, db, store::EmployeeStore, AppConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    // Validate JWT secret
    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    if jwt_secret.is_empty() {
        panic!("JWT_SECRET cannot be empty");
    }

    // Initialize the database pool and schema
    let pool = db::create_pool()
        .await
        .expect("Failed to connect to the database");
    let store = EmployeeStore::new(pool);

    let uploads_dir =
        PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));
    std::fs::create_dir_all(&uploads_dir)?;
    let config = AppConfig {
        uploads_dir: uploads_dir.clone(),
    };

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting server at {}", bind_addr);

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(app_config)
            .service(Files::new("/uploads", uploads_dir.clone()))
    })
    .bind(bind_addr)?
    .run()
    .await
}
