pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;
pub mod utils;

use actix_web::web;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub uploads_dir: PathBuf,
}

/// Employee routes, shared between the binary and the integration tests.
/// `/create` must register before `/{id}` so it is not captured as an id.
pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/v1/employee/create")
            .route(web::post().to(handlers::employee::create_employee)),
    )
    .service(
        web::resource("/api/v1/employee").route(web::get().to(handlers::employee::list_employees)),
    )
    .service(
        web::resource("/api/v1/employee/{id}")
            .route(web::get().to(handlers::employee::get_employee))
            .route(web::put().to(handlers::employee::update_employee))
            .route(web::delete().to(handlers::employee::delete_employee)),
    );
}
