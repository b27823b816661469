//! Route table and CORS policy.
//!
//! Kept apart from `main` so the tests build exactly the application the server runs.

use crate::config::CorsConfig;
use crate::{handlers, health};
use actix_cors::Cors;
use actix_web::{http::header, web};

/// Methods browsers may use against the relay.
pub const ALLOWED_METHODS: [&str; 3] = ["POST", "GET", "OPTIONS"];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/recognize", web::post().to(handlers::recognize))
        .route("/health", web::get().to(health::health_check));
}

/// Only the configured origins may call the relay, with `Content-Type` as the sole extra header.
pub fn cors(config: &CorsConfig) -> Cors {
    config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(ALLOWED_METHODS)
        .allowed_header(header::CONTENT_TYPE)
}
