pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::warn;
use sqlx::{postgres::Postgres, Pool};
use std::env;

use service::auth::AuthMiddleware;
use service::log::RequestLogger;
use service::verify::VerifierClient;

pub type PGPool = Pool<Postgres>;

pub const ACCESS_TOKEN_EXP: usize = 60 * 60;
pub const REFRESH_TOKEN_EXP: usize = 5 * 24 * 60 * 60;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    service::log::init_logger();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|e| {
        panic!("Failed to get env with name 'DATABASE_URL': {:?}", e);
    });
    let pool: PGPool = db::init_db_pool(&db_url).await.unwrap_or_else(|e| {
        panic!("Failed to connect to postgres: {:?}", e);
    });

    let verifier = match VerifierClient::from_env() {
        Ok(client) => Some(client),
        Err(err) => {
            warn!("verifier not configured ({}); AI pre-checks disabled", err);
            None
        }
    };

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(verifier.clone()))
            .service(web::scope("/auth").configure(handlers::auth::init_routes))
            .service(web::scope("/events").configure(handlers::event::init_routes))
            .service(
                web::scope("/users")
                    .wrap(AuthMiddleware)
                    .configure(handlers::user::init_routes),
            )
            .service(
                web::scope("/bookings")
                    .wrap(AuthMiddleware)
                    .configure(handlers::booking::init_routes),
            )
            .service(
                web::scope("/admin")
                    .wrap(AuthMiddleware)
                    .configure(handlers::admin::init_routes),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
