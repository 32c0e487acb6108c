use actix_cors::Cors;
use actix_web::{http::header, App, HttpServer};
use std::io;

mod database;
mod error;
mod models;
mod routes;
mod settings;
mod telemetry;

use models::user::{load_keys, UserAuthenticationMiddlewareFactory};
use settings::Settings;

fn cors(origin: Option<&str>) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600);

    match origin {
        Some(origin) => cors.allowed_origin(origin),
        None => cors.allow_any_origin(),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = Settings::from_env()
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error.to_string()))?;
    telemetry::init_tracing(&settings.log_format);

    database::connect(&settings.mongodb_uri, &settings.database_name)
        .await
        .map_err(|error| io::Error::new(io::ErrorKind::Other, error.to_string()))?;
    load_keys(&settings.jwt_private_key_path, &settings.jwt_public_key_path)
        .map_err(|error| io::Error::new(io::ErrorKind::Other, error.to_string()))?;

    tracing::info!(address = %settings.bind_address, port = settings.port, "starting server");

    let cors_origin = settings.cors_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(UserAuthenticationMiddlewareFactory)
            .wrap(cors(cors_origin.as_deref()))
            .configure(routes::configure)
    })
    .bind((settings.bind_address.as_str(), settings.port))?
    .run()
    .await
}
