use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};

use stylist_api::{config::Config, routes, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let bind_addr = config.bind_addr.clone();

    let state = AppState::connect(config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    sqlx::migrate!()
        .run(&state.pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    log::info!("listening on {}", bind_addr);

    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
