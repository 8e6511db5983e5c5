use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use irata_centre::config::{AppConfig, LogFormat};
use irata_centre::{db, routes, AppState};

fn setup_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.compact().init(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // pas encore d'abonné: le format de log dépend de la config
            setup_tracing(LogFormat::Pretty);
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    setup_tracing(config.log_format);

    info!("connecting to database");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    if config.auto_migrate {
        db::sync_schema(&db).await.map_err(std::io::Error::other)?;
    }
    info!("database ready");

    let bind = (config.host.clone(), config.port);
    let state = web::Data::new(AppState::new(db, config));

    info!(host = %bind.0, port = bind.1, "starting server");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind)?
    .run()
    .await
}
