// hearth-server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use hearth_server::assets::FsBlobStore;
use hearth_server::config::AppConfig;
use hearth_server::errors::AppError;
use hearth_server::state::AppState;
use hearth_server::{db, telemetry, web};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Configuration error: {e}");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };
  telemetry::init_tracing(app_config.log_format);
  tracing::info!("Starting Hearth server...");

  let app_state = match build_state(app_config).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise application state.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let server_address = format!("{}:{}", app_state.config.server_host, app_state.config.server_port);
  let max_upload_bytes = app_state.config.max_upload_bytes;
  tracing::info!(address = %server_address, "Binding HTTP server.");

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(actix_data::PayloadConfig::new(max_upload_bytes))
      .app_data(actix_data::JsonConfig::default().limit(1 << 20))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}

async fn build_state(app_config: AppConfig) -> Result<AppState, AppError> {
  let db_pool = db::connect(&app_config.database_url).await?;
  db::migrate(&db_pool).await?;
  let blobs = FsBlobStore::open(app_config.asset_dir.clone()).await?;
  Ok(AppState::new(db_pool, app_config, Arc::new(blobs)))
}
