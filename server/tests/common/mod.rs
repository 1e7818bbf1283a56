// tests/common/mod.rs
#![allow(dead_code)]

use actix_web::http::header;
use actix_web::web::Bytes;
use hearth_flow::ContextData;
use hearth_server::assets::{self, MemoryBlobStore, NewAsset};
use hearth_server::config::AppConfig;
use hearth_server::db;
use hearth_server::db::products::NewProduct;
use hearth_server::models::{AssetKind, Role};
use hearth_server::pipelines::contexts::SignupCtxData;
use hearth_server::services::auth_service;
use hearth_server::state::AppState;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::new("hearth_server=debug,hearth_flow=debug"))
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Shared state over an in-memory database, plus a handle on the blob store
/// so tests can count what is left behind.
pub struct TestEnv {
  pub state: AppState,
  pub blobs: Arc<MemoryBlobStore>,
}

pub async fn test_env() -> TestEnv {
  setup_tracing();
  let config = AppConfig::for_tests();
  let pool = db::connect(&config.database_url).await.expect("in-memory pool");
  db::migrate(&pool).await.expect("migrations apply");
  let blobs = Arc::new(MemoryBlobStore::new());
  let state = AppState::new(pool, config, blobs.clone());
  TestEnv { state, blobs }
}

/// Builds the full routed app over `state`.
#[macro_export]
macro_rules! test_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .app_data(actix_web::web::PayloadConfig::new($state.config.max_upload_bytes))
        .configure(hearth_server::web::configure_app_routes),
    )
    .await
  };
}

/// Sends `$req` and returns the status with the body parsed as JSON
/// (`Value::Null` for non-JSON bodies).
#[macro_export]
macro_rules! call {
  ($app:expr, $req:expr) => {{
    let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
    let status = resp.status();
    let body = actix_web::test::read_body(resp).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
  }};
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
  (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub struct Seeded {
  pub id: i64,
  pub token: String,
}

/// Registers a user through the signup pipeline and opens a session for it.
pub async fn seed_user(state: &AppState, username: &str, role: Role) -> Seeded {
  let ctx = ContextData::new(SignupCtxData {
    app_state: state.clone(),
    role,
    username: username.to_string(),
    password: "correct horse".to_string(),
    first_name: "Test".to_string(),
    last_name: "User".to_string(),
    email: Some(format!("{username}@example.com")),
    phone_no: Some("5550100".to_string()),
    created_user: None,
  });
  state.flows.run(ctx.clone()).await.expect("signup pipeline runs");
  let id = ctx.read().created_user.as_ref().expect("user created").id;
  let session = auth_service::open_session(&state.db_pool, id, 1).await.expect("session opens");
  Seeded { id, token: session.token }
}

pub async fn seed_model(state: &AppState, filename: &str) -> i64 {
  assets::catalog::store(
    &state.db_pool,
    state.blobs.as_ref(),
    NewAsset::new(AssetKind::Model, filename),
    b"glTF-model-bytes",
  )
  .await
  .expect("model stored")
  .id
}

pub struct ProductSpec {
  pub name: &'static str,
  pub digital_price_cents: Option<i64>,
  pub physical_price_cents: Option<i64>,
  pub stock: i64,
  pub is_container: bool,
}

impl Default for ProductSpec {
  fn default() -> Self {
    Self {
      name: "Oak Chair",
      digital_price_cents: Some(499),
      physical_price_cents: Some(12_999),
      stock: 5,
      is_container: false,
    }
  }
}

pub async fn seed_product(state: &AppState, spec: ProductSpec) -> i64 {
  let model_id = seed_model(state, &format!("{}.glb", spec.name)).await;
  let mut conn = state.db_pool.acquire().await.expect("connection");
  db::products::insert(
    &mut conn,
    &NewProduct {
      name: spec.name.to_string(),
      description: "Seeded for tests".to_string(),
      category: "furniture".to_string(),
      item_type: "chair".to_string(),
      model_id,
      is_container: spec.is_container,
      digital_price_cents: spec.digital_price_cents,
      physical_price_cents: spec.physical_price_cents,
      digital_available: spec.digital_price_cents.is_some(),
      physical_available: spec.physical_price_cents.is_some(),
      image_id: None,
      stock: spec.stock,
      display_scene_ids: Vec::new(),
    },
  )
  .await
  .expect("product inserted")
}

/// A minimal GLB whose single mesh spans the unit cube shifted by `offset`.
pub fn cube_glb(offset: [f64; 3]) -> Bytes {
  let doc = serde_json::json!({
    "asset": { "version": "2.0" },
    "scene": 0,
    "scenes": [{ "nodes": [0] }],
    "nodes": [{ "mesh": 0, "translation": offset }],
    "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
    "accessors": [{ "min": [-1.0, -1.0, -1.0], "max": [1.0, 1.0, 1.0] }]
  });
  Bytes::from(assets::glb::write_glb(&serde_json::to_vec(&doc).expect("json")))
}

pub fn id_of(body: &Value, field: &str) -> i64 {
  body[field].as_i64().unwrap_or_else(|| panic!("missing {field} in {body}"))
}
