// hearth-server/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{
  account_handlers, asset_handlers, auth_handlers, cart_handlers, home_handlers, order_handlers, product_handlers,
  review_handlers,
};

async fn health_check_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  sqlx::query("SELECT 1").execute(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

fn user_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/register", web::post().to(auth_handlers::register_handler))
    .route("/staff/register", web::post().to(auth_handlers::register_staff_handler))
    .route("/admin/register", web::post().to(auth_handlers::register_admin_handler))
    .route("/login", web::post().to(auth_handlers::login_handler))
    .route("/is_logged_in", web::get().to(auth_handlers::is_logged_in_handler))
    .route("/logout", web::delete().to(auth_handlers::logout_handler))
    .route("/delete", web::delete().to(auth_handlers::delete_account_handler))
    .route("/profile", web::get().to(auth_handlers::profile_handler))
    .route("/profile/update", web::put().to(auth_handlers::update_profile_handler))
    .route(
      "/profile/upload_profile_picture",
      web::post().to(auth_handlers::upload_profile_picture_handler),
    )
    .route("/profile/picture", web::get().to(auth_handlers::profile_picture_handler))
    .route("/change_password", web::put().to(auth_handlers::change_password_handler))
    .route("/login_token", web::get().to(auth_handlers::login_token_handler))
    .route("/login_token/verify", web::post().to(auth_handlers::verify_login_token_handler))
    // Addresses
    .route("/address", web::get().to(account_handlers::list_addresses_handler))
    .route("/address/add", web::post().to(account_handlers::add_address_handler))
    .route("/address/edit", web::put().to(account_handlers::edit_address_handler))
    .route("/address/set_default", web::put().to(account_handlers::set_default_address_handler))
    .route("/address/delete", web::delete().to(account_handlers::delete_address_handler))
    // Payment methods
    .route("/credit_cards", web::post().to(account_handlers::add_credit_card_handler))
    .route("/credit_cards", web::get().to(account_handlers::list_credit_cards_handler))
    .route("/credit_cards/{id}", web::delete().to(account_handlers::delete_credit_card_handler))
    .route("/credit_cards/{id}/default", web::put().to(account_handlers::default_credit_card_handler))
    .route("/bank_accounts", web::post().to(account_handlers::add_bank_account_handler))
    .route("/bank_accounts", web::get().to(account_handlers::list_bank_accounts_handler))
    .route("/bank_accounts/{id}", web::delete().to(account_handlers::delete_bank_account_handler))
    .route("/bank_accounts/{id}/default", web::put().to(account_handlers::default_bank_account_handler))
    // Wishlist
    .route("/wishlist", web::post().to(account_handlers::add_to_wishlist_handler))
    .route("/wishlist", web::get().to(account_handlers::list_wishlist_handler))
    .route("/wishlist/{product_id}", web::delete().to(account_handlers::remove_from_wishlist_handler));
}

fn asset_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/models", web::post().to(asset_handlers::upload_model_handler))
    .route("/models/{model_id}", web::get().to(asset_handlers::get_model_handler))
    .route("/models/{model_id}/textures", web::post().to(asset_handlers::upload_texture_handler))
    .route("/models/{model_id}/textures", web::get().to(asset_handlers::list_model_textures_handler))
    .route("/textures/{texture_id}", web::get().to(asset_handlers::get_texture_handler))
    .route("/scenes", web::post().to(asset_handlers::upload_scene_handler))
    .route("/scenes/{scene_id}", web::get().to(asset_handlers::get_display_scene_handler))
    .route("/images", web::post().to(asset_handlers::upload_image_handler))
    .route("/images/{image_id}", web::get().to(asset_handlers::get_image_handler));
}

fn product_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/add", web::post().to(product_handlers::add_product_handler))
    .route("/list", web::get().to(product_handlers::list_products_handler))
    .route("/get_product_detail/{id}", web::get().to(product_handlers::product_detail_handler))
    .route("/update", web::put().to(product_handlers::update_product_handler))
    .route("/delete/{id}", web::delete().to(product_handlers::delete_product_handler))
    .route("/get_3d_model/{model_id}", web::get().to(asset_handlers::get_model_handler))
    .route("/get_texture/{model_id}", web::get().to(asset_handlers::list_model_textures_handler))
    .route("/get_display_scene/{scene_id}", web::get().to(asset_handlers::get_display_scene_handler));
}

fn cart_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("", web::get().to(cart_handlers::view_cart_handler))
    .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
    .route("/remove/{cart_item_id}", web::delete().to(cart_handlers::remove_from_cart_handler))
    .route("/clear", web::delete().to(cart_handlers::clear_cart_handler))
    .route("/summary", web::get().to(cart_handlers::cart_summary_handler));
}

fn order_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("", web::get().to(order_handlers::list_orders_handler))
    .route("/checkout", web::post().to(order_handlers::checkout_handler))
    .route("/{id}", web::get().to(order_handlers::get_order_handler))
    .route("/{id}/payment_completed", web::post().to(order_handlers::payment_completed_handler))
    .route("/{id}/cancel", web::post().to(order_handlers::cancel_order_handler))
    .route("/{id}/complete", web::post().to(order_handlers::complete_order_handler));
}

fn review_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/add", web::post().to(review_handlers::add_review_handler))
    .route("/edit", web::put().to(review_handlers::edit_review_handler))
    .route("/delete/{review_id}", web::delete().to(review_handlers::delete_review_handler))
    .route("/mine", web::get().to(review_handlers::my_reviews_handler))
    .route("/product/{product_id}", web::get().to(review_handlers::product_reviews_handler))
    .route("/{review_id}/image", web::put().to(review_handlers::upload_review_image_handler))
    .route("/{review_id}/image", web::delete().to(review_handlers::delete_review_image_handler))
    .route("/{review_id}/image", web::get().to(review_handlers::get_review_image_handler));
}

fn digital_home_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/items", web::get().to(home_handlers::list_items_handler))
    .route("/items/{owned_item_id}", web::get().to(home_handlers::get_item_handler))
    .route("/homes", web::post().to(home_handlers::create_home_handler))
    .route("/homes", web::get().to(home_handlers::list_homes_handler))
    .route("/homes/{home_id}", web::get().to(home_handlers::get_home_handler))
    .route("/homes/{home_id}", web::delete().to(home_handlers::delete_home_handler))
    .route("/homes/{home_id}/model", web::get().to(home_handlers::get_home_model_handler))
    .route("/homes/{home_id}/textures", web::post().to(home_handlers::add_home_texture_handler))
    .route("/homes/{home_id}/textures", web::get().to(home_handlers::list_home_textures_handler))
    .route("/homes/{home_id}/textures", web::delete().to(home_handlers::delete_home_textures_handler))
    .route("/homes/{home_id}/items", web::put().to(home_handlers::place_items_handler))
    .route(
      "/homes/{home_id}/items/{owned_item_id}",
      web::delete().to(home_handlers::undeploy_item_handler),
    );
}

/// Mounts every API route under `/api/v1`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(web::scope("/users").configure(user_routes))
      .service(web::scope("/assets").configure(asset_routes))
      .service(web::scope("/products").configure(product_routes))
      .service(web::scope("/cart").configure(cart_routes))
      .service(web::scope("/orders").configure(order_routes))
      .service(web::scope("/reviews").configure(review_routes))
      .service(web::scope("/digital_home").configure(digital_home_routes)),
  );
}
