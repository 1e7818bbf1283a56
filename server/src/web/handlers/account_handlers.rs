// hearth-server/src/web/handlers/account_handlers.rs

//! Customer-owned records: addresses, payment methods and the wishlist.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::db;
use crate::db::payments::{MethodTable, NewBankAccount, NewCard};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::Customer;

#[derive(Deserialize, Debug)]
pub struct AddAddressPayload {
  pub address: String,
  #[serde(default)]
  pub is_default: bool,
}

#[derive(Deserialize, Debug)]
pub struct EditAddressPayload {
  pub address_id: i64,
  pub address: String,
}

#[derive(Deserialize, Debug)]
pub struct AddressIdPayload {
  pub address_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct CreditCardPayload {
  pub provider: String,
  pub provider_token: String,
  #[serde(default)]
  pub card_brand: String,
  #[serde(default)]
  pub last4: String,
  pub exp_month: Option<i64>,
  pub exp_year: Option<i64>,
  #[serde(default)]
  pub is_default: bool,
}

#[derive(Deserialize, Debug)]
pub struct BankAccountPayload {
  #[serde(default = "default_bank_provider")]
  pub provider: String,
  #[serde(default)]
  pub provider_token: String,
  pub bank_name: String,
  pub account_holder: String,
  #[serde(default)]
  pub last4: String,
  #[serde(default)]
  pub is_default: bool,
}

fn default_bank_provider() -> String {
  "bank".to_string()
}

#[derive(Deserialize, Debug)]
pub struct WishlistPayload {
  pub product_id: i64,
}

fn required(value: &str, field: &str) -> Result<(), AppError> {
  if value.trim().is_empty() {
    return Err(AppError::Validation(format!("{field} is required.")));
  }
  Ok(())
}

// --- Addresses ---

#[instrument(name = "handler::add_address", skip_all, fields(customer_id = customer.0.id()))]
pub async fn add_address_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<AddAddressPayload>,
) -> Result<HttpResponse, AppError> {
  required(&payload.address, "Address")?;
  let mut tx = app_state.db_pool.begin().await?;
  let address = db::addresses::insert(&mut tx, customer.0.id(), payload.address.trim(), payload.is_default).await?;
  tx.commit().await?;
  Ok(HttpResponse::Created().json(json!({ "message": "Address added.", "address": address })))
}

pub async fn edit_address_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<EditAddressPayload>,
) -> Result<HttpResponse, AppError> {
  required(&payload.address, "Address")?;
  let address =
    db::addresses::update_text(&app_state.db_pool, customer.0.id(), payload.address_id, payload.address.trim()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Address updated.", "address": address })))
}

pub async fn set_default_address_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<AddressIdPayload>,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.db_pool.begin().await?;
  db::addresses::set_default(&mut tx, customer.0.id(), payload.address_id).await?;
  tx.commit().await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Default address set." })))
}

pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<AddressIdPayload>,
) -> Result<HttpResponse, AppError> {
  db::addresses::delete(&app_state.db_pool, customer.0.id(), payload.address_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Address deleted." })))
}

pub async fn list_addresses_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let addresses = db::addresses::list(&app_state.db_pool, customer.0.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "addresses": addresses })))
}

// --- Payment methods ---

#[instrument(name = "handler::add_credit_card", skip_all, fields(customer_id = customer.0.id()))]
pub async fn add_credit_card_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<CreditCardPayload>,
) -> Result<HttpResponse, AppError> {
  required(&payload.provider, "Provider")?;
  required(&payload.provider_token, "Provider token")?;
  let card = NewCard {
    provider: payload.provider.trim(),
    provider_token: payload.provider_token.trim(),
    card_brand: payload.card_brand.trim(),
    last4: payload.last4.trim(),
    exp_month: payload.exp_month,
    exp_year: payload.exp_year,
    is_default: payload.is_default,
  };
  let mut tx = app_state.db_pool.begin().await?;
  let card = db::payments::insert_card(&mut tx, customer.0.id(), &card).await?;
  tx.commit().await?;
  info!(card_id = card.id, "Credit card added.");
  Ok(HttpResponse::Created().json(json!({ "credit_card": card })))
}

pub async fn list_credit_cards_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let cards = db::payments::list_cards(&app_state.db_pool, customer.0.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "credit_cards": cards })))
}

#[instrument(name = "handler::add_bank_account", skip_all, fields(customer_id = customer.0.id()))]
pub async fn add_bank_account_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<BankAccountPayload>,
) -> Result<HttpResponse, AppError> {
  required(&payload.bank_name, "Bank name")?;
  required(&payload.account_holder, "Account holder")?;
  let account = NewBankAccount {
    provider: payload.provider.trim(),
    provider_token: payload.provider_token.trim(),
    bank_name: payload.bank_name.trim(),
    account_holder: payload.account_holder.trim(),
    last4: payload.last4.trim(),
    is_default: payload.is_default,
  };
  let mut tx = app_state.db_pool.begin().await?;
  let account = db::payments::insert_bank_account(&mut tx, customer.0.id(), &account).await?;
  tx.commit().await?;
  info!(bank_account_id = account.id, "Bank account added.");
  Ok(HttpResponse::Created().json(json!({ "bank_account": account })))
}

pub async fn list_bank_accounts_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let accounts = db::payments::list_bank_accounts(&app_state.db_pool, customer.0.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "bank_accounts": accounts })))
}

async fn delete_method(app_state: &AppState, table: MethodTable, customer_id: i64, id: i64) -> Result<HttpResponse, AppError> {
  db::payments::delete(&app_state.db_pool, table, customer_id, id).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Payment method deleted." })))
}

async fn default_method(app_state: &AppState, table: MethodTable, customer_id: i64, id: i64) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.db_pool.begin().await?;
  db::payments::set_default(&mut tx, table, customer_id, id).await?;
  tx.commit().await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Default payment method set." })))
}

pub async fn delete_credit_card_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  delete_method(&app_state, MethodTable::CreditCards, customer.0.id(), path.into_inner()).await
}

pub async fn default_credit_card_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  default_method(&app_state, MethodTable::CreditCards, customer.0.id(), path.into_inner()).await
}

pub async fn delete_bank_account_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  delete_method(&app_state, MethodTable::BankAccounts, customer.0.id(), path.into_inner()).await
}

pub async fn default_bank_account_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  default_method(&app_state, MethodTable::BankAccounts, customer.0.id(), path.into_inner()).await
}

// --- Wishlist ---

#[instrument(name = "handler::add_to_wishlist", skip_all, fields(customer_id = customer.0.id(), product_id = payload.product_id))]
pub async fn add_to_wishlist_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<WishlistPayload>,
) -> Result<HttpResponse, AppError> {
  db::products::require_listing(&app_state.db_pool, payload.product_id).await?;
  if db::wishlist::add(&app_state.db_pool, customer.0.id(), payload.product_id).await? {
    Ok(HttpResponse::Created().json(json!({ "message": "Added to wishlist." })))
  } else {
    Ok(HttpResponse::Ok().json(json!({ "message": "Already in wishlist." })))
  }
}

pub async fn remove_from_wishlist_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  if !db::wishlist::remove(&app_state.db_pool, customer.0.id(), path.into_inner()).await? {
    return Err(AppError::not_found("Wishlist entry"));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Removed from wishlist." })))
}

pub async fn list_wishlist_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let products = db::wishlist::list(&app_state.db_pool, customer.0.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}
