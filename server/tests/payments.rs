// tests/payments.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::*;
use hearth_server::models::Role;
use serde_json::{json, Value};

fn card(brand: &str, last4: &str, is_default: bool) -> Value {
  json!({
    "provider": "stripe",
    "provider_token": format!("tok_{last4}"),
    "card_brand": brand,
    "last4": last4,
    "exp_month": 12,
    "exp_year": 2030,
    "is_default": is_default,
  })
}

fn last4s(list: &Value) -> Vec<String> {
  list
    .as_array()
    .expect("array")
    .iter()
    .map(|m| m["last4"].as_str().unwrap_or_default().to_string())
    .collect()
}

fn defaults(list: &Value) -> usize {
  list.as_array().expect("array").iter().filter(|m| m["is_default"] == true).count()
}

#[actix_web::test]
async fn credit_cards_keep_one_default_and_hide_tokens() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "rue", Role::Customer).await;
  let app = test_app!(env.state);
  let add = |body: Value| {
    TestRequest::post()
      .uri("/api/v1/users/credit_cards")
      .insert_header(bearer(&customer.token))
      .set_json(body)
  };

  let (status, _) = call!(app, add(json!({ "provider": "", "provider_token": "tok" })));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, add(json!({ "provider": "stripe", "provider_token": "  " })));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call!(app, add(card("visa", "1111", true)));
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert!(body["credit_card"].get("provider_token").is_none());
  let first = body["credit_card"]["id"].as_i64().expect("card id");

  let (_, body) = call!(app, add(card("amex", "2222", false)));
  let second = body["credit_card"]["id"].as_i64().expect("card id");
  call!(app, add(card("mastercard", "3333", false)));

  let list = TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&customer.token));
  let (status, body) = call!(app, list);
  assert_eq!(status, StatusCode::OK);
  let cards = &body["credit_cards"];
  // Default first, then newest.
  assert_eq!(last4s(cards), vec!["1111", "3333", "2222"]);
  assert!(cards.as_array().expect("cards").iter().all(|c| c.get("provider_token").is_none()));

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri(&format!("/api/v1/users/credit_cards/{second}/default"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK);
  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&customer.token)));
  assert_eq!(defaults(&body["credit_cards"]), 1);
  assert_eq!(body["credit_cards"][0]["id"], second);

  // A new default replaces the old one.
  call!(app, add(card("visa", "4444", true)));
  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&customer.token)));
  assert_eq!(defaults(&body["credit_cards"]), 1);
  assert_eq!(body["credit_cards"][0]["last4"], "4444");

  let delete = TestRequest::delete()
    .uri(&format!("/api/v1/users/credit_cards/{first}"))
    .insert_header(bearer(&customer.token));
  let (status, _) = call!(app, delete);
  assert_eq!(status, StatusCode::OK);
  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&customer.token)));
  assert_eq!(last4s(&body["credit_cards"]), vec!["4444", "3333", "2222"]);
}

#[actix_web::test]
async fn bank_accounts_default_the_provider_and_require_names() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "sol", Role::Customer).await;
  let app = test_app!(env.state);
  let add = |body: Value| {
    TestRequest::post()
      .uri("/api/v1/users/bank_accounts")
      .insert_header(bearer(&customer.token))
      .set_json(body)
  };

  let (status, _) = call!(app, add(json!({ "bank_name": "", "account_holder": "Sol" })));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, add(json!({ "bank_name": "First Bank", "account_holder": " " })));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call!(
    app,
    add(json!({
      "provider_token": "btok_1",
      "bank_name": "First Bank",
      "account_holder": "Sol",
      "last4": "9001",
    }))
  );
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["bank_account"]["provider"], "bank");
  assert!(body["bank_account"].get("provider_token").is_none());
  let first = body["bank_account"]["id"].as_i64().expect("account id");

  let (_, body) = call!(
    app,
    add(json!({ "bank_name": "Second Bank", "account_holder": "Sol", "last4": "9002", "is_default": true }))
  );
  let second = body["bank_account"]["id"].as_i64().expect("account id");

  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/bank_accounts").insert_header(bearer(&customer.token)));
  assert_eq!(last4s(&body["bank_accounts"]), vec!["9002", "9001"]);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri(&format!("/api/v1/users/bank_accounts/{first}/default"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK);
  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/bank_accounts").insert_header(bearer(&customer.token)));
  assert_eq!(defaults(&body["bank_accounts"]), 1);
  assert_eq!(body["bank_accounts"][0]["id"], first);
  assert_eq!(body["bank_accounts"][1]["id"], second);
}

#[actix_web::test]
async fn payment_methods_are_private_to_their_owner() {
  let env = test_env().await;
  let owner = seed_user(&env.state, "tam", Role::Customer).await;
  let other = seed_user(&env.state, "uri", Role::Customer).await;
  let staff = seed_user(&env.state, "val", Role::Staff).await;
  let app = test_app!(env.state);

  let (_, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/credit_cards")
      .insert_header(bearer(&owner.token))
      .set_json(card("visa", "5555", false))
  );
  let card_id = body["credit_card"]["id"].as_i64().expect("card id");
  let (_, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/bank_accounts")
      .insert_header(bearer(&owner.token))
      .set_json(json!({ "bank_name": "First Bank", "account_holder": "Tam" }))
  );
  let account_id = body["bank_account"]["id"].as_i64().expect("account id");

  for uri in [
    format!("/api/v1/users/credit_cards/{card_id}"),
    format!("/api/v1/users/bank_accounts/{account_id}"),
  ] {
    let (status, _) = call!(app, TestRequest::delete().uri(&uri).insert_header(bearer(&other.token)));
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    let (status, _) = call!(
      app,
      TestRequest::put().uri(&format!("{uri}/default")).insert_header(bearer(&other.token))
    );
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
  }

  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&other.token)));
  assert_eq!(body["credit_cards"], json!([]));
  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&owner.token)));
  assert_eq!(last4s(&body["credit_cards"]), vec!["5555"]);

  let (status, _) = call!(app, TestRequest::get().uri("/api/v1/users/credit_cards").insert_header(bearer(&staff.token)));
  assert_eq!(status, StatusCode::FORBIDDEN);
}
