// tests/cart_checkout.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::*;
use hearth_server::db::carts::MAX_LINE_QUANTITY;
use hearth_server::models::Role;
use serde_json::{json, Value};

fn add_line(token: &str, product_id: i64, kind: &str, quantity: i64) -> TestRequest {
  TestRequest::post()
    .uri("/api/v1/cart/add")
    .insert_header(bearer(token))
    .set_json(json!({ "product_id": product_id, "type": kind, "quantity": quantity }))
}

fn line_sum(cart: &Value) -> i64 {
  cart["items"]
    .as_array()
    .expect("items")
    .iter()
    .map(|l| l["line_total_cents"].as_i64().unwrap_or_default())
    .sum()
}

#[actix_web::test]
async fn cart_total_tracks_every_mutation() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "kim", Role::Customer).await;
  let chair = seed_product(&env.state, ProductSpec::default()).await;
  let lamp = seed_product(
    &env.state,
    ProductSpec {
      name: "Lamp",
      digital_price_cents: Some(250),
      physical_price_cents: None,
      stock: 0,
      ..Default::default()
    },
  )
  .await;
  let app = test_app!(env.state);

  let (status, body) = call!(app, add_line(&customer.token, chair, "physical", 2));
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["total_price_cents"], 2 * 12_999);

  // Same (product, kind) adds to the existing line.
  let (_, body) = call!(app, add_line(&customer.token, chair, "physical", 1));
  assert_eq!(body["total_price_cents"], 3 * 12_999);

  let (_, body) = call!(app, add_line(&customer.token, lamp, "digital", 4));
  assert_eq!(body["total_price_cents"], 3 * 12_999 + 4 * 250);

  let (status, cart) = call!(app, TestRequest::get().uri("/api/v1/cart").insert_header(bearer(&customer.token)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cart["items"].as_array().map(Vec::len), Some(2));
  assert_eq!(cart["total_price_cents"], line_sum(&cart));

  let lamp_line = cart["items"]
    .as_array()
    .and_then(|items| items.iter().find(|l| l["product_id"] == lamp))
    .map(|l| l["id"].as_i64().unwrap_or_default())
    .expect("lamp line");
  let (status, body) = call!(
    app,
    TestRequest::delete()
      .uri(&format!("/api/v1/cart/remove/{lamp_line}"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total_price_cents"], 3 * 12_999);

  let (status, _) = call!(
    app,
    TestRequest::delete()
      .uri(&format!("/api/v1/cart/remove/{lamp_line}"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, summary) = call!(
    app,
    TestRequest::get()
      .uri("/api/v1/cart/summary?tax=3.50&shipping=abc&discount=1")
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(
    summary,
    json!({
      "subtotal": "389.97",
      "tax": "3.50",
      "shipping": "0.00",
      "discount": "1.00",
      "total": "392.47",
    })
  );

  let (status, _) = call!(app, TestRequest::delete().uri("/api/v1/cart/clear").insert_header(bearer(&customer.token)));
  assert_eq!(status, StatusCode::OK);
  let (_, cart) = call!(app, TestRequest::get().uri("/api/v1/cart").insert_header(bearer(&customer.token)));
  assert_eq!(cart["items"], json!([]));
  assert_eq!(cart["total_price_cents"], 0);
}

#[actix_web::test]
async fn add_to_cart_checks_kind_and_stock() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "lee", Role::Customer).await;
  let digital_only = seed_product(
    &env.state,
    ProductSpec {
      name: "Poster",
      physical_price_cents: None,
      ..Default::default()
    },
  )
  .await;
  let scarce = seed_product(&env.state, ProductSpec { name: "Sofa", stock: 2, ..Default::default() }).await;
  let app = test_app!(env.state);

  let (status, _) = call!(app, add_line(&customer.token, digital_only, "physical", 1));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(app, add_line(&customer.token, digital_only, "hologram", 1));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(app, add_line(&customer.token, scarce, "physical", 0));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(app, add_line(&customer.token, 424_242, "digital", 1));
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call!(app, add_line(&customer.token, scarce, "physical", 2));
  assert_eq!(status, StatusCode::CREATED);
  // Existing quantity counts against stock.
  let (status, _) = call!(app, add_line(&customer.token, scarce, "physical", 1));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  // Digital copies are not limited by stock.
  let (status, _) = call!(app, add_line(&customer.token, scarce, "digital", 10));
  assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn checkout_then_complete_grants_owned_items_once() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "max", Role::Customer).await;
  let chair = seed_product(&env.state, ProductSpec::default()).await;
  let shelf = seed_product(&env.state, ProductSpec { name: "Shelf", is_container: true, ..Default::default() }).await;
  let app = test_app!(env.state);

  let (status, _) = call!(app, TestRequest::post().uri("/api/v1/orders/checkout").insert_header(bearer(&customer.token)));
  assert_eq!(status, StatusCode::BAD_REQUEST, "empty cart cannot be checked out");

  call!(app, add_line(&customer.token, chair, "physical", 2));
  call!(app, add_line(&customer.token, chair, "digital", 2));
  call!(app, add_line(&customer.token, shelf, "digital", 1));

  let (status, body) = call!(app, TestRequest::post().uri("/api/v1/orders/checkout").insert_header(bearer(&customer.token)));
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let order_id = id_of(&body, "order_id");
  assert_eq!(body["total_price_cents"], 2 * 12_999 + 2 * 499 + 499);

  let (_, cart) = call!(app, TestRequest::get().uri("/api/v1/cart").insert_header(bearer(&customer.token)));
  assert_eq!(cart["items"], json!([]));

  let (_, detail) = call!(app, TestRequest::get().uri(&format!("/api/v1/products/get_product_detail/{chair}")));
  assert_eq!(detail["stock"], 3);

  let (status, order) = call!(
    app,
    TestRequest::get().uri(&format!("/api/v1/orders/{order_id}")).insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(order["status"], "pending");
  assert_eq!(order["items"].as_array().map(Vec::len), Some(3));

  // Completing straight from pending skips the payment step.
  let complete = TestRequest::post()
    .uri(&format!("/api/v1/orders/{order_id}/complete"))
    .insert_header(bearer(&customer.token));
  let (status, _) = call!(app, complete);
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri(&format!("/api/v1/orders/{order_id}/payment_completed"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK);

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri(&format!("/api/v1/orders/{order_id}/complete"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["owned_item_ids"].as_array().map(Vec::len), Some(3));

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri(&format!("/api/v1/orders/{order_id}/complete"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, items) = call!(app, TestRequest::get().uri("/api/v1/digital_home/items").insert_header(bearer(&customer.token)));
  let items = items["items"].as_array().cloned().unwrap_or_default();
  assert_eq!(items.len(), 3);
  assert_eq!(items.iter().filter(|i| i["is_container"] == true).count(), 1);
  for item in &items {
    assert_eq!(item["transform"]["position"], json!([0.0, 0.0, 0.0, 0.0]));
    assert_eq!(item["transform"]["scale"], json!([1.0, 1.0, 1.0]));
    assert_eq!(item["position_history"], json!([]));
    assert_eq!(item["home_id"], Value::Null);
  }
}

#[actix_web::test]
async fn cancelling_restores_physical_stock() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "nia", Role::Customer).await;
  let other = seed_user(&env.state, "oli", Role::Customer).await;
  let chair = seed_product(&env.state, ProductSpec::default()).await;
  let app = test_app!(env.state);

  call!(app, add_line(&customer.token, chair, "physical", 4));
  let (_, body) = call!(app, TestRequest::post().uri("/api/v1/orders/checkout").insert_header(bearer(&customer.token)));
  let order_id = id_of(&body, "order_id");

  let (_, detail) = call!(app, TestRequest::get().uri(&format!("/api/v1/products/get_product_detail/{chair}")));
  assert_eq!(detail["stock"], 1);

  let (status, _) = call!(
    app,
    TestRequest::get().uri(&format!("/api/v1/orders/{order_id}")).insert_header(bearer(&other.token))
  );
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri(&format!("/api/v1/orders/{order_id}/cancel"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "cancelled");

  let (_, detail) = call!(app, TestRequest::get().uri(&format!("/api/v1/products/get_product_detail/{chair}")));
  assert_eq!(detail["stock"], 5);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri(&format!("/api/v1/orders/{order_id}/payment_completed"))
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, orders) = call!(app, TestRequest::get().uri("/api/v1/orders").insert_header(bearer(&customer.token)));
  assert_eq!(orders["orders"][0]["id"], order_id);
}

#[actix_web::test]
async fn cart_lines_are_capped_before_and_after_merging() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "ola", Role::Customer).await;
  let chair = seed_product(&env.state, ProductSpec::default()).await;
  let app = test_app!(env.state);

  let (status, _) = call!(app, add_line(&customer.token, chair, "digital", 1 << 42));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(app, add_line(&customer.token, chair, "digital", MAX_LINE_QUANTITY));
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call!(app, add_line(&customer.token, chair, "digital", 1));
  assert_eq!(status, StatusCode::BAD_REQUEST, "merged line would exceed the cap");

  let (_, cart) = call!(app, TestRequest::get().uri("/api/v1/cart").insert_header(bearer(&customer.token)));
  assert_eq!(cart["items"][0]["quantity"], MAX_LINE_QUANTITY);
  assert_eq!(cart["total_price_cents"], MAX_LINE_QUANTITY * 499);
}

#[actix_web::test]
async fn oversized_summary_amounts_are_rejected() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "pia", Role::Customer).await;
  let app = test_app!(env.state);

  let (status, body) = call!(
    app,
    TestRequest::get()
      .uri("/api/v1/cart/summary?tax=92233720368547758.07&shipping=1")
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

  let (status, body) = call!(
    app,
    TestRequest::get()
      .uri("/api/v1/cart/summary?discount=92233720368547758.07&tax=-92233720368547758.07")
      .insert_header(bearer(&customer.token))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}
