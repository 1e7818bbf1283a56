// tests/reviews.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::*;
use hearth_server::models::Role;
use serde_json::json;

fn add_review(token: &str, product_id: i64, rating: i64) -> TestRequest {
  TestRequest::post()
    .uri("/api/v1/reviews/add")
    .insert_header(bearer(token))
    .set_json(json!({ "product_id": product_id, "rating": rating, "comment": "  solid build  " }))
}

fn detail(product_id: i64) -> TestRequest {
  TestRequest::get().uri(&format!("/api/v1/products/get_product_detail/{product_id}"))
}

#[actix_web::test]
async fn rating_follows_every_review_write() {
  let env = test_env().await;
  let ana = seed_user(&env.state, "ana", Role::Customer).await;
  let ben = seed_user(&env.state, "ben", Role::Customer).await;
  let product_id = seed_product(&env.state, ProductSpec::default()).await;
  let app = test_app!(env.state);

  let (status, body) = call!(app, add_review(&ana.token, product_id, 5));
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let ana_review = id_of(&body, "review_id");
  assert_eq!(body["product_rating"], 5.0);

  let (status, body) = call!(app, add_review(&ben.token, product_id, 2));
  assert_eq!(status, StatusCode::CREATED);
  let ben_review = id_of(&body, "review_id");
  assert_eq!(body["product_rating"], 3.5);

  let (_, product) = call!(app, detail(product_id));
  assert_eq!(product["rating"], 3.5);
  assert_eq!(product["review_ids"].as_array().map(Vec::len), Some(2));

  let (status, body) = call!(app, add_review(&ana.token, product_id, 4));
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/reviews/edit")
      .insert_header(bearer(&ana.token))
      .set_json(json!({ "review_id": ben_review, "rating": 1 }))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/reviews/edit")
      .insert_header(bearer(&ben.token))
      .set_json(json!({ "review_id": ben_review, "rating": 4 }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["product_rating"], 4.5);

  let (status, body) = call!(
    app,
    TestRequest::delete()
      .uri(&format!("/api/v1/reviews/delete/{ana_review}"))
      .insert_header(bearer(&ana.token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["product_rating"], 4.0);

  let (status, body) = call!(
    app,
    TestRequest::delete()
      .uri(&format!("/api/v1/reviews/delete/{ben_review}"))
      .insert_header(bearer(&ben.token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["product_rating"], 0.0);
}

#[actix_web::test]
async fn invalid_reviews_are_rejected() {
  let env = test_env().await;
  let ana = seed_user(&env.state, "ana", Role::Customer).await;
  let staff = seed_user(&env.state, "sid", Role::Staff).await;
  let product_id = seed_product(&env.state, ProductSpec::default()).await;
  let app = test_app!(env.state);

  let (status, _) = call!(app, add_review(&ana.token, product_id, 6));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, add_review(&ana.token, product_id, 0));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, add_review(&ana.token, 777, 3));
  assert_eq!(status, StatusCode::NOT_FOUND);
  // Only customers review.
  let (status, _) = call!(app, add_review(&staff.token, product_id, 3));
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, product) = call!(app, detail(product_id));
  assert_eq!(product["rating"], 0.0);
}

#[actix_web::test]
async fn review_images_belong_to_the_author() {
  let env = test_env().await;
  let ana = seed_user(&env.state, "ana", Role::Customer).await;
  let ben = seed_user(&env.state, "ben", Role::Customer).await;
  let product_id = seed_product(&env.state, ProductSpec::default()).await;
  let app = test_app!(env.state);
  let baseline = env.blobs.len();

  let (_, body) = call!(app, add_review(&ana.token, product_id, 4));
  let review_id = id_of(&body, "review_id");

  let upload = |token: &str, bytes: &'static [u8]| {
    TestRequest::put()
      .uri(&format!("/api/v1/reviews/{review_id}/image"))
      .insert_header(bearer(token))
      .insert_header(("Content-Type", "image/jpeg"))
      .set_payload(bytes)
  };
  let (status, _) = call!(app, upload(&ben.token, b"\xff\xd8 intruder"));
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call!(app, upload(&ana.token, b"\xff\xd8 first"));
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call!(app, upload(&ana.token, b"\xff\xd8 second"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(env.blobs.len(), baseline + 1, "the replaced image is removed");

  let resp = actix_web::test::call_service(
    &app,
    TestRequest::get().uri(&format!("/api/v1/reviews/{review_id}/image")).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(actix_web::test::read_body(resp).await.as_ref(), b"\xff\xd8 second");

  let (_, listing) = call!(app, TestRequest::get().uri(&format!("/api/v1/reviews/product/{product_id}")));
  assert_eq!(listing["reviews"][0]["has_image"], true);
  assert_eq!(listing["reviews"][0]["username"], "ana");
  assert_eq!(listing["reviews"][0]["comment"], "solid build");

  let (_, mine) = call!(app, TestRequest::get().uri("/api/v1/reviews/mine").insert_header(bearer(&ana.token)));
  assert_eq!(mine["reviews"].as_array().map(Vec::len), Some(1));

  let (status, _) = call!(
    app,
    TestRequest::delete()
      .uri(&format!("/api/v1/reviews/delete/{review_id}"))
      .insert_header(bearer(&ana.token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(env.blobs.len(), baseline);

  let (status, _) = call!(app, TestRequest::get().uri(&format!("/api/v1/reviews/{review_id}/image")));
  assert_eq!(status, StatusCode::NOT_FOUND);
}
