// tests/auth_flow.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::*;
use hearth_server::models::Role;
use serde_json::json;

fn registration(username: &str) -> serde_json::Value {
  json!({
    "username": username,
    "password": "correct horse",
    "first_name": "Ada",
    "last_name": "Lovelace",
    "email": format!("{username}@Example.com"),
    "phone_no": "5550100",
  })
}

#[actix_web::test]
async fn register_then_login_by_email_and_logout() {
  let env = test_env().await;
  let app = test_app!(env.state);

  let resp = actix_web::test::call_service(
    &app,
    TestRequest::post().uri("/api/v1/users/register").set_json(registration("ada")).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert!(resp.response().cookies().any(|c| c.name() == "username" && c.value() == "ada"));

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/login")
      .set_json(json!({ "identifier": "ADA@example.com", "password": "correct horse" }))
  );
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["is_admin"], false);
  assert_eq!(body["is_staff"], false);
  let token = body["token"].as_str().expect("token").to_string();

  let (status, body) = call!(
    app,
    TestRequest::get().uri("/api/v1/users/is_logged_in").insert_header(bearer(&token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "logged_in": true, "username": "ada" }));

  // A second login on a live session is refused.
  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/login")
      .insert_header(bearer(&token))
      .set_json(json!({ "identifier": "ada", "password": "correct horse" }))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call!(app, TestRequest::delete().uri("/api/v1/users/logout").insert_header(bearer(&token)));
  assert_eq!(status, StatusCode::OK);

  let (status, body) = call!(
    app,
    TestRequest::get().uri("/api/v1/users/is_logged_in").insert_header(bearer(&token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["logged_in"], false);
}

#[actix_web::test]
async fn registration_rejects_duplicates_and_weak_passwords() {
  let env = test_env().await;
  let app = test_app!(env.state);

  let (status, _) = call!(app, TestRequest::post().uri("/api/v1/users/register").set_json(registration("bob")));
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = call!(app, TestRequest::post().uri("/api/v1/users/register").set_json(registration("bob")));
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap_or_default().contains("Username"));

  let mut weak = registration("carol");
  weak["password"] = json!("short");
  let (status, _) = call!(app, TestRequest::post().uri("/api/v1/users/register").set_json(weak));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let mut no_at = registration("dave");
  no_at["email"] = json!("dave.example.com");
  let (status, _) = call!(app, TestRequest::post().uri("/api/v1/users/register").set_json(no_at));
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn bad_credentials_are_unauthorized() {
  let env = test_env().await;
  seed_user(&env.state, "erin", Role::Customer).await;
  let app = test_app!(env.state);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/login")
      .set_json(json!({ "identifier": "erin", "password": "wrong password" }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = call!(
    app,
    TestRequest::post().uri("/api/v1/users/login").set_json(json!({ "identifier": " ", "password": "" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(app, TestRequest::get().uri("/api/v1/users/profile"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_bootstrap_then_staff_registration() {
  let env = test_env().await;
  let customer = seed_user(&env.state, "frank", Role::Customer).await;
  let app = test_app!(env.state);

  let admin_payload = |name: &str| {
    json!({ "username": name, "password": "correct horse", "first_name": "Root", "last_name": "Admin" })
  };
  let (status, body) = call!(
    app,
    TestRequest::post().uri("/api/v1/users/admin/register").set_json(admin_payload("root"))
  );
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["role"], "admin");

  // Once an admin exists, anonymous admin registration is closed.
  let (status, _) = call!(
    app,
    TestRequest::post().uri("/api/v1/users/admin/register").set_json(admin_payload("root2"))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/login")
      .set_json(json!({ "identifier": "root", "password": "correct horse" }))
  );
  assert_eq!(body["is_admin"], true);
  let admin_token = body["token"].as_str().expect("token").to_string();

  let staff = json!({
    "username": "sam",
    "password": "correct horse",
    "first_name": "Sam",
    "last_name": "Staff",
    "email": "sam@example.com",
  });
  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/staff/register")
      .insert_header(bearer(&customer.token))
      .set_json(staff.clone())
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/staff/register")
      .insert_header(bearer(&admin_token))
      .set_json(staff)
  );
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["role"], "staff");
}

#[actix_web::test]
async fn profile_update_and_password_change() {
  let env = test_env().await;
  let user = seed_user(&env.state, "gina", Role::Customer).await;
  seed_user(&env.state, "taken", Role::Customer).await;
  let app = test_app!(env.state);

  let (status, body) = call!(app, TestRequest::get().uri("/api/v1/users/profile").insert_header(bearer(&user.token)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["username"], "gina");
  assert_eq!(body["has_profile_picture"], false);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/users/profile/update")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "username": "taken" }))
  );
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/users/profile/update")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "date_of_birth": "31/12/1990" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/users/profile/update")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "first_name": "Georgina", "date_of_birth": "1990-12-31" }))
  );
  assert_eq!(status, StatusCode::OK);

  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/profile").insert_header(bearer(&user.token)));
  assert_eq!(body["first_name"], "Georgina");
  assert_eq!(body["date_of_birth"], "1990-12-31");

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/users/change_password")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "current_password": "not it at all", "new_password": "battery staple" }))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/users/change_password")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "current_password": "correct horse", "new_password": "battery staple" }))
  );
  assert_eq!(status, StatusCode::OK);

  // Every session was revoked.
  let (status, _) = call!(app, TestRequest::get().uri("/api/v1/users/profile").insert_header(bearer(&user.token)));
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/login")
      .set_json(json!({ "identifier": "gina", "password": "battery staple" }))
  );
  assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn login_token_is_single_use() {
  let env = test_env().await;
  let user = seed_user(&env.state, "hana", Role::Customer).await;
  let app = test_app!(env.state);

  let (status, body) = call!(app, TestRequest::get().uri("/api/v1/users/login_token").insert_header(bearer(&user.token)));
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().expect("token").to_string();

  let (status, body) = call!(
    app,
    TestRequest::post().uri("/api/v1/users/login_token/verify").set_json(json!({ "token": token }))
  );
  assert_eq!(status, StatusCode::OK);
  assert!(body["token"].is_string());

  let (status, _) = call!(
    app,
    TestRequest::post().uri("/api/v1/users/login_token/verify").set_json(json!({ "token": token }))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn profile_picture_round_trip_and_account_deletion() {
  let env = test_env().await;
  let user = seed_user(&env.state, "ivan", Role::Customer).await;
  let app = test_app!(env.state);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/profile/upload_profile_picture")
      .insert_header(bearer(&user.token))
      .insert_header(("Content-Type", "image/gif"))
      .set_payload("GIF89a")
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/profile/upload_profile_picture")
      .insert_header(bearer(&user.token))
      .insert_header(("Content-Type", "image/png"))
      .set_payload(&b"\x89PNG fake"[..])
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(env.blobs.len(), 1);

  let resp = actix_web::test::call_service(
    &app,
    TestRequest::get()
      .uri("/api/v1/users/profile/picture")
      .insert_header(bearer(&user.token))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(actix_web::test::read_body(resp).await.as_ref(), b"\x89PNG fake");

  let (status, _) = call!(app, TestRequest::delete().uri("/api/v1/users/delete").insert_header(bearer(&user.token)));
  assert_eq!(status, StatusCode::OK);
  assert!(env.blobs.is_empty());

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/v1/users/login")
      .set_json(json!({ "identifier": "ivan", "password": "correct horse" }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn addresses_keep_a_single_default() {
  let env = test_env().await;
  let user = seed_user(&env.state, "jo", Role::Customer).await;
  let app = test_app!(env.state);

  let mut ids = Vec::new();
  for (address, is_default) in [("1 Elm St", true), ("2 Oak Ave", true), ("3 Pine Rd", false)] {
    let (status, body) = call!(
      app,
      TestRequest::post()
        .uri("/api/v1/users/address/add")
        .insert_header(bearer(&user.token))
        .set_json(json!({ "address": address, "is_default": is_default }))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    ids.push(body["address"]["id"].as_i64().expect("address id"));
  }

  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/address").insert_header(bearer(&user.token)));
  let defaults: Vec<_> = body["addresses"]
    .as_array()
    .expect("addresses")
    .iter()
    .filter(|a| a["is_default"] == true)
    .map(|a| a["address"].clone())
    .collect();
  assert_eq!(defaults, vec![json!("2 Oak Ave")]);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/v1/users/address/set_default")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "address_id": ids[2] }))
  );
  assert_eq!(status, StatusCode::OK);

  let (_, body) = call!(app, TestRequest::get().uri("/api/v1/users/address").insert_header(bearer(&user.token)));
  let first = &body["addresses"][0];
  assert_eq!(first["address"], "3 Pine Rd");
  assert_eq!(first["is_default"], true);

  let (status, _) = call!(
    app,
    TestRequest::delete()
      .uri("/api/v1/users/address/delete")
      .insert_header(bearer(&user.token))
      .set_json(json!({ "address_id": 9999 }))
  );
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn health_check_reports_ok() {
  let env = test_env().await;
  let app = test_app!(env.state);

  let (status, body) = call!(app, TestRequest::get().uri("/api/v1/health"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}
