// hearth-server/src/models/user.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Staff,
  Admin,
}

impl Role {
  /// Staff and admins manage the catalog.
  pub fn can_manage_catalog(self) -> bool {
    matches!(self, Role::Staff | Role::Admin)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerProfile {
  pub user_id: i64,
  pub phone_no: String,
  pub gender: Option<String>,
  pub date_of_birth: Option<NaiveDate>,
  #[serde(skip_serializing)]
  pub profile_picture_key: Option<String>,
  #[serde(skip_serializing)]
  pub profile_picture_type: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
  pub token: String,
  pub user_id: i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}
