// hearth-server/src/db/homes.rs

use crate::errors::{AppError, Result};
use crate::models::{Boundary, DigitalHome, LinkRelation, OwnedItem, OwnedItemDetail, Transform};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

const HOME_COLUMNS: &str = "id, customer_id, name, model_id, pos_x, pos_y, pos_z, rot_x, rot_y, rot_z, \
  scale_x, scale_y, scale_z, min_x, min_y, min_z, max_x, max_y, max_z, created_at, updated_at";

const OWNED_SELECT: &str = "SELECT o.id, o.customer_id, o.item_id, o.order_id, o.is_container, o.home_id, \
  o.texture_id, o.pos_x, o.pos_y, o.pos_z, o.pos_t, o.rot_x, o.rot_y, o.rot_z, o.scale_x, o.scale_y, o.scale_z, \
  o.position_history, o.created_at, o.updated_at, i.name AS item_name, i.category, i.model_id AS item_model_id \
  FROM owned_items o JOIN items i ON i.id = o.item_id";

/// Inserts a home with the identity transform and the given bounds.
pub async fn insert<'e, E>(exec: E, customer_id: i64, name: &str, model_id: i64, bounds: &Boundary) -> Result<DigitalHome>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, DigitalHome>(&format!(
      "INSERT INTO digital_homes (customer_id, name, model_id, min_x, min_y, min_z, max_x, max_y, max_z, \
       created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) RETURNING {HOME_COLUMNS}"
    ))
    .bind(customer_id)
    .bind(name)
    .bind(model_id)
    .bind(bounds.min[0])
    .bind(bounds.min[1])
    .bind(bounds.min[2])
    .bind(bounds.max[0])
    .bind(bounds.max[1])
    .bind(bounds.max[2])
    .bind(Utc::now())
    .fetch_one(exec)
    .await?,
  )
}

pub async fn find<'e, E>(exec: E, home_id: i64) -> Result<Option<DigitalHome>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, DigitalHome>(&format!("SELECT {HOME_COLUMNS} FROM digital_homes WHERE id = $1"))
      .bind(home_id)
      .fetch_optional(exec)
      .await?,
  )
}

/// The home `home_id`, which must belong to `customer_id`.
pub async fn owned_home<'e, E>(exec: E, customer_id: i64, home_id: i64) -> Result<DigitalHome>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  match find(exec, home_id).await? {
    Some(home) if home.customer_id == customer_id => Ok(home),
    Some(_) => Err(AppError::Forbidden("You do not own this digital home.".into())),
    None => Err(AppError::NotFound(format!("Digital home {home_id} not found."))),
  }
}

pub async fn list_for_customer<'e, E>(exec: E, customer_id: i64) -> Result<Vec<DigitalHome>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, DigitalHome>(&format!(
      "SELECT {HOME_COLUMNS} FROM digital_homes WHERE customer_id = $1 ORDER BY id"
    ))
    .bind(customer_id)
    .fetch_all(exec)
    .await?,
  )
}

/// Deletes the home row and returns its model asset id. Deployed items are
/// left in place but undeployed.
pub async fn delete(conn: &mut SqliteConnection, home_id: i64) -> Result<i64> {
  sqlx::query_scalar::<_, i64>("DELETE FROM digital_homes WHERE id = $1 RETURNING model_id")
    .bind(home_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Digital home {home_id} not found.")))
}

pub async fn list_owned<'e, E>(exec: E, customer_id: i64) -> Result<Vec<OwnedItemDetail>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, OwnedItemDetail>(&format!("{OWNED_SELECT} WHERE o.customer_id = $1 ORDER BY o.id"))
      .bind(customer_id)
      .fetch_all(exec)
      .await?,
  )
}

pub async fn find_owned<'e, E>(exec: E, owned_item_id: i64) -> Result<Option<OwnedItemDetail>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, OwnedItemDetail>(&format!("{OWNED_SELECT} WHERE o.id = $1"))
      .bind(owned_item_id)
      .fetch_optional(exec)
      .await?,
  )
}

pub async fn deployed_in<'e, E>(exec: E, home_id: i64) -> Result<Vec<OwnedItemDetail>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, OwnedItemDetail>(&format!("{OWNED_SELECT} WHERE o.home_id = $1 ORDER BY o.id"))
      .bind(home_id)
      .fetch_all(exec)
      .await?,
  )
}

/// Child ids linked under `owned_item_id` with `relation`.
pub async fn linked<'e, E>(exec: E, owned_item_id: i64, relation: LinkRelation) -> Result<Vec<i64>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar(
      "SELECT child_id FROM owned_item_links WHERE parent_id = $1 AND relation = $2 ORDER BY child_id",
    )
    .bind(owned_item_id)
    .bind(relation)
    .fetch_all(exec)
    .await?,
  )
}

/// Grants `count` owned copies of `item_id`, each at the identity transform
/// and carrying the item's container flag. Nothing is granted when the item
/// no longer exists.
pub async fn grant(
  conn: &mut SqliteConnection,
  customer_id: i64,
  order_id: i64,
  item_id: i64,
  count: i64,
) -> Result<Vec<i64>> {
  let now = Utc::now();
  let mut ids = Vec::new();
  for _ in 0..count {
    let id: Option<i64> = sqlx::query_scalar(
      "INSERT INTO owned_items (customer_id, item_id, order_id, is_container, created_at, updated_at) \
       SELECT $1, id, $2, is_container, $3, $3 FROM items WHERE id = $4 RETURNING id",
    )
    .bind(customer_id)
    .bind(order_id)
    .bind(now)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;
    match id {
      Some(id) => ids.push(id),
      None => break,
    }
  }
  Ok(ids)
}

/// Positions kept per owned item; older entries are dropped first.
pub const MAX_POSITION_HISTORY: usize = 50;

fn record_move(history: &mut Vec<[f64; 4]>, previous: [f64; 4], next: [f64; 4]) {
  if previous == next {
    return;
  }
  history.push(previous);
  if history.len() > MAX_POSITION_HISTORY {
    let excess = history.len() - MAX_POSITION_HISTORY;
    history.drain(..excess);
  }
}

/// New state of one owned item inside a home.
#[derive(Debug, Clone)]
pub struct Placement {
  pub owned_item_id: i64,
  pub transform: Transform,
  pub texture_id: Option<i64>,
  pub contains: Vec<i64>,
  pub composition: Vec<i64>,
}

/// Writes `placement` into `home_id`. The previous position is appended to
/// the item's history when the new one differs.
pub async fn place(conn: &mut SqliteConnection, home_id: i64, placement: &Placement) -> Result<()> {
  let current = sqlx::query_as::<_, OwnedItem>(
    "SELECT id, customer_id, item_id, order_id, is_container, home_id, texture_id, pos_x, pos_y, pos_z, pos_t, \
     rot_x, rot_y, rot_z, scale_x, scale_y, scale_z, position_history, created_at, updated_at \
     FROM owned_items WHERE id = $1",
  )
  .bind(placement.owned_item_id)
  .fetch_optional(&mut *conn)
  .await?
  .ok_or_else(|| AppError::NotFound(format!("Owned item {} not found.", placement.owned_item_id)))?;

  let previous = current.transform().position;
  let mut history = current.position_history;
  record_move(&mut history, previous, placement.transform.position);

  let Transform {
    position: [px, py, pz, pt],
    rotation: [rx, ry, rz],
    scale: [sx, sy, sz],
  } = placement.transform;
  sqlx::query(
    "UPDATE owned_items SET home_id = $2, texture_id = $3, pos_x = $4, pos_y = $5, pos_z = $6, pos_t = $7, \
     rot_x = $8, rot_y = $9, rot_z = $10, scale_x = $11, scale_y = $12, scale_z = $13, position_history = $14, \
     updated_at = $15 WHERE id = $1",
  )
  .bind(placement.owned_item_id)
  .bind(home_id)
  .bind(placement.texture_id)
  .bind(px)
  .bind(py)
  .bind(pz)
  .bind(pt)
  .bind(rx)
  .bind(ry)
  .bind(rz)
  .bind(sx)
  .bind(sy)
  .bind(sz)
  .bind(serde_json::to_string(&history)?)
  .bind(Utc::now())
  .execute(&mut *conn)
  .await?;

  sqlx::query("DELETE FROM owned_item_links WHERE parent_id = $1")
    .bind(placement.owned_item_id)
    .execute(&mut *conn)
    .await?;
  let links = placement
    .contains
    .iter()
    .map(|child| (*child, LinkRelation::Contains))
    .chain(placement.composition.iter().map(|child| (*child, LinkRelation::Composition)));
  for (child, relation) in links {
    sqlx::query("INSERT OR IGNORE INTO owned_item_links (parent_id, child_id, relation) VALUES ($1, $2, $3)")
      .bind(placement.owned_item_id)
      .bind(child)
      .bind(relation)
      .execute(&mut *conn)
      .await?;
  }
  Ok(())
}

/// Takes the item out of `home_id`; `false` when it was not deployed there.
pub async fn undeploy<'e, E>(exec: E, home_id: i64, owned_item_id: i64) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("UPDATE owned_items SET home_id = NULL, updated_at = $3 WHERE id = $1 AND home_id = $2")
    .bind(owned_item_id)
    .bind(home_id)
    .bind(Utc::now())
    .execute(exec)
    .await?;
  Ok(done.rows_affected() == 1)
}

/// Model asset ids of every home the customer owns, used before deleting
/// the account so the blobs can follow.
pub async fn model_ids_for_customer<'e, E>(exec: E, customer_id: i64) -> Result<Vec<i64>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar("SELECT model_id FROM digital_homes WHERE customer_id = $1")
      .bind(customer_id)
      .fetch_all(exec)
      .await?,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unchanged_position_is_not_recorded() {
    let mut history = vec![[1.0, 0.0, 0.0, 0.0]];
    record_move(&mut history, [2.0, 0.0, 0.0, 0.0], [2.0, 0.0, 0.0, 0.0]);
    assert_eq!(history, vec![[1.0, 0.0, 0.0, 0.0]]);
  }

  #[test]
  fn history_keeps_only_the_latest_moves() {
    let mut history = Vec::new();
    for step in 0..(MAX_POSITION_HISTORY + 10) {
      let x = step as f64;
      record_move(&mut history, [x, 0.0, 0.0, 0.0], [x + 1.0, 0.0, 0.0, 0.0]);
    }
    assert_eq!(history.len(), MAX_POSITION_HISTORY);
    assert_eq!(history[0], [10.0, 0.0, 0.0, 0.0]);
    assert_eq!(history[MAX_POSITION_HISTORY - 1], [(MAX_POSITION_HISTORY + 9) as f64, 0.0, 0.0, 0.0]);
  }
}
