// hearth-server/src/db/payments.rs

//! Credit cards and bank accounts share the same default-handling rules, so
//! the statements are parameterised by table.

use crate::errors::{AppError, Result};
use crate::models::{BankAccount, CreditCard};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

const CARD_COLUMNS: &str =
  "id, customer_id, provider, provider_token, card_brand, last4, exp_month, exp_year, is_default, created_at";
const BANK_COLUMNS: &str =
  "id, customer_id, provider, provider_token, bank_name, account_holder, last4, is_default, created_at";

#[derive(Debug, Clone, Copy)]
pub enum MethodTable {
  CreditCards,
  BankAccounts,
}

impl MethodTable {
  fn name(self) -> &'static str {
    match self {
      MethodTable::CreditCards => "credit_cards",
      MethodTable::BankAccounts => "bank_accounts",
    }
  }

  fn label(self) -> &'static str {
    match self {
      MethodTable::CreditCards => "Credit card",
      MethodTable::BankAccounts => "Bank account",
    }
  }
}

async fn clear_default(conn: &mut SqliteConnection, table: MethodTable, customer_id: i64) -> Result<()> {
  sqlx::query(&format!("UPDATE {} SET is_default = 0 WHERE customer_id = $1", table.name()))
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

pub struct NewCard<'a> {
  pub provider: &'a str,
  pub provider_token: &'a str,
  pub card_brand: &'a str,
  pub last4: &'a str,
  pub exp_month: Option<i64>,
  pub exp_year: Option<i64>,
  pub is_default: bool,
}

pub async fn insert_card(conn: &mut SqliteConnection, customer_id: i64, card: &NewCard<'_>) -> Result<CreditCard> {
  if card.is_default {
    clear_default(conn, MethodTable::CreditCards, customer_id).await?;
  }
  Ok(
    sqlx::query_as::<_, CreditCard>(&format!(
      "INSERT INTO credit_cards (customer_id, provider, provider_token, card_brand, last4, exp_month, exp_year, is_default, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {CARD_COLUMNS}"
    ))
    .bind(customer_id)
    .bind(card.provider)
    .bind(card.provider_token)
    .bind(card.card_brand)
    .bind(card.last4)
    .bind(card.exp_month)
    .bind(card.exp_year)
    .bind(card.is_default)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?,
  )
}

pub struct NewBankAccount<'a> {
  pub provider: &'a str,
  pub provider_token: &'a str,
  pub bank_name: &'a str,
  pub account_holder: &'a str,
  pub last4: &'a str,
  pub is_default: bool,
}

pub async fn insert_bank_account(
  conn: &mut SqliteConnection,
  customer_id: i64,
  account: &NewBankAccount<'_>,
) -> Result<BankAccount> {
  if account.is_default {
    clear_default(conn, MethodTable::BankAccounts, customer_id).await?;
  }
  Ok(
    sqlx::query_as::<_, BankAccount>(&format!(
      "INSERT INTO bank_accounts (customer_id, provider, provider_token, bank_name, account_holder, last4, is_default, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {BANK_COLUMNS}"
    ))
    .bind(customer_id)
    .bind(account.provider)
    .bind(account.provider_token)
    .bind(account.bank_name)
    .bind(account.account_holder)
    .bind(account.last4)
    .bind(account.is_default)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?,
  )
}

pub async fn list_cards<'e, E>(exec: E, customer_id: i64) -> Result<Vec<CreditCard>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, CreditCard>(&format!(
      "SELECT {CARD_COLUMNS} FROM credit_cards WHERE customer_id = $1 ORDER BY is_default DESC, created_at DESC, id DESC"
    ))
    .bind(customer_id)
    .fetch_all(exec)
    .await?,
  )
}

pub async fn list_bank_accounts<'e, E>(exec: E, customer_id: i64) -> Result<Vec<BankAccount>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, BankAccount>(&format!(
      "SELECT {BANK_COLUMNS} FROM bank_accounts WHERE customer_id = $1 ORDER BY is_default DESC, created_at DESC, id DESC"
    ))
    .bind(customer_id)
    .fetch_all(exec)
    .await?,
  )
}

pub async fn delete<'e, E>(exec: E, table: MethodTable, customer_id: i64, id: i64) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query(&format!("DELETE FROM {} WHERE id = $1 AND customer_id = $2", table.name()))
    .bind(id)
    .bind(customer_id)
    .execute(exec)
    .await?;
  if done.rows_affected() == 0 {
    return Err(AppError::not_found(table.label()));
  }
  Ok(())
}

pub async fn set_default(conn: &mut SqliteConnection, table: MethodTable, customer_id: i64, id: i64) -> Result<()> {
  let exists: bool = sqlx::query_scalar(&format!(
    "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND customer_id = $2)",
    table.name()
  ))
  .bind(id)
  .bind(customer_id)
  .fetch_one(&mut *conn)
  .await?;
  if !exists {
    return Err(AppError::not_found(table.label()));
  }
  clear_default(conn, table, customer_id).await?;
  sqlx::query(&format!("UPDATE {} SET is_default = 1 WHERE id = $1", table.name()))
    .bind(id)
    .execute(&mut *conn)
    .await?;
  Ok(())
}
