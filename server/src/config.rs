// hearth-server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pretty" | "text" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(AppError::Config(format!("Unknown LOG_FORMAT '{other}'"))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Root directory of the filesystem blob store.
  pub asset_dir: PathBuf,
  pub session_ttl_hours: i64,
  pub login_token_ttl_secs: i64,
  pub max_upload_bytes: usize,
  pub max_profile_picture_bytes: usize,
  pub log_format: LogFormat,
}

fn env_or(var_name: &str, default: &str) -> String {
  env::var(var_name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(var_name: &str, default: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  env_or(var_name, default)
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {var_name}: {e}")))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let config = Self {
      server_host: env_or("SERVER_HOST", "127.0.0.1"),
      server_port: parse_env("SERVER_PORT", "8080")?,
      database_url: env_or("DATABASE_URL", "sqlite://hearth.db"),
      asset_dir: PathBuf::from(env_or("ASSET_DIR", "./hearth_assets")),
      session_ttl_hours: parse_env("SESSION_TTL_HOURS", "720")?,
      login_token_ttl_secs: parse_env("LOGIN_TOKEN_TTL_SECS", "60")?,
      max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", "67108864")?,
      max_profile_picture_bytes: parse_env("MAX_PROFILE_PICTURE_BYTES", "5242880")?,
      log_format: env_or("LOG_FORMAT", "pretty").parse()?,
    };

    if config.session_ttl_hours <= 0 || config.login_token_ttl_secs <= 0 {
      return Err(AppError::Config("Session and login token lifetimes must be positive".to_string()));
    }

    tracing::info!(host = %config.server_host, port = config.server_port, asset_dir = %config.asset_dir.display(), "Application configuration loaded.");
    Ok(config)
  }

  /// In-memory database and a throwaway asset directory.
  pub fn for_tests() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: "sqlite::memory:".to_string(),
      asset_dir: env::temp_dir().join("hearth-test-assets"),
      session_ttl_hours: 1,
      login_token_ttl_secs: 60,
      max_upload_bytes: 8 * 1024 * 1024,
      max_profile_picture_bytes: 5 * 1024 * 1024,
      log_format: LogFormat::Pretty,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_format_parses_case_insensitively() {
    assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    assert!("xml".parse::<LogFormat>().is_err());
  }
}
