// hearth-server/src/telemetry.rs

use crate::config::LogFormat;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`
/// filter. Calling it twice is harmless; the second install is ignored.
pub fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE)
    .with_target(true);

  let installed = match format {
    LogFormat::Pretty => builder.pretty().try_init(),
    LogFormat::Json => builder.json().flatten_event(true).try_init(),
  };
  if installed.is_err() {
    tracing::debug!("Tracing subscriber already installed.");
  }
}
