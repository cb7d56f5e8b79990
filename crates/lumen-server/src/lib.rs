//! Lumen HTTP server: configuration and application assembly.
//!
//! The binary in `main.rs` reads [`ServerConfig`], opens the SQLite store and
//! serves [`app`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use lumen_api::{AppState, api_router};
use lumen_core::store::ProgressStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `LUMEN_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// Pass mark given to courses created without one.
  #[serde(default = "default_pass_mark")]
  pub default_pass_mark: u8,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf {
  PathBuf::from("~/.local/share/lumen/lumen.db")
}

fn default_pass_mark() -> u8 { 70 }

impl ServerConfig {
  /// Reject values the rest of the system cannot honour.
  pub fn validate(&self) -> anyhow::Result<()> {
    anyhow::ensure!(
      self.default_pass_mark <= 100,
      "default_pass_mark must be at most 100, got {}",
      self.default_pass_mark
    );
    Ok(())
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The full HTTP application for `store`, with request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: ProgressStore + 'static,
{
  api_router(AppState::new(store, config.default_pass_mark))
    .layer(TraceLayer::new_for_http())
}
