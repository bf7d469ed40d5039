//! Mirage API - Simulated Virtual Machine Manager
//!
//! Mirage looks like a desktop hypervisor but runs nothing. Machines are
//! records in an in-memory catalog; "booting" plays back a scripted console
//! log on a timer; the guest shell forwards each typed command to a language
//! model and shows whatever comes back as if a real shell had printed it.
//!
//! # Architecture
//!
//! - [`config`]: Configuration management and environment loading
//! - [`domain`]: Machine records, snapshots, and transcripts
//! - [`runtime`]: Registry, boot playback, shell framing, and the lifecycle controller
//! - [`llm`]: Text generation driver abstraction and provider implementations
//! - [`events`]: Change events broadcast to front-ends
//! - [`api`]: HTTP API endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! use mirage_api::{config::AppConfig, server::create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let app = create_app(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8090").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod llm;
pub mod logging;
pub mod runtime;
pub mod server;

use std::sync::Arc;

use config::AppConfig;
use runtime::Simulator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The running simulation.
    pub simulator: Simulator,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"AppConfig")
            .field("simulator", &self.simulator)
            .finish()
    }
}
