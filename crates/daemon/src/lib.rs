//! # Deckhand Daemon Library
//!
//! This crate provides the daemon functionality for Deckhand, an admin
//! sidecar for a containerized game server.
//!
//! ## Overview
//!
//! The daemon runs next to the game server and exposes a small HTTP API:
//!
//! - **Mod Management**: List, upload, delete and toggle plugin archives
//! - **File Management**: Browse and edit a sandboxed directory subtree
//! - **Status Probe**: Query the server over its status protocol
//! - **Lifecycle Control**: Restart the server's container
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP API (axum)                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐   │
//! │  │  Mod Store   │  │  File Tree   │  │ Lifecycle Controller │   │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────┬───────────┘   │
//! │         │                 │                     │               │
//! │  ┌──────┴─────────────────┴──────┐   ┌──────────┴───────────┐   │
//! │  │       Path Sandbox            │   │   Container Runtime  │   │
//! │  └───────────────────────────────┘   └──────────────────────┘   │
//! │                                                                 │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │    Status Probe  (wire codec from the protocol crate)    │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every caller-supplied path is validated by the sandbox before any
//! filesystem call, and every fact (mod state included) is re-derived from
//! the directory contents at call time; the daemon keeps no state of its
//! own between requests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::api::{build_router, AppState};
//! use daemon::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     config.validate()?;
//!
//!     let state = AppState::from_config(&config);
//!     let router = build_router(state, config.http.max_body_size as usize);
//!
//!     let listener = tokio::net::TcpListener::bind(&config.http.bind_addr).await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading, env overrides and validation
//! - [`files`]: Path sandbox and the confined file tree
//! - [`mods`]: Mod archive store with filename-encoded enabled state
//! - [`probe`]: Status queries against the game server
//! - [`lifecycle`]: Container restart via the runtime CLI
//! - [`api`]: The axum router and error-to-status translation

pub mod api;
pub mod config;
pub mod files;
pub mod lifecycle;
pub mod mods;
pub mod probe;

// Re-export protocol for convenience
pub use protocol;

// Re-export config types for convenience
pub use config::Config;

// Re-export files types for convenience
pub use files::{FileContent, FileTree, Sandbox, SandboxError, TreeEntry, TreeError};

// Re-export mod types for convenience
pub use mods::{ModEntry, ModError, ModStore, ToggleOutcome};

// Re-export probe types for convenience
pub use probe::{StatusProbe, StatusSnapshot};

// Re-export lifecycle types for convenience
pub use lifecycle::{
    ContainerRuntime, DockerCli, ImageMarkerLocator, LifecycleController, LifecycleError,
    UnitDescriptor, UnitLocator,
};

// Re-export API types for convenience
pub use api::{build_router, ApiError, AppState};
