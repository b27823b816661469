//! # Application State Management
//!
//! This module holds the data every HTTP handler needs: the configuration loaded at
//! startup, the recognition relay, and the moment the server started.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Lets every actix worker share one copy of the configuration
//! - **Memory safety**: The data is freed when the last worker drops its reference
//!
//! ### No locks
//! Nothing in here changes after startup, so there is no `RwLock` or `Mutex`.
//! Requests only ever read shared state, which keeps them fully independent.

use crate::config::AppConfig;
use crate::relay::RecognitionRelay;
use std::sync::Arc;
use std::time::Instant;

/// The application state shared across all HTTP request handlers.
///
/// ## Rust Concepts:
/// - **#[derive(Clone)]**: actix clones the state into each worker; every field is
///   either an `Arc`, a pooled client, or `Copy`, so clones are cheap
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read-only configuration loaded once at startup
    pub config: Arc<AppConfig>,

    /// Signs and forwards samples to the recognition provider
    pub relay: RecognitionRelay,

    /// When the server started (used by the health endpoint)
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration.
    ///
    /// The relay receives its own copy of the provider section; nothing reaches
    /// for configuration through globals.
    pub fn new(config: AppConfig) -> Self {
        let relay = RecognitionRelay::new(config.provider.clone());
        Self {
            config: Arc::new(config),
            relay,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
