//! # Shortlink Core
//!
//! An in-memory registry of short codes that stand in for target URLs. Every
//! record carries a click quota and a time-to-live.
//!
//! ## Features
//!
//! - Thread-safe indices using `DashMap` (no registry-wide lock)
//! - Lock-free click accounting via compare-and-swap on each record
//! - Eviction on quota exhaustion or expiry, whichever comes first
//! - One-shot expiry check per record on the Tokio runtime, plus lazy expiry on access
//! - Pluggable eviction notifications and code generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use shortlink_core::{Registry, RegistryConfig, RegistryError};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Records live 12 hours by default
//!     let registry = Registry::new();
//!
//!     // Or with custom settings
//!     let config = RegistryConfig::default()
//!         .with_shutdown_timeout(Duration::from_secs(2));
//!     let registry = Registry::with_config(config);
//!
//!     // A link that may be followed once
//!     let code = registry.create("https://a.example", "u1", 1).unwrap();
//!
//!     assert_eq!(registry.consume(&code, "u1").unwrap(), "https://a.example");
//!     assert!(matches!(
//!         registry.consume(&code, "u1"),
//!         Err(RegistryError::QuotaExceeded { .. })
//!     ));
//!     assert_eq!(registry.total_count(), 0);
//!
//!     // Drain pending expiry checks before exiting
//!     registry.shutdown().await;
//! }
//! ```

mod code;
mod config;
mod error;
mod notifier;
mod record;
mod registry;
mod scheduler;

pub use code::{seed_for, CodeGenerator, HashCodeGenerator, CODE_LENGTH};
pub use config::{RegistryConfig, DEFAULT_LIFETIME, DEFAULT_SHUTDOWN_TIMEOUT, MAX_LIFETIME};
pub use error::{RegistryError, Result};
pub use notifier::{EvictionNotifier, TracingNotifier};
pub use record::RecordSnapshot;
pub use registry::Registry;
