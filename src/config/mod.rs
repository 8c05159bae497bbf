//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → SpaConfig (validated, immutable)
//!     → plain values handed to each subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the site is compiled once per process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, ObservabilityConfig, SiteConfig, SpaConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
