//! Common utilities and shared types for tally.
//!
//! This crate provides foundational components used across all tally crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Telemetry**: `tracing` subscriber setup via [`init_tracing`]
//!
//! # Example
//!
//! ```no_run
//! use tally_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     tally_common::init_tracing(&config.logging)?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate()?;
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use telemetry::init_tracing;
