//! ID generation utilities.

use std::sync::{LazyLock, Mutex, PoisonError};

use ulid::Generator;

use crate::{AppError, AppResult};

/// Process-wide so IDs from every [`IdGenerator`] share one ordering.
static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// IDs are strictly increasing within the process, including IDs minted in
    /// the same millisecond, so votes can be paginated newest-first by ID alone.
    ///
    /// # Errors
    /// Returns `Internal` if the random part overflows within one millisecond.
    pub fn generate(&self) -> AppResult<String> {
        let ulid = GENERATOR
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .map_err(|e| AppError::Internal(format!("Failed to generate ID: {e}")))?;

        Ok(ulid.to_string().to_lowercase())
    }
}
