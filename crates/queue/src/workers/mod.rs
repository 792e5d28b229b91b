//! Job workers.

mod preference;

pub use preference::{PreferenceContext, PreferenceWorker, preference_worker};
