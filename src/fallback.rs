//! Best-effort combinators for lookups whose failure must not propagate.
//!
//! Identity resolution and history lookups swallow errors on purpose. These
//! helpers make that explicit at the call site and log what was swallowed.

use std::fmt::Display;

pub trait BestEffort<T> {
    /// Converts an error into `None`, logging it at warn level.
    fn best_effort(self, what: &str) -> Option<T>;

    /// Converts an error into `T::default()`, logging it at warn level.
    fn or_default_logged(self, what: &str) -> T
    where
        T: Default;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(lookup = what, error = %e, "best-effort lookup failed, falling through");
                None
            }
        }
    }

    fn or_default_logged(self, what: &str) -> T
    where
        T: Default,
    {
        self.best_effort(what).unwrap_or_default()
    }
}
