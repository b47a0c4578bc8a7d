//! Timing helpers for phase logging.

use std::time::Instant;

/// RAII timer that logs elapsed time on drop.
///
/// # Example
/// ```ignore
/// let _t = Timed::info("Reverse grid index");
/// // ... build ...
/// // logs "Reverse grid index: 12.345ms" when _t is dropped
/// ```
pub(crate) struct Timed {
    name: &'static str,
    start: Instant,
    level: log::Level,
}

impl Timed {
    /// Create a new timer that logs at INFO level.
    pub(crate) fn info(name: &'static str) -> Self {
        log::debug!("{}...", name);
        Self {
            name,
            start: Instant::now(),
            level: log::Level::Info,
        }
    }

    /// Create a new timer that logs at DEBUG level.
    pub(crate) fn debug(name: &'static str) -> Self {
        log::trace!("{}...", name);
        Self {
            name,
            start: Instant::now(),
            level: log::Level::Debug,
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::log!(self.level, "{}: {:.3?}", self.name, self.start.elapsed());
    }
}
