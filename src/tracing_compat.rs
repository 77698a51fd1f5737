//! Logging facade.
//!
//! With the `tracing-integration` feature the macros below are the `tracing`
//! crate's own. Without it they expand to nothing, so the engine carries no
//! logging cost unless asked to.
//!
//! ```rust,ignore
//! use crate::tracing_compat::{debug, trace, warn};
//!
//! trace!(winner = index, "race settled");
//! debug!(failures = 2, "all settled");
//! warn!(steps, "drive ran out of step budget");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    /// No-op trace-level logging macro.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op debug-level logging macro.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op warn-level logging macro.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    pub use crate::{debug, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;
