//! Built-in action providers.

pub mod aerodrome;
pub mod pendle;

pub use aerodrome::AerodromeActionProvider;
pub use pendle::{ExitGuard, PendleActionProvider, UncheckedExit};
