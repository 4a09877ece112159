//! Shared utilities for comps
//!
//! Logging setup used by the `comps` binary and anything else embedding the
//! screening library.

pub mod logging;

pub use logging::{LogFormat, init_tracing};
