//! turn-core: framework-agnostic core for Turnline.

pub mod config;
pub mod errors;

pub use config::{TurnConfig, TurnConfigSnapshot};
pub use errors::{ErrorKind, TurnError, TurnResult};
