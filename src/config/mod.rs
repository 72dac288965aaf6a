//! Configuration management for netsweep.
//!
//! Settings live in an XDG-compliant configuration directory and provide
//! the defaults that command-line flags override.

mod settings;

pub use settings::{AppSettings, Paths};
