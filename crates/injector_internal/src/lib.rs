//! # Injector Internal Library
//!
//! Re-exports the core `simple_injector` crates for convenience.

/// Service registry, lazy handles and singleton lifecycle.
pub use injector_system;

/// Infrastructure singletons.
pub use injector_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use injector_core::{TracingConfig, TracingFormat, TracingSetup};
    pub use injector_system::prelude::*;
}
