//! Core infrastructure singletons for `simple_injector`.
//!
//! - [`TracingSetup`] - Logging and observability via the `tracing` crate
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use injector_system::prelude::*;
//! use injector_core::TracingSetup;
//!
//! trait Save: Service {}
//! struct DiskSave;
//! impl Save for DiskSave {}
//!
//! let mut scene = Scene::new();
//! scene.attach(TracingSetup::default());
//! scene.attach(
//!     ServiceRegistry::new()
//!         .with_auto_init(true)
//!         .with_passive::<dyn Save>(Arc::new(DiskSave)),
//! );
//!
//! assert!(scene.get_service::<dyn Save>().is_some());
//! ```

mod tracing_setup;

pub use tracing_setup::{TracingConfig, TracingFormat, TracingSetup};
