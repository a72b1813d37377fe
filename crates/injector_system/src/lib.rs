//! The service layer for `simple_injector`.
//!
//! `injector_system` provides the primitives for wiring capabilities to
//! providers:
//!
//! - [`service`] - Capability marker trait, identities and errors
//! - [`registry`] - Flat capability → provider registry
//! - [`injected`] - Lazily resolved, memoizing service handles
//! - [`scene`] - One-instance-per-type singleton lifecycle
//! - [`inspect`] - Named change hooks for editor tooling
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use injector_system::prelude::*;
//!
//! pub trait UserService: Service {
//!     fn name(&self) -> String;
//! }
//!
//! struct Guest;
//! impl UserService for Guest {
//!     fn name(&self) -> String {
//!         "guest".into()
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! scene.attach(
//!     ServiceRegistry::new()
//!         .with_auto_init(true)
//!         .with_passive::<dyn UserService>(Arc::new(Guest)),
//! );
//!
//! let user: Injected<dyn UserService> = Injected::new();
//! assert_eq!(user.value(&scene).unwrap().name(), "guest");
//! ```

/// Capability identities and errors.
pub mod service;

/// Service registry.
pub mod registry;

/// Lazy service handles.
pub mod injected;

/// Scene lifecycle and singletons.
pub mod scene;

/// Change hooks for inspected fields.
pub mod inspect;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::injected::*;
    pub use crate::inspect::*;
    pub use crate::registry::*;
    pub use crate::scene::*;
    pub use crate::service::*;
}
