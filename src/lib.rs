//! A small service-locator and dependency-injection layer.
//!
//! Capabilities are trait objects registered against a [`ServiceRegistry`]
//! singleton. Consumers hold [`Injected`] handles that resolve a capability
//! on first use and keep it.
//!
//! ```
//! use std::sync::Arc;
//! use simple_injector::prelude::*;
//!
//! trait Clock: Service {
//!     fn now(&self) -> u64;
//! }
//!
//! struct Fixed;
//! impl Clock for Fixed {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! scene.attach(
//!     ServiceRegistry::new()
//!         .with_auto_init(true)
//!         .with_passive::<dyn Clock>(Arc::new(Fixed)),
//! );
//!
//! let clock: Injected<dyn Clock> = Injected::new();
//! assert_eq!(clock.value(&scene).unwrap().now(), 42);
//! ```
//!
//! [`ServiceRegistry`]: injector_system::registry::ServiceRegistry
//! [`Injected`]: injector_system::injected::Injected

pub use injector_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use injector_internal::prelude::*;
}
