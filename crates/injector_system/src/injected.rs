//! Lazily resolved service handles.
//!
//! [`Injected<T>`] defers looking up capability `T` until it is first read,
//! then keeps the result. A lookup that fails is not remembered: the next
//! read asks again, so a handle read before the registry is set up recovers
//! once it is.
//!
//! Handles resolve through any [`ServiceLocator`], normally the [`Scene`]
//! or a [`ServiceRegistry`] directly.
//!
//! [`Scene`]: crate::scene::Scene
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use injector_system::injected::Injected;
//! use injector_system::registry::ServiceRegistry;
//! use injector_system::service::Service;
//!
//! pub trait Score: Service {
//!     fn points(&self) -> u32;
//! }
//!
//! struct Fixed(u32);
//! impl Score for Fixed {
//!     fn points(&self) -> u32 {
//!         self.0
//!     }
//! }
//!
//! let mut registry = ServiceRegistry::new().with_passive::<dyn Score>(Arc::new(Fixed(10)));
//! registry.setup();
//!
//! let score: Injected<dyn Score> = Injected::new();
//! assert!(!score.is_resolved());
//! assert_eq!(score.value(&registry).unwrap().points(), 10);
//! assert!(score.is_resolved());
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::registry::ServiceRegistry;
use crate::service::{Service, ServiceError};

/// Something that can resolve a capability to a provider.
pub trait ServiceLocator {
    /// Resolves capability `T`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] describing why `T` could not be resolved.
    fn locate<T: ?Sized + Service>(&self) -> Result<Arc<T>, ServiceError>;
}

impl ServiceLocator for ServiceRegistry {
    fn locate<T: ?Sized + Service>(&self) -> Result<Arc<T>, ServiceError> {
        self.try_get_service::<T>()
    }
}

/// A memoizing handle to capability `T`.
///
/// Cloning a handle copies its current memo; the clones resolve
/// independently afterwards.
pub struct Injected<T: ?Sized + Service> {
    cached: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized + Service> Injected<T> {
    /// Creates an unresolved handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cached: RwLock::new(None),
        }
    }

    /// Returns the provider for `T`, resolving it through `locator` if this
    /// handle has not resolved yet.
    ///
    /// Once resolved, the locator is never consulted again. A failed lookup
    /// is logged and leaves the handle unresolved.
    #[must_use]
    pub fn value<L: ServiceLocator + ?Sized>(&self, locator: &L) -> Option<Arc<T>> {
        if let Some(cached) = self.cached.read().as_ref() {
            return Some(Arc::clone(cached));
        }

        match locator.locate::<T>() {
            Ok(service) => {
                *self.cached.write() = Some(Arc::clone(&service));
                Some(service)
            }
            Err(err) => {
                tracing::error!(error = %err, "injected service could not be resolved");
                None
            }
        }
    }

    /// Consumes the handle, returning its provider.
    ///
    /// Equivalent to [`value()`](Self::value) for call sites that want the
    /// service itself rather than the handle.
    #[must_use]
    pub fn resolve_into<L: ServiceLocator + ?Sized>(self, locator: &L) -> Option<Arc<T>> {
        self.value(locator)
    }

    /// Returns the memoized provider without resolving.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<T>> {
        self.cached.read().clone()
    }

    /// Returns `true` if the handle holds a provider.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cached.read().is_some()
    }

    /// Creates a handle already holding `instance`.
    ///
    /// The handle never consults a locator.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn with_instance(instance: Arc<T>) -> Self {
        Self {
            cached: RwLock::new(Some(instance)),
        }
    }

    /// Replaces the memoized provider with `instance`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn inject_test_instance(&self, instance: Arc<T>) {
        *self.cached.write() = Some(instance);
    }
}

impl<T: ?Sized + Service> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Service> Clone for Injected<T> {
    fn clone(&self) -> Self {
        Self {
            cached: RwLock::new(self.cached()),
        }
    }
}

impl<T: ?Sized + Service> core::fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Injected")
            .field("service", &core::any::type_name::<T>())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
