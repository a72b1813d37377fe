//! Capability identities and service errors.
//!
//! A *capability* is a trait extending [`Service`]. The trait object type
//! (`dyn UserService`) is the identity used to key providers in the
//! [`ServiceRegistry`](crate::registry::ServiceRegistry).
//!
//! # Example
//!
//! ```
//! use injector_system::service::{Service, ServiceId};
//!
//! pub trait UserService: Service {
//!     fn name(&self) -> String;
//! }
//!
//! let id = ServiceId::of::<dyn UserService>();
//! assert!(id.type_name().contains("UserService"));
//! assert!(!id.is_marker());
//! assert!(ServiceId::of::<dyn Service>().is_marker());
//! ```

use core::any::TypeId;
use core::fmt;

/// Universal marker for capability traits.
///
/// Every capability trait extends `Service`. Any `Send + Sync + 'static`
/// type automatically implements it, so providers only need to implement
/// their capability trait.
///
/// `dyn Service` on its own carries no distinguishing capability and is
/// never registered.
pub trait Service: Send + Sync + 'static {}

// Blanket implementation for all compatible types
impl<T: Send + Sync + 'static> Service for T {}

/// The kind of provider a capability is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Data-holding provider with shared asset lifetime.
    ///
    /// The registry keeps the provider alive.
    Passive,
    /// Behavior-holding provider owned by the host scene.
    ///
    /// The registry only keeps a weak reference.
    Active,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passive => f.write_str("passive"),
            Self::Active => f.write_str("active"),
        }
    }
}

/// Unique identifier for a capability type.
///
/// Equality and hashing only consider the underlying [`TypeId`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceId {
    /// Creates a `ServiceId` for the given capability type.
    #[must_use]
    pub fn of<S: ?Sized + Service>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: core::any::type_name::<S>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if this is the universal [`Service`] marker itself.
    #[must_use]
    pub fn is_marker(&self) -> bool {
        self.type_id == TypeId::of::<dyn Service>()
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceId {}

impl core::hash::Hash for ServiceId {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Errors reported by the registry, locators and inspector hooks.
///
/// None of these abort the caller. They are logged where they are detected
/// and surfaced as values for callers that want to inspect them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Two providers of the same kind expose the same capability.
    /// The later one was dropped.
    #[error("duplication in {kind} provider list: {service}")]
    Duplicate {
        /// The provider list the duplicate was found in.
        kind: ProviderKind,
        /// The capability registered twice.
        service: &'static str,
    },

    /// No provider is registered for the requested capability.
    #[error("no service found for {0}")]
    NotFound(&'static str),

    /// No service registry is attached to the scene.
    #[error("service registry is missing")]
    RegistryMissing,

    /// The service registry is attached but exclusively borrowed, e.g. while a
    /// [`Scene::registry_mut`](crate::scene::Scene::registry_mut) guard is live.
    #[error("service registry is busy")]
    RegistryBusy,

    /// The active provider for this capability has been dropped by its owner.
    #[error("active provider for {0} is no longer alive")]
    Expired(&'static str),

    /// A provider was registered under the bare [`Service`] marker and has
    /// no distinguishing capability. It was skipped.
    #[error("provider {0} declares no capability and was skipped")]
    Unidentified(&'static str),

    /// An on-value-changed hook names a callback the target does not have.
    #[error("callback '{callback}' not found on {target}")]
    MissingCallback {
        /// Type name of the inspected object.
        target: &'static str,
        /// Callback name declared by the hook.
        callback: &'static str,
    },
}
