//! The service registry.
//!
//! [`ServiceRegistry`] maps a capability identity to exactly one provider
//! per [`ProviderKind`]. Providers are configured up front, the maps are
//! built once by [`setup()`](ServiceRegistry::setup), and read many times
//! afterwards.
//!
//! # Lifecycle
//!
//! 1. **Configure** - `add_passive` / `add_active` (or the `with_*` builders)
//! 2. **Setup** - build both maps, reporting duplicates (idempotent)
//! 3. **Lookup** - `get_service::<dyn Capability>()`
//! 4. **Teardown** - maps cleared, registry marked not working
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use injector_system::registry::ServiceRegistry;
//! use injector_system::service::Service;
//!
//! pub trait Greeter: Service {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! let mut registry = ServiceRegistry::new().with_passive::<dyn Greeter>(Arc::new(English));
//! assert!(registry.setup().is_empty());
//!
//! let greeter = registry.get_service::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

use core::any::Any;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;

use crate::inspect::{Inspectable, OnValueChanged};
use crate::scene::{Scene, Singleton};
use crate::service::{ProviderKind, Service, ServiceError, ServiceId};

/// Type-erased provider reference.
///
/// Holds an `Arc<S>` for passive providers and a `Weak<S>` for active ones,
/// where `S` is the capability type named by the entry's [`ServiceId`].
type ErasedProvider = Arc<dyn Any + Send + Sync>;

/// A configured provider, as listed before [`ServiceRegistry::setup`].
#[derive(Clone)]
pub struct ProviderEntry {
    service: ServiceId,
    kind: ProviderKind,
    /// Address of the provider instance, used to recognise repeated entries.
    addr: usize,
    provider: ErasedProvider,
}

impl ProviderEntry {
    fn passive<S: ?Sized + Service>(provider: Arc<S>) -> Self {
        Self {
            service: ServiceId::of::<S>(),
            kind: ProviderKind::Passive,
            addr: Arc::as_ptr(&provider).cast::<()>().addr(),
            provider: Arc::new(provider),
        }
    }

    fn active<S: ?Sized + Service>(provider: &Arc<S>) -> Self {
        Self {
            service: ServiceId::of::<S>(),
            kind: ProviderKind::Active,
            addr: Arc::as_ptr(provider).cast::<()>().addr(),
            provider: Arc::new(Arc::downgrade(provider)),
        }
    }

    /// The capability this provider is listed under.
    #[must_use]
    pub fn service(&self) -> ServiceId {
        self.service
    }

    /// Which list the provider belongs to.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Returns `true` if this entry refers to the same provider instance as `other`.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        self.addr == other.addr && self.service == other.service
    }

    /// Resolves the entry to a live provider.
    fn resolve<T: ?Sized + Service>(&self) -> Result<Arc<T>, ServiceError> {
        let type_name = core::any::type_name::<T>();
        match self.kind {
            ProviderKind::Passive => self
                .provider
                .downcast_ref::<Arc<T>>()
                .cloned()
                .ok_or(ServiceError::NotFound(type_name)),
            ProviderKind::Active => self
                .provider
                .downcast_ref::<Weak<T>>()
                .ok_or(ServiceError::NotFound(type_name))?
                .upgrade()
                .ok_or(ServiceError::Expired(type_name)),
        }
    }
}

impl core::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("service", &self.service.type_name())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Registry mapping capability identities to providers.
///
/// Holds one map per [`ProviderKind`]. Lookups check passive providers
/// first, then active ones.
///
/// The registry is also a [`Singleton`]: attached to a [`Scene`], it runs
/// [`setup()`](Self::setup) from its `init` hook when
/// [`auto_init`](Self::with_auto_init) is set, and tears itself down when
/// the scene destroys it.
#[derive(Default)]
pub struct ServiceRegistry {
    /// Passive providers in configuration order.
    passive_providers: Vec<ProviderEntry>,
    /// Active providers in configuration order.
    active_providers: Vec<ProviderEntry>,
    /// Whether `init` runs `setup()` automatically.
    auto_init: bool,
    passive: HashMap<ServiceId, ProviderEntry>,
    active: HashMap<ServiceId, ProviderEntry>,
    /// Set once `setup()` has completed.
    working: bool,
}

impl core::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("passive_providers", &self.passive_providers)
            .field("active_providers", &self.active_providers)
            .field("auto_init", &self.auto_init)
            .field("working", &self.working)
            .finish_non_exhaustive()
    }
}

impl ServiceRegistry {
    /// Creates an empty registry with `auto_init` disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets whether attaching the registry to a scene runs [`setup()`](Self::setup).
    #[must_use]
    pub fn with_auto_init(mut self, auto_init: bool) -> Self {
        self.auto_init = auto_init;
        self
    }

    /// Returns whether the registry sets itself up when attached.
    #[must_use]
    pub fn auto_init(&self) -> bool {
        self.auto_init
    }

    /// Adds a passive provider under capability `S`.
    ///
    /// The registry shares ownership of the provider. `S` is the lookup key,
    /// so name the capability with a turbofish or pass an `Arc<dyn Capability>`.
    /// An `Arc` of the concrete type is keyed by that concrete type, and
    /// `get_service::<dyn Capability>()` will not find it.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use injector_system::registry::ServiceRegistry;
    /// # use injector_system::service::Service;
    /// trait Settings: Service {}
    /// struct FileSettings;
    /// impl Settings for FileSettings {}
    ///
    /// let mut registry = ServiceRegistry::new();
    /// registry.add_passive::<dyn Settings>(Arc::new(FileSettings));
    /// assert_eq!(registry.passive_providers().len(), 1);
    /// ```
    pub fn add_passive<S: ?Sized + Service>(&mut self, provider: Arc<S>) -> &mut Self {
        self.passive_providers.push(ProviderEntry::passive(provider));
        self
    }

    /// Adds an active provider under capability `S`.
    ///
    /// Only a weak reference is kept; the caller owns the provider. Once it
    /// is dropped, lookups report [`ServiceError::Expired`]. As with
    /// [`add_passive()`](Self::add_passive), `S` is the lookup key.
    pub fn add_active<S: ?Sized + Service>(&mut self, provider: &Arc<S>) -> &mut Self {
        self.active_providers.push(ProviderEntry::active(provider));
        self
    }

    /// Builder form of [`add_passive()`](Self::add_passive).
    #[must_use]
    pub fn with_passive<S: ?Sized + Service>(mut self, provider: Arc<S>) -> Self {
        self.add_passive(provider);
        self
    }

    /// Builder form of [`add_active()`](Self::add_active).
    #[must_use]
    pub fn with_active<S: ?Sized + Service>(mut self, provider: &Arc<S>) -> Self {
        self.add_active(provider);
        self
    }

    /// Returns the configured passive providers, in order.
    #[must_use]
    pub fn passive_providers(&self) -> &[ProviderEntry] {
        &self.passive_providers
    }

    /// Returns the configured active providers, in order.
    #[must_use]
    pub fn active_providers(&self) -> &[ProviderEntry] {
        &self.active_providers
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────

    /// Builds both provider maps from the configured lists.
    ///
    /// Does nothing if the registry is already working. Otherwise every entry
    /// is registered under its capability, in list order. Entries that
    /// collide with an earlier entry of the same kind are dropped, and
    /// entries listed under the bare [`Service`] marker are skipped.
    ///
    /// Problems are logged and returned; they never abort setup.
    pub fn setup(&mut self) -> Vec<ServiceError> {
        if self.working {
            return Vec::new();
        }

        let mut errors = Vec::new();
        register_all(&self.passive_providers, &mut self.passive, &mut errors);
        register_all(&self.active_providers, &mut self.active, &mut errors);
        self.working = true;

        tracing::debug!(
            passive = self.passive.len(),
            active = self.active.len(),
            rejected = errors.len(),
            "service registry set up"
        );
        errors
    }

    /// Returns `true` once [`setup()`](Self::setup) has completed.
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.working
    }

    /// Clears both maps and marks the registry as not set up.
    ///
    /// The configured provider lists are kept, so a later `setup()` rebuilds
    /// the same maps.
    pub fn teardown(&mut self) {
        self.passive.clear();
        self.active.clear();
        self.working = false;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Looks up the provider for capability `T`.
    ///
    /// Passive providers are checked before active ones. Failures are logged
    /// and yield `None`.
    #[must_use]
    pub fn get_service<T: ?Sized + Service>(&self) -> Option<Arc<T>> {
        self.try_get_service::<T>()
            .inspect_err(|err| tracing::error!(error = %err, "service lookup failed"))
            .ok()
    }

    /// Looks up the provider for capability `T` without logging.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if neither map has `T` (including before setup)
    /// - [`ServiceError::Expired`] if `T`'s active provider has been dropped
    pub fn try_get_service<T: ?Sized + Service>(&self) -> Result<Arc<T>, ServiceError> {
        let id = ServiceId::of::<T>();

        if let Some(entry) = self.passive.get(&id) {
            return entry.resolve::<T>();
        }

        self.active
            .get(&id)
            .ok_or(ServiceError::NotFound(id.type_name()))?
            .resolve::<T>()
    }

    /// Returns `true` if a provider is registered for `T` in either map.
    #[must_use]
    pub fn contains<T: ?Sized + Service>(&self) -> bool {
        let id = ServiceId::of::<T>();
        self.passive.contains_key(&id) || self.active.contains_key(&id)
    }

    /// Returns the number of registered providers across both maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passive.len() + self.active.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passive.is_empty() && self.active.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editor hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Removes repeated passive entries of the same provider instance.
    ///
    /// Returns the number of entries removed.
    pub fn remove_passive_duplicates(&mut self) -> usize {
        let removed = dedup_instances(&mut self.passive_providers);
        if removed > 0 {
            tracing::warn!(removed, "duplicate elements were removed from the passive list");
        }
        removed
    }

    /// Removes repeated active entries of the same provider instance.
    ///
    /// Returns the number of entries removed.
    pub fn remove_active_duplicates(&mut self) -> usize {
        let removed = dedup_instances(&mut self.active_providers);
        if removed > 0 {
            tracing::warn!(removed, "duplicate elements were removed from the active list");
        }
        removed
    }
}

/// Registers each entry of one provider list into its map.
fn register_all(
    entries: &[ProviderEntry],
    map: &mut HashMap<ServiceId, ProviderEntry>,
    errors: &mut Vec<ServiceError>,
) {
    for entry in entries {
        let service = entry.service;

        if service.is_marker() {
            tracing::warn!(kind = %entry.kind, "provider declares no capability, skipping");
            errors.push(ServiceError::Unidentified(service.type_name()));
            continue;
        }

        if map.contains_key(&service) {
            let err = ServiceError::Duplicate {
                kind: entry.kind,
                service: service.type_name(),
            };
            tracing::error!(kind = %entry.kind, service = %service, "{err}");
            errors.push(err);
            continue;
        }

        tracing::debug!(kind = %entry.kind, service = %service, "provider registered");
        map.insert(service, entry.clone());
    }
}

/// Keeps the first entry of every provider instance, preserving order.
fn dedup_instances(entries: &mut Vec<ProviderEntry>) -> usize {
    let before = entries.len();
    let mut kept: Vec<ProviderEntry> = Vec::with_capacity(before);
    for entry in entries.drain(..) {
        if !kept.iter().any(|k| k.same_instance(&entry)) {
            kept.push(entry);
        }
    }
    *entries = kept;
    before - entries.len()
}

fn snapshot_list(entries: &[ProviderEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}@{:#x}\n", e.service, e.addr))
        .collect()
}

impl Singleton for ServiceRegistry {
    fn init(&mut self, _scene: &Scene) {
        if self.auto_init {
            self.setup();
        }
    }

    fn on_destroy(&mut self) {
        self.teardown();
    }
}

impl Inspectable for ServiceRegistry {
    fn on_value_changed(&self) -> &'static [OnValueChanged] {
        const HOOKS: &[OnValueChanged] = &[
            OnValueChanged::new("passive_providers", "remove_passive_duplicates"),
            OnValueChanged::new("active_providers", "remove_active_duplicates"),
        ];
        HOOKS
    }

    fn snapshot(&self, field: &str) -> Option<String> {
        match field {
            "passive_providers" => Some(snapshot_list(&self.passive_providers)),
            "active_providers" => Some(snapshot_list(&self.active_providers)),
            "auto_init" => Some(self.auto_init.to_string()),
            _ => None,
        }
    }

    fn invoke(&mut self, callback: &str) -> bool {
        match callback {
            "remove_passive_duplicates" => {
                self.remove_passive_duplicates();
                true
            }
            "remove_active_duplicates" => {
                self.remove_active_duplicates();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Audio: Service {
        fn volume(&self) -> u8;
    }

    trait Input: Service {
        fn device(&self) -> &'static str;
    }

    struct Mixer(u8);
    impl Audio for Mixer {
        fn volume(&self) -> u8 {
            self.0
        }
    }

    struct Keyboard;
    impl Input for Keyboard {
        fn device(&self) -> &'static str {
            "keyboard"
        }
    }

    #[test]
    fn setup_registers_unique_providers() {
        let keyboard: Arc<dyn Input> = Arc::new(Keyboard);
        let mut registry = ServiceRegistry::new()
            .with_passive::<dyn Audio>(Arc::new(Mixer(7)))
            .with_active(&keyboard);

        assert!(registry.setup().is_empty());
        assert!(registry.is_working());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_service::<dyn Audio>().unwrap().volume(), 7);
        assert_eq!(registry.get_service::<dyn Input>().unwrap().device(), "keyboard");
    }

    #[test]
    fn duplicate_keeps_first_provider() {
        let mut registry = ServiceRegistry::new()
            .with_passive::<dyn Audio>(Arc::new(Mixer(1)))
            .with_passive::<dyn Audio>(Arc::new(Mixer(2)));

        let errors = registry.setup();

        assert_eq!(
            errors,
            vec![ServiceError::Duplicate {
                kind: ProviderKind::Passive,
                service: core::any::type_name::<dyn Audio>(),
            }]
        );
        assert_eq!(registry.get_service::<dyn Audio>().unwrap().volume(), 1);
    }

    #[test]
    fn duplicates_are_per_kind() {
        let active: Arc<dyn Audio> = Arc::new(Mixer(2));
        let mut registry = ServiceRegistry::new()
            .with_passive::<dyn Audio>(Arc::new(Mixer(1)))
            .with_active(&active);

        assert!(registry.setup().is_empty());
        assert_eq!(registry.len(), 2);
        // passive wins
        assert_eq!(registry.get_service::<dyn Audio>().unwrap().volume(), 1);
    }

    #[test]
    fn setup_is_idempotent() {
        let mut registry = ServiceRegistry::new()
            .with_passive::<dyn Audio>(Arc::new(Mixer(1)))
            .with_passive::<dyn Audio>(Arc::new(Mixer(2)));

        assert_eq!(registry.setup().len(), 1);
        assert!(registry.setup().is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_service::<dyn Audio>().unwrap().volume(), 1);
    }

    #[test]
    fn lookup_before_setup_is_not_found() {
        let registry = ServiceRegistry::new().with_passive::<dyn Audio>(Arc::new(Mixer(1)));

        assert!(!registry.is_working());
        assert!(registry.get_service::<dyn Audio>().is_none());
        assert!(matches!(
            registry.try_get_service::<dyn Audio>(),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_capability_is_not_found() {
        let mut registry = ServiceRegistry::new().with_passive::<dyn Audio>(Arc::new(Mixer(1)));
        registry.setup();

        assert!(!registry.contains::<dyn Input>());
        assert!(matches!(
            registry.try_get_service::<dyn Input>(),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn marker_only_provider_is_skipped() {
        let mut registry = ServiceRegistry::new().with_passive::<dyn Service>(Arc::new(Mixer(1)));

        let errors = registry.setup();

        assert!(matches!(errors.as_slice(), [ServiceError::Unidentified(_)]));
        assert!(registry.is_empty());
        assert!(registry.is_working());
    }

    #[test]
    fn concrete_provider_is_keyed_by_its_own_type() {
        let mut registry = ServiceRegistry::new().with_passive(Arc::new(Mixer(4)));

        assert!(registry.setup().is_empty());
        assert_eq!(
            registry.passive_providers()[0].service(),
            ServiceId::of::<Mixer>()
        );
        assert!(registry.contains::<Mixer>());
        assert!(!registry.contains::<dyn Audio>());
        assert!(matches!(
            registry.try_get_service::<dyn Audio>(),
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(registry.get_service::<Mixer>().unwrap().volume(), 4);
    }

    #[test]
    fn dropped_active_provider_expires() {
        let keyboard: Arc<dyn Input> = Arc::new(Keyboard);
        let mut registry = ServiceRegistry::new().with_active(&keyboard);
        registry.setup();
        assert!(registry.get_service::<dyn Input>().is_some());

        drop(keyboard);

        assert!(matches!(
            registry.try_get_service::<dyn Input>(),
            Err(ServiceError::Expired(_))
        ));
        assert!(registry.get_service::<dyn Input>().is_none());
    }

    #[test]
    fn teardown_allows_rebuild() {
        let mut registry = ServiceRegistry::new().with_passive::<dyn Audio>(Arc::new(Mixer(3)));
        registry.setup();

        registry.teardown();
        assert!(!registry.is_working());
        assert!(registry.is_empty());

        registry.setup();
        assert_eq!(registry.get_service::<dyn Audio>().unwrap().volume(), 3);
    }

    #[test]
    fn remove_duplicates_only_drops_repeated_instances() {
        let shared: Arc<dyn Audio> = Arc::new(Mixer(1));
        let mut registry = ServiceRegistry::new();
        registry
            .add_passive(Arc::clone(&shared))
            .add_passive::<dyn Audio>(Arc::new(Mixer(2)))
            .add_passive(Arc::clone(&shared));

        assert_eq!(registry.remove_passive_duplicates(), 1);
        assert_eq!(registry.passive_providers().len(), 2);
        assert_eq!(registry.remove_passive_duplicates(), 0);
    }

    #[test]
    fn dedup_keeps_first_occurrence_as_registration_winner() {
        let first: Arc<dyn Audio> = Arc::new(Mixer(1));
        let mut registry = ServiceRegistry::new();
        registry
            .add_passive(Arc::clone(&first))
            .add_passive::<dyn Audio>(Arc::new(Mixer(2)))
            .add_passive(Arc::clone(&first));

        registry.remove_passive_duplicates();
        let errors = registry.setup();

        assert_eq!(errors.len(), 1);
        assert!(registry.passive_providers()[0].same_instance(&ProviderEntry::passive(first)));
        assert_eq!(registry.get_service::<dyn Audio>().unwrap().volume(), 1);
    }

    #[test]
    fn snapshot_tracks_list_changes() {
        let mut registry = ServiceRegistry::new();
        let before = registry.snapshot("passive_providers").unwrap();

        registry.add_passive::<dyn Audio>(Arc::new(Mixer(1)));
        let after = registry.snapshot("passive_providers").unwrap();

        assert_ne!(before, after);
        assert!(registry.snapshot("unknown").is_none());
    }
}
