//! Scene lifecycle and singletons.
//!
//! A [`Scene`] owns at most one live instance of each [`Singleton`] type.
//! Singletons register themselves explicitly with
//! [`Scene::attach()`](Scene::attach); there is no global instance and no
//! implicit search.
//!
//! # Lifecycle
//!
//! Each attach moves a singleton through `Unattached` → `Attaching` → `Active`:
//!
//! 1. If an instance of the type is already active, the new object is
//!    destroyed immediately and [`Singleton::init`] is never called on it.
//! 2. Otherwise the object becomes the instance and `init` runs exactly once.
//!
//! Active instances stay until [`Scene::destroy`], [`Scene::teardown`] or the
//! scene is dropped, at which point [`Singleton::on_destroy`] runs.
//!
//! # Example
//!
//! ```
//! use injector_system::scene::{Attach, Scene, Singleton};
//!
//! #[derive(Default)]
//! struct GameManager {
//!     started: bool,
//! }
//!
//! impl Singleton for GameManager {
//!     fn init(&mut self, _scene: &Scene) {
//!         self.started = true;
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! assert_eq!(scene.attach(GameManager::default()), Attach::Active);
//! assert_eq!(scene.attach(GameManager::default()), Attach::Destroyed);
//!
//! assert!(scene.instance::<GameManager>().unwrap().started);
//! ```

use core::any::TypeId;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::injected::ServiceLocator;
use crate::registry::ServiceRegistry;
use crate::service::{Service, ServiceError};

// ─────────────────────────────────────────────────────────────────────────────
// Singleton Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A component with at most one live instance per [`Scene`].
///
/// Implementors put their one-time initialization in [`init()`](Self::init)
/// and release anything they hold in [`on_destroy()`](Self::on_destroy).
pub trait Singleton: DowncastSync {
    /// Called exactly once, when this object becomes the active instance.
    ///
    /// The object is already registered in `scene`, so other singletons can
    /// be reached from here. Looking up `Self` during `init` yields `None`.
    fn init(&mut self, _scene: &Scene) {}

    /// Called when the scene destroys this instance.
    fn on_destroy(&mut self) {}

    /// Returns the singleton's name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

impl_downcast!(sync Singleton);

/// Result of [`Scene::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// The object became the active instance and was initialized.
    Active,
    /// An instance already existed; the object was destroyed.
    Destroyed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scene
// ─────────────────────────────────────────────────────────────────────────────

/// Storage for a single attached instance.
struct SingletonEntry {
    data: RwLock<Box<dyn Singleton>>,
}

/// Lifecycle manager enforcing one instance per singleton type.
///
/// Instances are reached through RAII guards, like the registry's own
/// provider storage: [`instance()`](Self::instance) for shared access and
/// [`instance_mut()`](Self::instance_mut) for exclusive access.
///
/// Dropping the scene destroys every instance in reverse attach order.
#[derive(Default)]
pub struct Scene {
    singletons: HashMap<TypeId, SingletonEntry>,
    /// Attach order, used to destroy in reverse.
    order: Vec<TypeId>,
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scene")
            .field("singletons", &self.order.len())
            .finish()
    }
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a singleton to the scene.
    ///
    /// If an instance of `T` is already active, `singleton` is dropped
    /// without being initialized and [`Attach::Destroyed`] is returned.
    pub fn attach<T: Singleton>(&mut self, singleton: T) -> Attach {
        let id = TypeId::of::<T>();
        let name = core::any::type_name::<T>();

        if self.singletons.contains_key(&id) {
            tracing::info!(
                singleton = name,
                "destroying singleton because an instance already exists in the scene"
            );
            drop(singleton);
            return Attach::Destroyed;
        }

        self.singletons.insert(
            id,
            SingletonEntry {
                data: RwLock::new(Box::new(singleton)),
            },
        );
        self.order.push(id);

        let scene: &Scene = self;
        if let Some(entry) = scene.singletons.get(&id) {
            entry.data.write().init(scene);
        }

        tracing::debug!(singleton = name, "singleton attached");
        Attach::Active
    }

    /// Returns `true` if an instance of `T` is active.
    #[must_use]
    pub fn contains<T: Singleton>(&self) -> bool {
        self.singletons.contains_key(&TypeId::of::<T>())
    }

    /// Gets shared access to the active instance of `T`.
    ///
    /// Logs a warning and returns `None` if there is no instance, or if it
    /// is currently borrowed mutably.
    #[must_use]
    pub fn instance<T: Singleton>(&self) -> Option<SingletonRef<'_, T>> {
        let Some(entry) = self.singletons.get(&TypeId::of::<T>()) else {
            warn_missing::<T>();
            return None;
        };

        let Some(guard) = entry.data.try_read() else {
            warn_borrowed::<T>();
            return None;
        };

        Some(SingletonRef {
            guard,
            _marker: core::marker::PhantomData,
        })
    }

    /// Gets exclusive access to the active instance of `T`.
    ///
    /// Logs a warning and returns `None` if there is no instance, or if it
    /// is currently borrowed.
    #[must_use]
    pub fn instance_mut<T: Singleton>(&self) -> Option<SingletonRefMut<'_, T>> {
        let Some(entry) = self.singletons.get(&TypeId::of::<T>()) else {
            warn_missing::<T>();
            return None;
        };

        let Some(guard) = entry.data.try_write() else {
            warn_borrowed::<T>();
            return None;
        };

        Some(SingletonRefMut {
            guard,
            _marker: core::marker::PhantomData,
        })
    }

    /// Destroys the active instance of `T`, running its `on_destroy` hook.
    ///
    /// Returns `false` if there was no instance.
    pub fn destroy<T: Singleton>(&mut self) -> bool {
        let id = TypeId::of::<T>();
        if !self.destroy_by_id(id) {
            return false;
        }
        self.order.retain(|attached| *attached != id);
        true
    }

    /// Destroys every instance in reverse attach order.
    pub fn teardown(&mut self) {
        let order = core::mem::take(&mut self.order);
        for id in order.into_iter().rev() {
            self.destroy_by_id(id);
        }
    }

    /// Returns the number of active instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.singletons.len()
    }

    /// Returns `true` if no instance is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Service Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Shared access to the attached [`ServiceRegistry`].
    #[must_use]
    pub fn registry(&self) -> Option<SingletonRef<'_, ServiceRegistry>> {
        self.instance::<ServiceRegistry>()
    }

    /// Exclusive access to the attached [`ServiceRegistry`], e.g. to call
    /// [`setup()`](ServiceRegistry::setup).
    #[must_use]
    pub fn registry_mut(&self) -> Option<SingletonRefMut<'_, ServiceRegistry>> {
        self.instance_mut::<ServiceRegistry>()
    }

    /// Looks up capability `T` through the attached registry.
    ///
    /// Logs and returns `None` if there is no registry, the registry is
    /// exclusively borrowed, or there is no provider.
    #[must_use]
    pub fn get_service<T: ?Sized + Service>(&self) -> Option<Arc<T>> {
        self.locate::<T>()
            .inspect_err(|err| tracing::error!(error = %err, "service lookup failed"))
            .ok()
    }

    fn destroy_by_id(&mut self, id: TypeId) -> bool {
        let Some(entry) = self.singletons.remove(&id) else {
            return false;
        };

        let mut singleton = entry.data.into_inner();
        singleton.on_destroy();
        tracing::debug!(singleton = singleton.name(), "singleton destroyed");
        true
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl ServiceLocator for Scene {
    fn locate<T: ?Sized + Service>(&self) -> Result<Arc<T>, ServiceError> {
        let entry = self
            .singletons
            .get(&TypeId::of::<ServiceRegistry>())
            .ok_or(ServiceError::RegistryMissing)?;

        let guard = entry
            .data
            .try_read()
            .ok_or(ServiceError::RegistryBusy)?;

        let singleton: &dyn Singleton = &**guard;
        singleton
            .downcast_ref::<ServiceRegistry>()
            .ok_or(ServiceError::RegistryMissing)?
            .try_get_service::<T>()
    }
}

fn warn_missing<T: Singleton>() {
    tracing::warn!(
        singleton = core::any::type_name::<T>(),
        "an instance of this singleton is needed in the scene, but there is none"
    );
}

fn warn_borrowed<T: Singleton>() {
    tracing::warn!(
        singleton = core::any::type_name::<T>(),
        "singleton is already borrowed"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Guards
// ─────────────────────────────────────────────────────────────────────────────

/// RAII guard for shared singleton access.
///
/// Returned by [`Scene::instance`]. The lock is released when the guard is
/// dropped.
pub struct SingletonRef<'a, T: Singleton> {
    guard: RwLockReadGuard<'a, Box<dyn Singleton>>,
    _marker: core::marker::PhantomData<&'a T>,
}

impl<T: Singleton> core::ops::Deref for SingletonRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        let singleton: &dyn Singleton = &**self.guard;
        // The entry is keyed by TypeId::of::<T>()
        singleton
            .downcast_ref::<T>()
            .expect("singleton type mismatch (this is a bug)")
    }
}

/// RAII guard for exclusive singleton access.
///
/// Returned by [`Scene::instance_mut`]. The lock is released when the guard
/// is dropped.
pub struct SingletonRefMut<'a, T: Singleton> {
    guard: RwLockWriteGuard<'a, Box<dyn Singleton>>,
    _marker: core::marker::PhantomData<&'a mut T>,
}

impl<T: Singleton> core::ops::Deref for SingletonRefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        let singleton: &dyn Singleton = &**self.guard;
        singleton
            .downcast_ref::<T>()
            .expect("singleton type mismatch (this is a bug)")
    }
}

impl<T: Singleton> core::ops::DerefMut for SingletonRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let singleton: &mut dyn Singleton = &mut **self.guard;
        singleton
            .downcast_mut::<T>()
            .expect("singleton type mismatch (this is a bug)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        inits: Arc<AtomicUsize>,
        destroys: Arc<AtomicUsize>,
        value: i32,
    }

    impl Singleton for Counter {
        fn init(&mut self, _scene: &Scene) {
            self.inits.fetch_add(1, Ordering::SeqCst);
        }

        fn on_destroy(&mut self) {
            self.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Other;
    impl Singleton for Other {}

    #[test]
    fn first_attach_becomes_instance() {
        let mut scene = Scene::new();
        let counter = Counter::default();
        let inits = Arc::clone(&counter.inits);

        assert_eq!(scene.attach(counter), Attach::Active);
        assert!(scene.contains::<Counter>());
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_attach_is_destroyed_without_init() {
        let mut scene = Scene::new();
        let first = Counter {
            value: 1,
            ..Counter::default()
        };
        let second = Counter {
            value: 2,
            inits: Arc::clone(&first.inits),
            ..Counter::default()
        };
        let inits = Arc::clone(&first.inits);

        scene.attach(first);
        assert_eq!(scene.attach(second), Attach::Destroyed);

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.instance::<Counter>().unwrap().value, 1);
    }

    #[test]
    fn missing_instance_is_none() {
        let scene = Scene::new();
        assert!(scene.instance::<Counter>().is_none());
        assert!(scene.instance_mut::<Counter>().is_none());
    }

    #[test]
    fn instance_mut_modifies() {
        let mut scene = Scene::new();
        scene.attach(Counter::default());

        scene.instance_mut::<Counter>().unwrap().value += 5;

        assert_eq!(scene.instance::<Counter>().unwrap().value, 5);
    }

    #[test]
    fn mutable_borrow_blocks_shared() {
        let mut scene = Scene::new();
        scene.attach(Counter::default());

        let _guard = scene.instance_mut::<Counter>().unwrap();
        assert!(scene.instance::<Counter>().is_none());
    }

    #[test]
    fn destroy_runs_hook_and_frees_slot() {
        let mut scene = Scene::new();
        let counter = Counter::default();
        let destroys = Arc::clone(&counter.destroys);
        scene.attach(counter);

        assert!(scene.destroy::<Counter>());
        assert!(!scene.destroy::<Counter>());
        assert_eq!(destroys.load(Ordering::SeqCst), 1);

        // The slot is free again
        assert_eq!(scene.attach(Counter::default()), Attach::Active);
    }

    #[test]
    fn teardown_destroys_everything() {
        let mut scene = Scene::new();
        let counter = Counter::default();
        let destroys = Arc::clone(&counter.destroys);
        scene.attach(counter);
        scene.attach(Other);

        scene.teardown();

        assert!(scene.is_empty());
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_scene_runs_destroy_hooks() {
        let counter = Counter::default();
        let destroys = Arc::clone(&counter.destroys);
        {
            let mut scene = Scene::new();
            scene.attach(counter);
        }
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn locate_while_registry_borrowed_reports_busy() {
        let mut scene = Scene::new();
        scene.attach(ServiceRegistry::new().with_auto_init(true));

        let guard = scene.registry_mut().unwrap();
        assert_eq!(
            scene.locate::<dyn Service>().err(),
            Some(ServiceError::RegistryBusy)
        );
        drop(guard);

        assert!(matches!(
            scene.locate::<dyn Service>(),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn locate_without_registry_reports_missing() {
        let scene = Scene::new();
        assert_eq!(
            scene.locate::<dyn Service>().err(),
            Some(ServiceError::RegistryMissing)
        );
    }
}
