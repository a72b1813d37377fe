//! Change hooks for inspected fields.
//!
//! Editor tooling edits an object's fields one at a time. A type declares
//! [`OnValueChanged`] hooks mapping a field to the name of a zero-argument
//! callback; [`edit()`] runs that callback whenever an edit actually changes
//! the field's [`snapshot`](Inspectable::snapshot).
//!
//! Hooks are resolved by name at edit time only. Nothing here runs during
//! normal service lookups.
//!
//! # Example
//!
//! ```
//! use injector_system::inspect::{edit, Edit, Inspectable, OnValueChanged};
//!
//! #[derive(Default)]
//! struct Volume {
//!     level: u8,
//!     clamped: bool,
//! }
//!
//! impl Inspectable for Volume {
//!     fn on_value_changed(&self) -> &'static [OnValueChanged] {
//!         const HOOKS: &[OnValueChanged] = &[OnValueChanged::new("level", "clamp")];
//!         HOOKS
//!     }
//!
//!     fn snapshot(&self, field: &str) -> Option<String> {
//!         (field == "level").then(|| self.level.to_string())
//!     }
//!
//!     fn invoke(&mut self, callback: &str) -> bool {
//!         if callback != "clamp" {
//!             return false;
//!         }
//!         self.level = self.level.min(10);
//!         self.clamped = true;
//!         true
//!     }
//! }
//!
//! let mut volume = Volume::default();
//! assert_eq!(edit(&mut volume, "level", |v| v.level = 0), Edit::Unchanged);
//! assert_eq!(edit(&mut volume, "level", |v| v.level = 40), Edit::Notified("clamp"));
//! assert_eq!(volume.level, 10);
//! ```

use crate::service::ServiceError;

/// Declares that changes to `field` invoke the callback named `callback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnValueChanged {
    /// Name of the watched field.
    pub field: &'static str,
    /// Name of the callback to invoke.
    pub callback: &'static str,
}

impl OnValueChanged {
    /// Creates a hook declaration.
    #[must_use]
    pub const fn new(field: &'static str, callback: &'static str) -> Self {
        Self { field, callback }
    }
}

/// An object whose fields can be edited by tooling.
pub trait Inspectable {
    /// Hooks declared by this type. Empty by default.
    fn on_value_changed(&self) -> &'static [OnValueChanged] {
        &[]
    }

    /// A textual snapshot of `field`, or `None` if the field is not inspectable.
    ///
    /// Two snapshots differ exactly when the field's value differs.
    fn snapshot(&self, field: &str) -> Option<String>;

    /// Invokes the callback named `callback`.
    ///
    /// Returns `false` if the type has no such callback.
    fn invoke(&mut self, callback: &str) -> bool;
}

/// Outcome of [`edit()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// The field's snapshot did not change.
    Unchanged,
    /// The field changed and no callback ran.
    Changed,
    /// The field changed and the named callback ran.
    Notified(&'static str),
    /// The field changed, but its hook names a callback the target does not have.
    MissingCallback(&'static str),
}

/// Applies `apply` to `target` and runs `field`'s change hook if the field changed.
///
/// The edit itself is always applied. A hook naming a callback the target
/// does not have is logged as [`ServiceError::MissingCallback`] and returned
/// as [`Edit::MissingCallback`].
///
/// ```
/// use injector_system::inspect::{edit, Edit, Inspectable, OnValueChanged};
///
/// struct Broken(u8);
///
/// impl Inspectable for Broken {
///     fn on_value_changed(&self) -> &'static [OnValueChanged] {
///         const HOOKS: &[OnValueChanged] = &[OnValueChanged::new("value", "missing")];
///         HOOKS
///     }
///
///     fn snapshot(&self, _field: &str) -> Option<String> {
///         Some(self.0.to_string())
///     }
///
///     fn invoke(&mut self, _callback: &str) -> bool {
///         false
///     }
/// }
///
/// let mut broken = Broken(0);
/// assert_eq!(edit(&mut broken, "value", |b| b.0 = 1), Edit::MissingCallback("missing"));
/// assert_eq!(broken.0, 1);
/// ```
pub fn edit<I, F>(target: &mut I, field: &str, apply: F) -> Edit
where
    I: Inspectable + ?Sized,
    F: FnOnce(&mut I),
{
    let before = target.snapshot(field);
    apply(target);
    let after = target.snapshot(field);

    if before == after {
        return Edit::Unchanged;
    }

    let Some(hook) = target
        .on_value_changed()
        .iter()
        .find(|hook| hook.field == field)
    else {
        return Edit::Changed;
    };

    if target.invoke(hook.callback) {
        tracing::debug!(field, callback = hook.callback, "change hook invoked");
        return Edit::Notified(hook.callback);
    }

    let err = ServiceError::MissingCallback {
        target: core::any::type_name::<I>(),
        callback: hook.callback,
    };
    tracing::error!(field, "{err}");
    Edit::MissingCallback(hook.callback)
}
