//! Storage cells, projections and places
//!
//! Every owned dynamic value lives in an `Arc<Slot>`. Views hold a
//! `Weak<Slot>` plus an optional [`Projection`] that narrows the root
//! value down to a field, an element or a base part.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::ptr::ObjectPtr;
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeSignature;

/// Runs once when the last owner of a slot goes away
pub(crate) type Finalizer = Box<dyn FnOnce(&ObjectPtr) + Send>;

type ProjectFn = dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync;

/// A pure function narrowing a value to one of its parts
///
/// Field accessors, element accessors and derived-to-base casts are all
/// projections; composing them reproduces address adjustment through a
/// chain of casts.
#[derive(Clone)]
pub struct Projection(Arc<ProjectFn>);

impl Projection {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// The projection that returns its input
    pub fn identity() -> Self {
        Self::new(|value| Some(value))
    }

    /// Projection for an embedded part of `T`
    pub fn field<T: Any, F: Any>(get: fn(&mut T) -> &mut F) -> Self {
        Self::new(move |value| value.downcast_mut::<T>().map(|v| get(v) as &mut dyn Any))
    }

    /// `self` followed by `next`
    pub fn then(&self, next: &Projection) -> Projection {
        let first = self.clone();
        let second = next.clone();
        Self::new(move |value| first.apply(value).and_then(|inner| second.apply(inner)))
    }

    pub fn apply<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.0)(value)
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Projection")
    }
}

pub(crate) struct Slot {
    ty: TypeSignature,
    value: Mutex<Box<dyn Any + Send>>,
    finalizer: Mutex<Option<Finalizer>>,
}

impl Slot {
    pub(crate) fn new(ty: TypeSignature, value: Box<dyn Any + Send>) -> Arc<Self> {
        Arc::new(Self {
            ty,
            value: Mutex::new(value),
            finalizer: Mutex::new(None),
        })
    }

    /// Install a finalizer; a slot keeps the first one it is given
    pub(crate) fn set_finalizer(&self, finalizer: Finalizer) -> bool {
        let mut guard = self.finalizer.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(finalizer);
        true
    }

    pub(crate) fn has_finalizer(&self) -> bool {
        self.finalizer.lock().is_some()
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let Some(finalizer) = self.finalizer.get_mut().take() else {
            return;
        };
        // Move the payload into a temporary owner so the finalizer can
        // reach it through an ordinary view.
        let value = std::mem::replace(self.value.get_mut(), Box::new(()));
        let temp = Slot::new(self.ty.clone(), value);
        let view = ObjectPtr::from_place(self.ty.clone(), Place::root(&temp));
        finalizer(&view);
    }
}

/// Location of a live value: a slot plus an optional projection into it
#[derive(Clone)]
pub(crate) struct Place {
    root: Weak<Slot>,
    projection: Option<Projection>,
}

impl Place {
    pub(crate) fn root(slot: &Arc<Slot>) -> Self {
        Self {
            root: Arc::downgrade(slot),
            projection: None,
        }
    }

    pub(crate) fn project(&self, next: &Projection) -> Self {
        let projection = match &self.projection {
            Some(current) => current.then(next),
            None => next.clone(),
        };
        Self {
            root: self.root.clone(),
            projection: Some(projection),
        }
    }

    /// The owning slot, when this place is its root and the slot is alive
    pub(crate) fn upgrade_root(&self) -> Option<Arc<Slot>> {
        if self.projection.is_some() {
            return None;
        }
        self.root.upgrade()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.root.strong_count() > 0
    }

    pub(crate) fn same_root(&self, other: &Place) -> bool {
        Weak::ptr_eq(&self.root, &other.root)
    }

    /// Run `f` on the value this place designates
    pub(crate) fn access<R>(
        &self,
        ty: &TypeSignature,
        f: impl FnOnce(&mut dyn Any) -> R,
    ) -> ReflectResult<R> {
        let slot = self
            .root
            .upgrade()
            .ok_or_else(|| ReflectError::DanglingValue(ty.to_string()))?;
        let mut guard = slot
            .value
            .try_lock()
            .ok_or_else(|| ReflectError::ValueBusy(ty.to_string()))?;
        let root: &mut dyn Any = &mut **guard;
        let target = match &self.projection {
            Some(projection) => projection
                .apply(root)
                .ok_or_else(|| ReflectError::mismatch(ty, &slot.ty))?,
            None => root,
        };
        Ok(f(target))
    }
}
