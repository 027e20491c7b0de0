//! Owning dynamic value handle

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::ptr::ObjectPtr;
use super::slot::{Finalizer, Place, Slot};
use crate::types::{TypeSignature, TypeIdentity};

/// A reference-counted dynamic value
///
/// Dereferences to the [`ObjectPtr`] view of its value. An owned object
/// shares its storage with every clone; the storage (and the registered
/// destructor, if any) is released when the last clone drops. An alias
/// object wraps memory owned elsewhere and owns nothing.
#[derive(Clone, Default)]
pub struct SharedObject {
    ptr: ObjectPtr,
    owner: Option<Arc<Slot>>,
}

impl SharedObject {
    /// The canonical null value
    pub fn null() -> Self {
        Self::default()
    }

    /// Take ownership of a native value
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self::from_boxed(TypeSignature::of::<T>(), Box::new(value))
    }

    /// Own an already erased value under an explicit signature
    pub fn from_boxed(ty: TypeSignature, value: Box<dyn Any + Send>) -> Self {
        let slot = Slot::new(ty.clone(), value);
        Self {
            ptr: ObjectPtr::from_place(ty, Place::root(&slot)),
            owner: Some(slot),
        }
    }

    /// Convert a native return value
    ///
    /// `()` becomes the null value. Returned handles are passed through:
    /// a `SharedObject` as itself, an `ObjectPtr` as an alias.
    pub fn from_return<R: Any + Send>(value: R) -> Self {
        if TypeId::of::<R>() == TypeId::of::<()>() {
            return Self::null();
        }
        let mut slot = Some(value);
        if let Some(obj) = (&mut slot as &mut dyn Any).downcast_mut::<Option<SharedObject>>() {
            return obj.take().unwrap_or_default();
        }
        if let Some(ptr) = (&mut slot as &mut dyn Any).downcast_mut::<Option<ObjectPtr>>() {
            return ptr.take().map(Self::alias).unwrap_or_default();
        }
        slot.map(Self::new).unwrap_or_default()
    }

    /// Wrap memory owned elsewhere without taking ownership
    pub fn alias(ptr: ObjectPtr) -> Self {
        Self { ptr, owner: None }
    }

    pub(crate) fn from_parts(ptr: ObjectPtr, owner: Option<Arc<Slot>>) -> Self {
        Self { ptr, owner }
    }

    pub fn as_ptr(&self) -> ObjectPtr {
        self.ptr.clone()
    }

    /// Whether this handle owns (shares) its value
    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    /// Number of owning handles, zero for aliases and null
    pub fn use_count(&self) -> usize {
        self.owner.as_ref().map_or(0, Arc::strong_count)
    }

    /// Attach generic arguments that drive class-slot substitution
    pub fn add_template_args(&mut self, args: Vec<TypeSignature>) -> &mut Self {
        let ty = TypeSignature::with_args(self.ptr.identity(), args);
        self.ptr = self.ptr.retyped(ty);
        self
    }

    /// Same storage under a different declared signature
    pub fn retyped(&self, ty: impl Into<TypeSignature>) -> Self {
        Self {
            ptr: self.ptr.retyped(ty),
            owner: self.owner.clone(),
        }
    }

    pub(crate) fn set_finalizer(&self, finalizer: Finalizer) -> bool {
        match &self.owner {
            Some(slot) => slot.set_finalizer(finalizer),
            None => false,
        }
    }

    pub(crate) fn has_finalizer(&self) -> bool {
        self.owner.as_ref().is_some_and(|slot| slot.has_finalizer())
    }

    /// Identity of the contained value
    pub fn type_identity(&self) -> TypeIdentity {
        self.ptr.identity()
    }
}

impl Deref for SharedObject {
    type Target = ObjectPtr;

    fn deref(&self) -> &ObjectPtr {
        &self.ptr
    }
}

impl From<&SharedObject> for ObjectPtr {
    fn from(obj: &SharedObject) -> Self {
        obj.as_ptr()
    }
}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObject")
            .field("ty", self.ptr.ty())
            .field("owned", &self.is_owned())
            .field("use_count", &self.use_count())
            .finish()
    }
}
