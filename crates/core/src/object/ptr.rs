//! Non-owning dynamic value handle

use std::any::Any;
use std::fmt;

use super::shared::SharedObject;
use super::slot::{Place, Projection};
use crate::error::{ReflectError, ReflectResult};
use crate::types::{TypeIdentity, TypeSignature};

/// A borrowed view of a dynamic value
///
/// Carries the value's runtime signature and the place it lives in. The
/// view never keeps the value alive; access after the owner is gone
/// fails with [`ReflectError::DanglingValue`]. A pointer without a place
/// is a typed null, used as the receiver of static calls.
#[derive(Clone)]
pub struct ObjectPtr {
    ty: TypeSignature,
    place: Option<Place>,
}

impl ObjectPtr {
    /// The canonical null pointer (void type, no place)
    pub fn null() -> Self {
        Self {
            ty: TypeSignature::void(),
            place: None,
        }
    }

    /// A pointer that carries a type but no value
    pub fn typed_null(ty: impl Into<TypeSignature>) -> Self {
        Self {
            ty: ty.into(),
            place: None,
        }
    }

    pub(crate) fn from_place(ty: TypeSignature, place: Place) -> Self {
        Self {
            ty,
            place: Some(place),
        }
    }

    pub(crate) fn place(&self) -> Option<&Place> {
        self.place.as_ref()
    }

    pub fn ty(&self) -> &TypeSignature {
        &self.ty
    }

    pub fn identity(&self) -> TypeIdentity {
        self.ty.base
    }

    /// No value behind this pointer
    pub fn is_null(&self) -> bool {
        self.place.is_none()
    }

    pub fn is_void(&self) -> bool {
        self.ty.is_void()
    }

    /// Whether the pointed-to value still exists
    pub fn is_alive(&self) -> bool {
        self.place.as_ref().is_some_and(Place::is_alive)
    }

    /// Whether the declared type is `T` (qualifiers ignored)
    pub fn is<T: Any>(&self) -> bool {
        self.ty.base.equal_to(&TypeIdentity::of::<T>(), true)
    }

    /// Whether both pointers view the same owned value
    pub fn same_value(&self, other: &ObjectPtr) -> bool {
        match (&self.place, &other.place) {
            (Some(a), Some(b)) => a.same_root(b),
            _ => false,
        }
    }

    /// Same place, different declared type
    pub fn retyped(&self, ty: impl Into<TypeSignature>) -> Self {
        Self {
            ty: ty.into(),
            place: self.place.clone(),
        }
    }

    /// Same place, base re-qualified (e.g. to bind a `&mut` parameter)
    pub fn qualified(&self, is_ref: bool, is_const: bool) -> Self {
        Self {
            ty: self.ty.qualified(is_ref, is_const),
            place: self.place.clone(),
        }
    }

    /// View of a part of this value
    pub fn project(&self, projection: &Projection, ty: impl Into<TypeSignature>) -> Self {
        Self {
            ty: ty.into(),
            place: self.place.as_ref().map(|p| p.project(projection)),
        }
    }

    /// Run `f` on the erased value
    pub fn with_any<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> ReflectResult<R> {
        let place = self.place.as_ref().ok_or(ReflectError::NullValue)?;
        place.access(&self.ty, f)
    }

    /// Checked shared access to the value as `T`
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> ReflectResult<R> {
        self.with_any(|value| value.downcast_ref::<T>().map(f))?
            .ok_or_else(|| ReflectError::mismatch(std::any::type_name::<T>(), &self.ty))
    }

    /// Checked mutable access to the value as `T`
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> ReflectResult<R> {
        self.with_any(|value| value.downcast_mut::<T>().map(f))?
            .ok_or_else(|| ReflectError::mismatch(std::any::type_name::<T>(), &self.ty))
    }

    /// Clone the value out as `T`
    pub fn get<T: Any + Clone>(&self) -> ReflectResult<T> {
        self.with(T::clone)
    }

    /// Overwrite the value in place
    pub fn set<T: Any>(&self, value: T) -> ReflectResult<()> {
        self.with_mut(|slot: &mut T| *slot = value)
    }

    /// Share ownership of the viewed value
    ///
    /// A view of a whole owned value becomes another owner of it. A
    /// pointer at a stored `SharedObject` yields that object. Anything
    /// else (fields, elements, dead values) becomes a non-owning alias.
    pub fn to_shared(&self) -> SharedObject {
        if self.is::<SharedObject>() {
            if let Ok(inner) = self.get::<SharedObject>() {
                return inner;
            }
        }
        match self.place.as_ref().and_then(Place::upgrade_root) {
            Some(slot) => SharedObject::from_parts(self.clone(), Some(slot)),
            None => SharedObject::alias(self.clone()),
        }
    }

    /// Follow a pointer at a stored `SharedObject` to the value it holds
    pub fn unwrap_shared(&self) -> ObjectPtr {
        if self.is::<SharedObject>() {
            if let Ok(inner) = self.get::<SharedObject>() {
                return inner.as_ptr();
            }
        }
        self.clone()
    }
}

impl Default for ObjectPtr {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPtr")
            .field("ty", &self.ty)
            .field("null", &self.is_null())
            .finish()
    }
}
