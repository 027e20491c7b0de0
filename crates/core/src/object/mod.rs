//! Dynamic values
//!
//! [`ObjectPtr`] is the borrowed form, [`SharedObject`] the owning form.
//! Both carry a [`TypeSignature`](crate::types::TypeSignature) and reach
//! their value through checked downcasts.

mod ops;
mod ptr;
mod shared;
mod slot;

pub use ptr::ObjectPtr;
pub use shared::SharedObject;
pub use slot::Projection;

pub(crate) use slot::Finalizer;
