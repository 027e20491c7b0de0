//! reflkit - Core Runtime Reflection
//!
//! This crate contains the reflection registry and the dynamic value
//! model built on top of it:
//!
//! - [`types`] - Type identities, signatures and numeric conversions
//! - [`object`] - Dynamic values ([`SharedObject`], [`ObjectPtr`])
//! - [`registry`] - Classes, fields, methods and the invocation engine
//! - [`auto`] - Opt-in operator and container registration
//! - [`json`] - JSON documents expressed as reflected values
//!
//! # Example
//!
//! ```ignore
//! use reflkit_core::{Registry, SharedObject};
//!
//! let registry = Registry::with_builtins();
//! let a = SharedObject::new(20i32);
//! let b = SharedObject::new(22i32);
//! let sum = registry.invoke(&a, "__add", &[b.as_ptr()]);
//! assert_eq!(registry.stringify(&sum), "42");
//! ```

// Allow the crate to refer to itself as `reflkit_core` for proc macro compatibility
extern crate self as reflkit_core;

pub mod auto;
pub mod bind;
pub mod builtins;
pub mod config;
pub mod error;
pub mod format;
pub mod global;
pub mod json;
pub mod meta;
pub mod namespace;
pub mod object;
pub mod registry;
pub mod types;

// Re-export commonly used items
pub use auto::{AutoRegistrar, Capabilities, Cursor};
pub use error::{ReflectError, ReflectResult};
pub use json::{Json, JsonMap, JsonVec, ParseIssue};
pub use meta::MetaMethod;
pub use namespace::Namespace;
pub use object::{ObjectPtr, Projection, SharedObject};
pub use registry::{
    CallInfo, ClassDescriptor, Diagnostics, DynField, DynMethod, FieldDescriptor, InvokeOptions,
    MemberInfo, MethodDecl, MethodDescriptor, MethodKey, Registry, TagList,
};
pub use types::{TypeIdentity, TypeSignature, TypeSpec};

// Re-export config types
pub use config::{ConfigError, ConfigResult, JsonConfig, ReflectConfig};

// Re-export macros
pub use reflkit_macros::{reflect_fn, Reflect};

/// A native type that knows how to register itself
///
/// Usually derived with `#[derive(Reflect)]`.
pub trait Reflect: std::any::Any + Send {
    /// Register the class, its bases and its fields; returns its identity
    fn register(registry: &Registry) -> TypeIdentity;
}

impl Registry {
    /// Register `T` through its [`Reflect`] implementation
    pub fn reflect<T: Reflect>(&self) -> TypeIdentity {
        T::register(self)
    }
}
