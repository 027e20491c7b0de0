//! The built-in type set
//!
//! Numeric kinds with their operators, `bool`, `char`, `String`, the
//! standard sequences and string-keyed maps, the value handles
//! themselves and the registry's own control surface.

use std::sync::Arc;

use tracing::debug;

use crate::auto::{register_map, register_vec};
use crate::bind::take_arg;
use crate::format;
use crate::meta::MetaMethod;
use crate::namespace;
use crate::object::{ObjectPtr, SharedObject};
use crate::registry::{export_registry, CallInfo, MethodDecl, MethodThunk, Registry};
use crate::types::{TypeIdentity, TypeSpec};

macro_rules! integers {
    ($registry:expr; $($t:ty),*) => {
        $(
            $registry
                .auto::<$t>()
                .constructible()
                .value_ctor()
                .checked_arithmetic()
                .checked_remainder()
                .power(|a: &$t, b: $t| (*a as f64).powf(b as f64) as $t)
                .comparison()
                .equality()
                .step()
                .copy()
                .display();
        )*
    };
}

macro_rules! signed {
    ($registry:expr; $($t:ty),*) => {
        $($registry.auto::<$t>().checked_negate();)*
    };
}

macro_rules! floats {
    ($registry:expr; $($t:ty),*) => {
        $(
            $registry
                .auto::<$t>()
                .constructible()
                .value_ctor()
                .checked_arithmetic()
                .checked_remainder()
                .power(|a: &$t, b: $t| a.powf(b))
                .comparison()
                .equality()
                .checked_negate()
                .step()
                .copy()
                .display_with(|v: &$t| format::float(v));
        )*
    };
}

fn register_scalars(registry: &Registry) {
    integers!(registry; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
    signed!(registry; i8, i16, i32, i64, isize);
    floats!(registry; f32, f64);

    registry
        .auto::<bool>()
        .constructible()
        .value_ctor()
        .equality()
        .copy()
        .display();
    registry
        .auto::<char>()
        .constructible()
        .value_ctor()
        .equality()
        .comparison()
        .copy()
        .display();
    registry
        .auto::<String>()
        .constructible()
        .value_ctor()
        .equality()
        .comparison()
        .copy()
        .display();
    registry.add_method(MetaMethod::Add, |a: &String, b: String| format!("{a}{b}"));
    registry.add_method("size", |s: &String| s.chars().count());
    registry.add_method("push_back", |s: &mut String, c: char| s.push(c));
}

fn register_containers(registry: &Registry) {
    register_vec::<i32>(registry);
    register_vec::<f32>(registry);
    register_vec::<String>(registry);
    register_vec::<SharedObject>(registry);
    register_vec::<ObjectPtr>(registry);

    register_map::<i32>(registry);
    register_map::<f32>(registry);
    register_map::<String>(registry);
    register_map::<SharedObject>(registry);
}

/// Value behind a stored handle; an unreadable handle is an error
fn stored_value(call: &CallInfo<'_>) -> crate::error::ReflectResult<ObjectPtr> {
    if call.this.is::<ObjectPtr>() {
        return call.this.get::<ObjectPtr>();
    }
    call.this.get::<SharedObject>().map(|inner| inner.as_ptr())
}

fn register_handle(registry: &Registry, ty: TypeIdentity) {
    let method = |name: &str, ret: TypeSpec, params: Vec<TypeSpec>, thunk: MethodThunk| {
        registry.add_method_raw(ty, MethodDecl::new(name, ret, params), thunk);
    };

    method(
        MetaMethod::ToString.name(),
        TypeSpec::of::<String>(),
        Vec::new(),
        Arc::new(|call: &CallInfo<'_>| {
            let inner = stored_value(call)?;
            Ok(SharedObject::new(call.registry.stringify(&inner)))
        }),
    );
    method(
        "GetType",
        TypeSpec::of::<String>(),
        Vec::new(),
        Arc::new(|call: &CallInfo<'_>| {
            let inner = stored_value(call)?;
            Ok(SharedObject::new(inner.ty().to_string()))
        }),
    );
    method(
        "GetField",
        TypeSpec::any(),
        vec![TypeSpec::of::<String>()],
        Arc::new(|call: &CallInfo<'_>| {
            let mut i = 0;
            let name: String = take_arg(call.args, &mut i)?;
            let inner = stored_value(call)?;
            Ok(SharedObject::alias(call.registry.get_field(&inner, &name)))
        }),
    );
    method(
        "Invoke",
        TypeSpec::any(),
        vec![TypeSpec::of::<String>(), TypeSpec::of::<Vec<ObjectPtr>>()],
        Arc::new(|call: &CallInfo<'_>| {
            let mut i = 0;
            let name: String = take_arg(call.args, &mut i)?;
            let args: Vec<ObjectPtr> = take_arg(call.args, &mut i)?;
            let inner = stored_value(call)?;
            Ok(call.registry.invoke(&inner, &name, &args))
        }),
    );
}

/// Load the built-in type set into `registry`
pub fn init(registry: &Registry) {
    register_scalars(registry);
    registry.register_class::<SharedObject>(Default::default());
    registry.register_class::<ObjectPtr>(Default::default());
    register_handle(registry, TypeIdentity::of::<SharedObject>());
    register_handle(registry, TypeIdentity::of::<ObjectPtr>());
    register_containers(registry);
    namespace::register(registry);
    export_registry(registry);
    debug!("Registered {} built-in classes", registry.class_names().len());
}
