//! Binding native functions to method thunks
//!
//! Argument and return types are captured where the native function is
//! still statically typed, then erased into a [`MethodThunk`]. Arguments
//! are cloned out of their dynamic values before the receiver is
//! borrowed, so a method may take its own receiver as an argument.
//!
//! Parameters typed [`ObjectPtr`] or [`SharedObject`] accept any argument
//! and receive the argument handle itself.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::{ReflectError, ReflectResult};
use crate::object::{ObjectPtr, SharedObject};
use crate::registry::{CallInfo, MethodThunk};
use crate::types::TypeSpec;

/// A native method on `T` that can be registered
///
/// Implemented for closures and functions taking `&mut T` or `&T` plus up
/// to four cloneable arguments. `Marker` only disambiguates the impls.
pub trait IntoMethod<T, Marker>: Send + Sync + 'static {
    fn params() -> Vec<TypeSpec>;
    fn ret() -> TypeSpec;
    fn into_thunk(self) -> MethodThunk;
}

/// A native free function that can be registered as a static method
pub trait IntoFunction<Marker>: Send + Sync + 'static {
    fn params() -> Vec<TypeSpec>;
    fn ret() -> TypeSpec;
    fn into_thunk(self) -> MethodThunk;
}

fn is_handle<A: Any>() -> bool {
    let id = TypeId::of::<A>();
    id == TypeId::of::<ObjectPtr>() || id == TypeId::of::<SharedObject>()
}

/// Declared spec for a parameter of native type `A`
pub fn arg_spec<A: Any>() -> TypeSpec {
    if is_handle::<A>() {
        TypeSpec::any()
    } else {
        TypeSpec::of::<A>()
    }
}

fn downcast_owned<H: Any, A: Any>(handle: H) -> ReflectResult<A> {
    let mut slot = Some(handle);
    (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<A>>()
        .and_then(Option::take)
        .ok_or_else(|| {
            ReflectError::mismatch(std::any::type_name::<A>(), std::any::type_name::<H>())
        })
}

/// Extract argument `*index` as `A` and advance the cursor
pub fn take_arg<A: Any + Clone>(args: &[ObjectPtr], index: &mut usize) -> ReflectResult<A> {
    let position = *index;
    *index += 1;
    let arg = args.get(position).ok_or_else(|| ReflectError::MissingArgument {
        index: position,
        expected: std::any::type_name::<A>().to_string(),
    })?;
    let id = TypeId::of::<A>();
    if id == TypeId::of::<ObjectPtr>() {
        return downcast_owned(arg.clone());
    }
    if id == TypeId::of::<SharedObject>() {
        return downcast_owned(arg.to_shared());
    }
    arg.get::<A>()
}

macro_rules! impl_bindings {
    ($($arg:ident $var:ident),*) => {
        impl<T, F, R, $($arg,)*> IntoMethod<T, fn(&mut T, $($arg,)*) -> R> for F
        where
            T: Any,
            F: Fn(&mut T, $($arg,)*) -> R + Send + Sync + 'static,
            R: Any + Send,
            $($arg: Any + Clone,)*
        {
            fn params() -> Vec<TypeSpec> {
                vec![$(arg_spec::<$arg>(),)*]
            }

            fn ret() -> TypeSpec {
                arg_spec::<R>()
            }

            fn into_thunk(self) -> MethodThunk {
                Arc::new(move |call: &CallInfo<'_>| {
                    #[allow(unused_mut, unused_variables)]
                    let mut index = 0;
                    $(let $var: $arg = take_arg(call.args, &mut index)?;)*
                    let result = call.this.with_mut(|this: &mut T| (self)(this, $($var,)*))?;
                    Ok(SharedObject::from_return(result))
                })
            }
        }

        impl<T, F, R, $($arg,)*> IntoMethod<T, fn(&T, $($arg,)*) -> R> for F
        where
            T: Any,
            F: Fn(&T, $($arg,)*) -> R + Send + Sync + 'static,
            R: Any + Send,
            $($arg: Any + Clone,)*
        {
            fn params() -> Vec<TypeSpec> {
                vec![$(arg_spec::<$arg>(),)*]
            }

            fn ret() -> TypeSpec {
                arg_spec::<R>()
            }

            fn into_thunk(self) -> MethodThunk {
                Arc::new(move |call: &CallInfo<'_>| {
                    #[allow(unused_mut, unused_variables)]
                    let mut index = 0;
                    $(let $var: $arg = take_arg(call.args, &mut index)?;)*
                    let result = call.this.with(|this: &T| (self)(this, $($var,)*))?;
                    Ok(SharedObject::from_return(result))
                })
            }
        }

        impl<F, R, $($arg,)*> IntoFunction<fn($($arg,)*) -> R> for F
        where
            F: Fn($($arg,)*) -> R + Send + Sync + 'static,
            R: Any + Send,
            $($arg: Any + Clone,)*
        {
            fn params() -> Vec<TypeSpec> {
                vec![$(arg_spec::<$arg>(),)*]
            }

            fn ret() -> TypeSpec {
                arg_spec::<R>()
            }

            fn into_thunk(self) -> MethodThunk {
                Arc::new(move |call: &CallInfo<'_>| {
                    #[allow(unused_mut, unused_variables)]
                    let mut index = 0;
                    $(let $var: $arg = take_arg(call.args, &mut index)?;)*
                    Ok(SharedObject::from_return((self)($($var,)*)))
                })
            }
        }
    };
}

impl_bindings!();
impl_bindings!(A1 a1);
impl_bindings!(A1 a1, A2 a2);
impl_bindings!(A1 a1, A2 a2, A3 a3);
impl_bindings!(A1 a1, A2 a2, A3 a3, A4 a4);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::types::TypeSignature;

    fn call_info<'a>(
        registry: &'a Registry,
        this: &'a ObjectPtr,
        args: &'a [ObjectPtr],
    ) -> CallInfo<'a> {
        CallInfo {
            registry,
            this,
            args,
            class_args: &[],
            func_args: &[],
        }
    }

    fn specs<M, F: IntoMethod<Vec<i32>, M>>(_: &F) -> (Vec<TypeSpec>, TypeSpec) {
        (F::params(), F::ret())
    }

    #[test]
    fn test_method_specs() {
        let push = |v: &mut Vec<i32>, x: i32| v.push(x);
        let (params, ret) = specs(&push);
        assert_eq!(params, vec![TypeSpec::of::<i32>()]);
        assert!(ret.is_void());

        let len = |v: &Vec<i32>| v.len();
        let (params, ret) = specs(&len);
        assert!(params.is_empty());
        assert_eq!(ret, TypeSpec::of::<usize>());
    }

    #[test]
    fn test_handle_params_are_wildcards() {
        assert_eq!(arg_spec::<SharedObject>(), TypeSpec::any());
        assert_eq!(arg_spec::<ObjectPtr>(), TypeSpec::any());
        assert_eq!(arg_spec::<String>(), TypeSpec::of::<String>());
    }

    #[test]
    fn test_mut_thunk_mutates_receiver() {
        let registry = Registry::new();
        let target = SharedObject::new(vec![1]);
        let arg = SharedObject::new(2i32);
        let thunk = IntoMethod::<Vec<i32>, _>::into_thunk(|v: &mut Vec<i32>, x: i32| {
            v.push(x);
            v.len()
        });
        let args = [arg.as_ptr()];
        let this = target.as_ptr();
        let out = thunk(&call_info(&registry, &this, &args)).unwrap();
        assert_eq!(out.get::<usize>().unwrap(), 2);
        assert_eq!(target.get::<Vec<i32>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_receiver_as_argument() {
        let registry = Registry::new();
        let target = SharedObject::new(vec![1, 2]);
        let thunk = IntoMethod::<Vec<i32>, _>::into_thunk(|v: &mut Vec<i32>, other: Vec<i32>| {
            v.extend(other)
        });
        let this = target.as_ptr();
        let args = [target.as_ptr()];
        let out = thunk(&call_info(&registry, &this, &args)).unwrap();
        assert!(out.is_null());
        assert_eq!(target.get::<Vec<i32>>().unwrap(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_function_thunk() {
        let registry = Registry::new();
        let thunk = IntoFunction::into_thunk(|a: i32, b: String| format!("{b}{a}"));
        let a = SharedObject::new(7i32);
        let b = SharedObject::new(String::from("n"));
        let args = [a.as_ptr(), b.as_ptr()];
        let this = ObjectPtr::null();
        let out = thunk(&call_info(&registry, &this, &args)).unwrap();
        assert_eq!(out.get::<String>().unwrap(), "n7");
    }

    #[test]
    fn test_missing_and_mistyped_arguments() {
        let mut index = 0;
        let err = take_arg::<i32>(&[], &mut index).unwrap_err();
        assert!(matches!(err, ReflectError::MissingArgument { index: 0, .. }));

        let s = SharedObject::new(String::from("x"));
        let mut index = 0;
        let err = take_arg::<i32>(&[s.as_ptr()], &mut index).unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
    }

    #[test]
    fn test_handle_arguments() {
        let value = SharedObject::new(1.5f64);
        let args = [value.as_ptr()];

        let mut index = 0;
        let ptr: ObjectPtr = take_arg(&args, &mut index).unwrap();
        assert!(ptr.same_value(&value));

        let mut index = 0;
        let shared: SharedObject = take_arg(&args, &mut index).unwrap();
        assert!(shared.is_owned());
        assert_eq!(shared.ty(), &TypeSignature::of::<f64>());
    }
}
