//! Opt-in registration of operator and container groups
//!
//! A native type lists the capability groups it supports; each group
//! registers the matching metamethods through ordinary method binding.
//!
//! ```ignore
//! registry
//!     .auto::<Meters>()
//!     .constructible()
//!     .arithmetic()
//!     .comparison()
//!     .display();
//! ```

mod container;
mod cursor;

use std::any::Any;
use std::fmt::Display;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::sync::Arc;

use bitflags::bitflags;

use crate::bind::{arg_spec, take_arg, IntoMethod};
use crate::error::ReflectError;
use crate::meta::MetaMethod;
use crate::object::SharedObject;
use crate::registry::{CallInfo, MemberInfo, MethodDecl, MethodThunk, Registry, TagList};
use crate::types::TypeIdentity;

pub use container::{register_map, register_vec};
pub use cursor::Cursor;

bitflags! {
    /// Capability groups a type opted into
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// `__add`, `__sub`, `__mul`, `__div`
        const ARITHMETIC = 1 << 0;
        const REMAINDER = 1 << 1;
        const POWER = 1 << 2;
        /// `__lt`, `__le`, `__gt`, `__ge`
        const COMPARISON = 1 << 3;
        /// `__eq`, `__ne`
        const EQUALITY = 1 << 4;
        const NEGATE = 1 << 5;
        const DISPLAY = 1 << 6;
        const COPY = 1 << 7;
        /// Pre and post `__inc` / `__dec`
        const STEP = 1 << 8;
        const INDEX = 1 << 9;
        /// `__begin` / `__end` cursors
        const ITERATE = 1 << 10;
        /// Push, erase, size and friends
        const CONTAINER = 1 << 11;
    }
}

/// Types with a unit step, used by `__inc` and `__dec`
pub trait Step: Copy {
    fn forward(self) -> Self;
    fn backward(self) -> Self;
}

macro_rules! int_step {
    ($($t:ty),*) => {
        $(impl Step for $t {
            fn forward(self) -> Self {
                self.wrapping_add(1)
            }

            fn backward(self) -> Self {
                self.wrapping_sub(1)
            }
        })*
    };
}

macro_rules! float_step {
    ($($t:ty),*) => {
        $(impl Step for $t {
            fn forward(self) -> Self {
                self + 1.0
            }

            fn backward(self) -> Self {
                self - 1.0
            }
        })*
    };
}

int_step!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
float_step!(f32, f64);

/// Arithmetic that reports overflow and division by zero as `None`
pub trait Checked: Copy {
    fn add(self, rhs: Self) -> Option<Self>;
    fn sub(self, rhs: Self) -> Option<Self>;
    fn mul(self, rhs: Self) -> Option<Self>;
    fn div(self, rhs: Self) -> Option<Self>;
    fn rem(self, rhs: Self) -> Option<Self>;
    fn neg(self) -> Option<Self>;
}

macro_rules! int_checked {
    ($($t:ty),*) => {
        $(impl Checked for $t {
            fn add(self, rhs: Self) -> Option<Self> {
                self.checked_add(rhs)
            }

            fn sub(self, rhs: Self) -> Option<Self> {
                self.checked_sub(rhs)
            }

            fn mul(self, rhs: Self) -> Option<Self> {
                self.checked_mul(rhs)
            }

            fn div(self, rhs: Self) -> Option<Self> {
                self.checked_div(rhs)
            }

            fn rem(self, rhs: Self) -> Option<Self> {
                self.checked_rem(rhs)
            }

            fn neg(self) -> Option<Self> {
                self.checked_neg()
            }
        })*
    };
}

// IEEE results (inf, NaN) are values, not faults
macro_rules! float_checked {
    ($($t:ty),*) => {
        $(impl Checked for $t {
            fn add(self, rhs: Self) -> Option<Self> {
                Some(self + rhs)
            }

            fn sub(self, rhs: Self) -> Option<Self> {
                Some(self - rhs)
            }

            fn mul(self, rhs: Self) -> Option<Self> {
                Some(self * rhs)
            }

            fn div(self, rhs: Self) -> Option<Self> {
                Some(self / rhs)
            }

            fn rem(self, rhs: Self) -> Option<Self> {
                Some(self % rhs)
            }

            fn neg(self) -> Option<Self> {
                Some(-self)
            }
        })*
    };
}

int_checked!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
float_checked!(f32, f64);

fn arithmetic_fault<T>(op: MetaMethod) -> ReflectError {
    ReflectError::ArithmeticFault {
        op: op.name().to_string(),
        ty: std::any::type_name::<T>().to_string(),
    }
}

/// Builder returned by [`Registry::auto`]
pub struct AutoRegistrar<'r, T> {
    registry: &'r Registry,
    _marker: PhantomData<fn() -> T>,
}

impl Registry {
    /// Start opt-in operator registration for `T`
    pub fn auto<T: Any + Send>(&self) -> AutoRegistrar<'_, T> {
        AutoRegistrar {
            registry: self,
            _marker: PhantomData,
        }
    }
}

impl<'r, T: Any + Send> AutoRegistrar<'r, T> {
    pub fn identity(&self) -> TypeIdentity {
        TypeIdentity::of::<T>()
    }

    fn method<M, F: IntoMethod<T, M>>(&self, meta: MetaMethod, method: F) {
        self.registry.add_method::<T, M, F>(MemberInfo::from(meta), method);
    }

    fn record(self, capabilities: Capabilities) -> Self {
        self.registry.add_capabilities(self.identity(), capabilities);
        self
    }

    /// Register the class itself unless it already is
    pub fn constructible(self) -> Self
    where
        T: Default,
    {
        if !self.registry.has_class(self.identity()) {
            self.registry.register_class::<T>(TagList::new());
        }
        self
    }

    /// `__ctor(T)`: construction from a value of the same type
    pub fn value_ctor(self) -> Self
    where
        T: Clone,
    {
        self.method(MetaMethod::Ctor, |v: &mut T, other: T| *v = other);
        self
    }

    pub fn arithmetic(self) -> Self
    where
        T: Clone + Add<Output = T> + Sub<Output = T> + Mul<Output = T> + Div<Output = T>,
    {
        self.method(MetaMethod::Add, |a: &T, b: T| a.clone() + b);
        self.method(MetaMethod::Sub, |a: &T, b: T| a.clone() - b);
        self.method(MetaMethod::Mul, |a: &T, b: T| a.clone() * b);
        self.method(MetaMethod::Div, |a: &T, b: T| a.clone() / b);
        self.record(Capabilities::ARITHMETIC)
    }

    fn checked_unary(&self, meta: MetaMethod, op: fn(T) -> Option<T>)
    where
        T: Checked,
    {
        let thunk: MethodThunk = Arc::new(move |call: &CallInfo<'_>| {
            let value = call.this.get::<T>()?;
            op(value)
                .map(SharedObject::new)
                .ok_or_else(|| arithmetic_fault::<T>(meta))
        });
        let decl = MethodDecl::new(meta, arg_spec::<T>(), Vec::new());
        self.registry.add_method_raw(self.identity(), decl, thunk);
    }

    fn checked_binary(&self, meta: MetaMethod, op: fn(T, T) -> Option<T>)
    where
        T: Checked,
    {
        let thunk: MethodThunk = Arc::new(move |call: &CallInfo<'_>| {
            let mut index = 0;
            let rhs: T = take_arg(call.args, &mut index)?;
            let lhs = call.this.get::<T>()?;
            op(lhs, rhs)
                .map(SharedObject::new)
                .ok_or_else(|| arithmetic_fault::<T>(meta))
        });
        let decl = MethodDecl::new(meta, arg_spec::<T>(), vec![arg_spec::<T>()]);
        self.registry.add_method_raw(self.identity(), decl, thunk);
    }

    /// Like [`arithmetic`](Self::arithmetic), but overflow and division by
    /// zero fail the call instead of panicking
    pub fn checked_arithmetic(self) -> Self
    where
        T: Checked,
    {
        self.checked_binary(MetaMethod::Add, Checked::add);
        self.checked_binary(MetaMethod::Sub, Checked::sub);
        self.checked_binary(MetaMethod::Mul, Checked::mul);
        self.checked_binary(MetaMethod::Div, Checked::div);
        self.record(Capabilities::ARITHMETIC)
    }

    pub fn checked_remainder(self) -> Self
    where
        T: Checked,
    {
        self.checked_binary(MetaMethod::Mod, Checked::rem);
        self.record(Capabilities::REMAINDER)
    }

    pub fn checked_negate(self) -> Self
    where
        T: Checked,
    {
        self.checked_unary(MetaMethod::Neg, Checked::neg);
        self.record(Capabilities::NEGATE)
    }

    pub fn remainder(self) -> Self
    where
        T: Clone + Rem<Output = T>,
    {
        self.method(MetaMethod::Mod, |a: &T, b: T| a.clone() % b);
        self.record(Capabilities::REMAINDER)
    }

    /// `__pow` through a caller-supplied power function
    pub fn power(self, pow: fn(&T, T) -> T) -> Self
    where
        T: Clone,
    {
        self.method(MetaMethod::Pow, move |a: &T, b: T| pow(a, b));
        self.record(Capabilities::POWER)
    }

    pub fn comparison(self) -> Self
    where
        T: Clone + PartialOrd,
    {
        self.method(MetaMethod::Lt, |a: &T, b: T| *a < b);
        self.method(MetaMethod::Le, |a: &T, b: T| *a <= b);
        self.method(MetaMethod::Gt, |a: &T, b: T| *a > b);
        self.method(MetaMethod::Ge, |a: &T, b: T| *a >= b);
        self.record(Capabilities::COMPARISON)
    }

    pub fn equality(self) -> Self
    where
        T: Clone + PartialEq,
    {
        self.method(MetaMethod::Eq, |a: &T, b: T| *a == b);
        self.method(MetaMethod::Ne, |a: &T, b: T| *a != b);
        self.record(Capabilities::EQUALITY)
    }

    pub fn negate(self) -> Self
    where
        T: Clone + Neg<Output = T>,
    {
        self.method(MetaMethod::Neg, |a: &T| -a.clone());
        self.record(Capabilities::NEGATE)
    }

    /// `__tostring` through [`Display`]
    pub fn display(self) -> Self
    where
        T: Display,
    {
        self.method(MetaMethod::ToString, |a: &T| a.to_string());
        self.record(Capabilities::DISPLAY)
    }

    /// `__tostring` through a custom printer
    pub fn display_with(self, print: fn(&T) -> String) -> Self {
        self.method(MetaMethod::ToString, move |a: &T| print(a));
        self.record(Capabilities::DISPLAY)
    }

    pub fn copy(self) -> Self
    where
        T: Clone,
    {
        self.method(MetaMethod::Copy, |a: &T| a.clone());
        self.record(Capabilities::COPY)
    }

    /// Prefix and postfix `__inc` / `__dec`; postfix takes a dummy `i32`
    pub fn step(self) -> Self
    where
        T: Step,
    {
        self.method(MetaMethod::Inc, |v: &mut T| {
            *v = v.forward();
            *v
        });
        self.method(MetaMethod::Inc, |v: &mut T, _: i32| {
            let old = *v;
            *v = old.forward();
            old
        });
        self.method(MetaMethod::Dec, |v: &mut T| {
            *v = v.backward();
            *v
        });
        self.method(MetaMethod::Dec, |v: &mut T, _: i32| {
            let old = *v;
            *v = old.backward();
            old
        });
        self.record(Capabilities::STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::SharedObject;

    #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
    struct Meters(f64);

    impl Add for Meters {
        type Output = Meters;
        fn add(self, rhs: Meters) -> Meters {
            Meters(self.0 + rhs.0)
        }
    }

    impl Sub for Meters {
        type Output = Meters;
        fn sub(self, rhs: Meters) -> Meters {
            Meters(self.0 - rhs.0)
        }
    }

    impl Mul for Meters {
        type Output = Meters;
        fn mul(self, rhs: Meters) -> Meters {
            Meters(self.0 * rhs.0)
        }
    }

    impl Div for Meters {
        type Output = Meters;
        fn div(self, rhs: Meters) -> Meters {
            Meters(self.0 / rhs.0)
        }
    }

    impl Display for Meters {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}m", self.0)
        }
    }

    #[test]
    fn test_groups_register_metamethods() {
        let registry = Registry::new();
        registry
            .auto::<Meters>()
            .constructible()
            .arithmetic()
            .comparison()
            .display();

        let a = SharedObject::new(Meters(2.0));
        let b = SharedObject::new(Meters(0.5));
        let sum = registry.call(&a, "__add", &[b.as_ptr()]).unwrap();
        assert_eq!(sum.get::<Meters>().unwrap(), Meters(2.5));
        let lt = registry.call(&b, "__lt", &[a.as_ptr()]).unwrap();
        assert!(lt.get::<bool>().unwrap());
        assert_eq!(registry.stringify(&sum), "2.5m");
        assert!(registry.new_of::<Meters>(&[]).is::<Meters>());
    }

    #[test]
    fn test_capabilities_are_recorded() {
        let registry = Registry::new();
        let ty = registry.auto::<i64>().equality().step().identity();
        let caps = registry.capabilities(ty);
        assert!(caps.contains(Capabilities::EQUALITY | Capabilities::STEP));
        assert!(!caps.contains(Capabilities::ARITHMETIC));
    }

    #[test]
    fn test_prefix_and_postfix_step() {
        let registry = Registry::new();
        registry.auto::<u8>().step();
        let n = SharedObject::new(1u8);
        let pre = registry.call(&n, "__inc", &[]).unwrap();
        assert_eq!(pre.get::<u8>().unwrap(), 2);
        let dummy = SharedObject::new(0i32);
        let post = registry.call(&n, "__dec", &[dummy.as_ptr()]).unwrap();
        assert_eq!(post.get::<u8>().unwrap(), 2);
        assert_eq!(n.get::<u8>().unwrap(), 1);
    }

    #[test]
    fn test_checked_overflow_is_soft() {
        let registry = Registry::new();
        registry
            .auto::<i32>()
            .checked_arithmetic()
            .checked_remainder()
            .checked_negate();

        let max = SharedObject::new(i32::MAX);
        let one = SharedObject::new(1i32);
        assert!(matches!(
            registry.call(&max, "__add", &[one.as_ptr()]),
            Err(ReflectError::ArithmeticFault { .. })
        ));
        assert!(registry.invoke(&max, "__add", &[one.as_ptr()]).is_null());
        assert_eq!(registry.diagnostics().recent().len(), 1);

        let min = SharedObject::new(i32::MIN);
        assert!(registry.invoke(&min, "__neg", &[]).is_null());

        let sum = registry.invoke(&one, "__add", &[one.as_ptr()]);
        assert_eq!(sum.get::<i32>().unwrap(), 2);
    }

    #[test]
    fn test_checked_division_by_zero_is_soft() {
        let registry = Registry::new();
        registry.auto::<u64>().checked_arithmetic().checked_remainder();

        let ten = SharedObject::new(10u64);
        let zero = SharedObject::new(0u64);
        assert!(registry.invoke(&ten, "__div", &[zero.as_ptr()]).is_null());
        assert!(registry.invoke(&ten, "__mod", &[zero.as_ptr()]).is_null());

        let three = SharedObject::new(3u64);
        let quotient = registry.invoke(&ten, "__div", &[three.as_ptr()]);
        assert_eq!(quotient.get::<u64>().unwrap(), 3);
        let rest = registry.invoke(&ten, "__mod", &[three.as_ptr()]);
        assert_eq!(rest.get::<u64>().unwrap(), 1);
    }

    #[test]
    fn test_checked_floats_follow_ieee() {
        let registry = Registry::new();
        registry.auto::<f64>().checked_arithmetic();

        let one = SharedObject::new(1.0f64);
        let zero = SharedObject::new(0.0f64);
        let inf = registry.call(&one, "__div", &[zero.as_ptr()]).unwrap();
        assert!(inf.get::<f64>().unwrap().is_infinite());
    }
}
