//! Implicit numeric conversion table
//!
//! Every built-in numeric kind converts to every other. Conversion goes
//! through a widened intermediate (`i128` for integers, `f64` for floats)
//! and then an `as` cast, so narrowing truncates and float-to-int
//! saturates.

use std::any::Any;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::identity::TypeIdentity;

#[derive(Clone, Copy, Debug)]
enum Number {
    Int(i128),
    Float(f64),
}

trait Numeric: Copy + Send + 'static {
    fn to_number(self) -> Number;
    fn from_number(number: Number) -> Self;
}

macro_rules! int_numeric {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn to_number(self) -> Number {
                    Number::Int(self as i128)
                }

                fn from_number(number: Number) -> Self {
                    match number {
                        Number::Int(v) => v as $ty,
                        Number::Float(v) => v as $ty,
                    }
                }
            }
        )*
    };
}

macro_rules! float_numeric {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn to_number(self) -> Number {
                    Number::Float(self as f64)
                }

                fn from_number(number: Number) -> Self {
                    match number {
                        Number::Int(v) => v as $ty,
                        Number::Float(v) => v as $ty,
                    }
                }
            }
        )*
    };
}

int_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
float_numeric!(f32, f64);

macro_rules! numeric_kinds {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        /// Built-in numeric kinds that take part in implicit conversion
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum NumericKind {
            $($kind),*
        }

        impl NumericKind {
            pub const ALL: &'static [NumericKind] = &[$(NumericKind::$kind),*];

            pub fn identity(self) -> TypeIdentity {
                match self {
                    $(NumericKind::$kind => TypeIdentity::of::<$ty>()),*
                }
            }

            fn read(self, value: &dyn Any) -> Option<Number> {
                match self {
                    $(NumericKind::$kind => value.downcast_ref::<$ty>().map(|v| v.to_number())),*
                }
            }

            fn write(self, number: Number) -> Box<dyn Any + Send> {
                match self {
                    $(NumericKind::$kind => Box::new(<$ty as Numeric>::from_number(number))),*
                }
            }
        }
    };
}

numeric_kinds! {
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    Isize => isize,
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    Usize => usize,
    F32 => f32,
    F64 => f64,
}

static KINDS: LazyLock<HashMap<u64, NumericKind>> = LazyLock::new(|| {
    NumericKind::ALL
        .iter()
        .map(|kind| (kind.identity().hash(), *kind))
        .collect()
});

impl NumericKind {
    /// Numeric kind of an identity, ignoring qualifiers
    pub fn of(ty: &TypeIdentity) -> Option<NumericKind> {
        KINDS.get(&ty.hash()).copied()
    }
}

/// Whether the table holds a conversion from `from` to `to`
pub fn can_convert(from: &TypeIdentity, to: &TypeIdentity) -> bool {
    from.hash() != to.hash() && NumericKind::of(from).is_some() && NumericKind::of(to).is_some()
}

/// Produce a freshly allocated value of `to` from a value of `from`
///
/// Returns `None` when either side is not numeric or `value` does not
/// actually hold a `from`.
pub fn convert_value(
    value: &dyn Any,
    from: &TypeIdentity,
    to: &TypeIdentity,
) -> Option<Box<dyn Any + Send>> {
    let source = NumericKind::of(from)?;
    let target = NumericKind::of(to)?;
    let number = source.read(value)?;
    Some(target.write(number))
}
