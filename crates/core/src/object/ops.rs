//! Operator sugar: every operator is an invocation of its metamethod

use super::{ObjectPtr, SharedObject};
use crate::meta::MetaMethod;
use crate::registry::Registry;

macro_rules! binary_ops {
    ($($(#[$doc:meta])* $fn_name:ident => $meta:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(&self, registry: &Registry, rhs: &ObjectPtr) -> SharedObject {
                registry.operate(self, MetaMethod::$meta, &[rhs.clone()])
            }
        )*
    };
}

macro_rules! unary_ops {
    ($($(#[$doc:meta])* $fn_name:ident => $meta:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(&self, registry: &Registry) -> SharedObject {
                registry.operate(self, MetaMethod::$meta, &[])
            }
        )*
    };
}

impl ObjectPtr {
    binary_ops! {
        add => Add,
        sub => Sub,
        mul => Mul,
        div => Div,
        rem => Mod,
        pow => Pow,
        equals => Eq,
        not_equals => Ne,
        less => Lt,
        less_equal => Le,
        greater => Gt,
        greater_equal => Ge,
        /// Element access; maps insert missing keys
        index => Index,
    }

    unary_ops! {
        neg => Neg,
        /// Value a cursor points at
        indirection => Deref,
        begin => Begin,
        end => End,
        pre_inc => Inc,
        pre_dec => Dec,
        copy_value => Copy,
    }

    /// Postfix increment; the dummy argument selects the postfix overload
    pub fn post_inc(&self, registry: &Registry) -> SharedObject {
        registry.operate(self, MetaMethod::Inc, &[SharedObject::new(0i32).as_ptr()])
    }

    pub fn post_dec(&self, registry: &Registry) -> SharedObject {
        registry.operate(self, MetaMethod::Dec, &[SharedObject::new(0i32).as_ptr()])
    }

    pub fn call(&self, registry: &Registry, args: &[ObjectPtr]) -> SharedObject {
        registry.operate(self, MetaMethod::Call, args)
    }

    /// Invoke a named method on this value
    pub fn invoke(&self, registry: &Registry, name: &str, args: &[ObjectPtr]) -> SharedObject {
        registry.invoke(self, name, args)
    }

    pub fn field(&self, registry: &Registry, name: &str) -> ObjectPtr {
        registry.get_field(self, name)
    }

    /// Text produced by `__tostring`
    pub fn display(&self, registry: &Registry) -> String {
        registry.stringify(self)
    }
}
