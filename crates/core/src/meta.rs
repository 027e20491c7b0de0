//! Operator vocabulary
//!
//! Operators on dynamic values are ordinary registered methods under
//! reserved `__`-prefixed names. A type supports an operator exactly when
//! a method with that name is registered for it.

use std::fmt;

macro_rules! meta_methods {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Reserved operator method names
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum MetaMethod {
            $($variant),*
        }

        impl MetaMethod {
            pub const ALL: &'static [MetaMethod] = &[$(MetaMethod::$variant),*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(MetaMethod::$variant => $name),*
                }
            }

            pub fn from_name(name: &str) -> Option<MetaMethod> {
                match name {
                    $($name => Some(MetaMethod::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

meta_methods! {
    Add => "__add",
    Sub => "__sub",
    Mul => "__mul",
    Div => "__div",
    Mod => "__mod",
    Pow => "__pow",
    Eq => "__eq",
    Ne => "__ne",
    Lt => "__lt",
    Le => "__le",
    Gt => "__gt",
    Ge => "__ge",
    Neg => "__unm",
    Index => "__index",
    Call => "__call",
    Ctor => "__ctor",
    Dtor => "__dtor",
    Begin => "__begin",
    End => "__end",
    Deref => "__indirection",
    Inc => "__inc",
    Dec => "__dec",
    Copy => "__copy",
    ToString => "__tostring",
}

impl MetaMethod {
    /// Binary operators take exactly one right-hand operand
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            MetaMethod::Add
                | MetaMethod::Sub
                | MetaMethod::Mul
                | MetaMethod::Div
                | MetaMethod::Mod
                | MetaMethod::Pow
                | MetaMethod::Eq
                | MetaMethod::Ne
                | MetaMethod::Lt
                | MetaMethod::Le
                | MetaMethod::Gt
                | MetaMethod::Ge
        )
    }
}

impl fmt::Display for MetaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AsRef<str> for MetaMethod {
    fn as_ref(&self) -> &str {
        self.name()
    }
}
