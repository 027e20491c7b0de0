//! Generic type signatures and parameter specs
//!
//! A [`TypeSignature`] is the full runtime type of a value: a base identity
//! plus ordered generic arguments. A [`TypeSpec`] is what a registered
//! method declares for a parameter or return slot; it may point at one of
//! the enclosing class's generic arguments or one of the call's own.

use std::fmt;

use super::identity::TypeIdentity;

/// A base identity plus its ordered generic arguments
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeSignature {
    pub base: TypeIdentity,
    pub args: Vec<TypeSignature>,
}

impl TypeSignature {
    pub fn new(base: TypeIdentity) -> Self {
        Self {
            base,
            args: Vec::new(),
        }
    }

    pub fn with_args(base: TypeIdentity, args: Vec<TypeSignature>) -> Self {
        Self { base, args }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeIdentity::of::<T>())
    }

    pub fn void() -> Self {
        Self::new(TypeIdentity::void())
    }

    pub fn is_void(&self) -> bool {
        self.base.is_void()
    }

    /// Same signature with the base re-qualified
    pub fn qualified(&self, is_ref: bool, is_const: bool) -> Self {
        Self {
            base: self.base.with_ref(is_ref).with_const(is_const),
            args: self.args.clone(),
        }
    }

    /// Same signature with all qualifiers dropped from the base
    pub fn decayed(&self) -> Self {
        Self {
            base: self.base.decay(),
            args: self.args.clone(),
        }
    }
}

impl From<TypeIdentity> for TypeSignature {
    fn from(base: TypeIdentity) -> Self {
        Self::new(base)
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSignature({self})")
    }
}

/// Where a declared parameter type comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeSlot {
    /// A fixed type
    Concrete(TypeIdentity),
    /// Position in the receiver's generic arguments
    ClassArg(usize),
    /// Position in the call's own generic arguments
    FuncArg(usize),
    /// Accepts any argument; matching it puts the candidate in the generic bucket
    Any,
}

impl TypeSlot {
    /// Decode the signed slot convention: zero is concrete, positive values
    /// are 1-based class slots, negative values are 1-based call slots.
    pub fn from_signed(index: i32, concrete: TypeIdentity) -> Self {
        match index {
            0 => TypeSlot::Concrete(concrete),
            i if i > 0 => TypeSlot::ClassArg((i - 1) as usize),
            i => TypeSlot::FuncArg((-i - 1) as usize),
        }
    }

    /// Inverse of [`TypeSlot::from_signed`]; `Any` has no signed form
    pub fn signed_index(&self) -> Option<i32> {
        match self {
            TypeSlot::Concrete(_) => Some(0),
            TypeSlot::ClassArg(i) => Some(*i as i32 + 1),
            TypeSlot::FuncArg(i) => Some(-(*i as i32) - 1),
            TypeSlot::Any => None,
        }
    }
}

/// How strictly a declared spec is compared against an actual signature
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    /// Fingerprints only, qualifiers ignored
    Loose,
    /// Fingerprints and qualifiers
    Qualified,
    /// Qualifier-compatible or reachable through the numeric table
    Convertible,
    /// Like `Convertible`, but open slots accept anything
    Template,
}

/// Declared type of a parameter or return value
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    pub slot: TypeSlot,
    pub params: Vec<TypeSpec>,
}

impl TypeSpec {
    pub fn concrete(ty: TypeIdentity) -> Self {
        Self {
            slot: TypeSlot::Concrete(ty),
            params: Vec::new(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::concrete(TypeIdentity::of::<T>())
    }

    pub fn of_ref<T: ?Sized + 'static>() -> Self {
        Self::concrete(TypeIdentity::of_ref::<T>())
    }

    pub fn of_mut<T: ?Sized + 'static>() -> Self {
        Self::concrete(TypeIdentity::of_mut::<T>())
    }

    pub fn class_arg(index: usize) -> Self {
        Self {
            slot: TypeSlot::ClassArg(index),
            params: Vec::new(),
        }
    }

    pub fn func_arg(index: usize) -> Self {
        Self {
            slot: TypeSlot::FuncArg(index),
            params: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self {
            slot: TypeSlot::Any,
            params: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::concrete(TypeIdentity::void())
    }

    pub fn with_params(mut self, params: Vec<TypeSpec>) -> Self {
        self.params = params;
        self
    }

    /// Whether this spec or any nested parameter refers to a generic slot
    pub fn is_open(&self) -> bool {
        !matches!(self.slot, TypeSlot::Concrete(_)) || self.params.iter().any(TypeSpec::is_open)
    }

    /// Whether this spec or any nested parameter is the `Any` wildcard
    pub fn has_wildcard(&self) -> bool {
        matches!(self.slot, TypeSlot::Any) || self.params.iter().any(TypeSpec::has_wildcard)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.slot, TypeSlot::Concrete(ty) if ty.is_void())
    }

    fn resolve<'a>(
        &self,
        class_args: &'a [TypeSignature],
        func_args: &'a [TypeSignature],
    ) -> Option<&'a TypeSignature> {
        match self.slot {
            TypeSlot::ClassArg(i) => class_args.get(i),
            TypeSlot::FuncArg(i) => func_args.get(i),
            _ => None,
        }
    }

    /// Compare this spec with an actual argument signature
    ///
    /// Generic slots are substituted from `class_args`/`func_args` first.
    /// In [`MatchMode::Template`] a slot that cannot be substituted, and
    /// the `Any` wildcard, match anything.
    pub fn matches(
        &self,
        actual: &TypeSignature,
        class_args: &[TypeSignature],
        func_args: &[TypeSignature],
        mode: MatchMode,
    ) -> bool {
        let formal = match self.slot {
            TypeSlot::Any => return mode == MatchMode::Template,
            TypeSlot::Concrete(ty) => ty,
            TypeSlot::ClassArg(_) | TypeSlot::FuncArg(_) => {
                match self.resolve(class_args, func_args) {
                    Some(sig) if self.params.is_empty() => {
                        return sig.base.equal_to(&actual.base, true)
                            && sig.args.len() == actual.args.len()
                            && sig.args.iter().zip(&actual.args).all(|(s, a)| {
                                TypeSpec::from(s).matches(a, class_args, func_args, mode)
                            });
                    }
                    Some(sig) => sig.base,
                    None => return mode == MatchMode::Template,
                }
            }
        };

        if self.params.len() != actual.args.len() {
            return false;
        }
        let base_ok = match mode {
            MatchMode::Loose => formal.equal_to(&actual.base, true),
            MatchMode::Qualified => formal == actual.base,
            MatchMode::Convertible | MatchMode::Template => actual.base.can_be_applied_to(&formal),
        };
        base_ok
            && self
                .params
                .iter()
                .zip(&actual.args)
                .all(|(p, a)| p.matches(a, class_args, func_args, mode))
    }

    /// Substitute generic slots, producing a concrete signature
    ///
    /// Unresolvable slots and wildcards become the null identity.
    pub fn apply_with(
        &self,
        class_args: &[TypeSignature],
        func_args: &[TypeSignature],
    ) -> TypeSignature {
        match self.slot {
            TypeSlot::Concrete(ty) => TypeSignature::with_args(
                ty,
                self.params
                    .iter()
                    .map(|p| p.apply_with(class_args, func_args))
                    .collect(),
            ),
            TypeSlot::Any => TypeSignature::new(TypeIdentity::null()),
            TypeSlot::ClassArg(_) | TypeSlot::FuncArg(_) => {
                match self.resolve(class_args, func_args) {
                    Some(sig) if self.params.is_empty() => sig.clone(),
                    Some(sig) => TypeSignature::with_args(
                        sig.base,
                        self.params
                            .iter()
                            .map(|p| p.apply_with(class_args, func_args))
                            .collect(),
                    ),
                    None => TypeSignature::new(TypeIdentity::null()),
                }
            }
        }
    }
}

impl From<&TypeSignature> for TypeSpec {
    fn from(sig: &TypeSignature) -> Self {
        Self {
            slot: TypeSlot::Concrete(sig.base),
            params: sig.args.iter().map(TypeSpec::from).collect(),
        }
    }
}

impl From<TypeIdentity> for TypeSpec {
    fn from(ty: TypeIdentity) -> Self {
        Self::concrete(ty)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            TypeSlot::Concrete(ty) => write!(f, "{ty}")?,
            TypeSlot::ClassArg(i) => write!(f, "$class{i}")?,
            TypeSlot::FuncArg(i) => write!(f, "$fn{i}")?,
            TypeSlot::Any => f.write_str("_")?,
        }
        if !self.params.is_empty() {
            f.write_str("<")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{p}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSpec({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Wrapper;

    fn wrapper_of(arg: TypeSignature) -> TypeSignature {
        TypeSignature::with_args(TypeIdentity::of::<Wrapper>(), vec![arg])
    }

    #[test]
    fn test_signed_slot_convention() {
        let ty = TypeIdentity::of::<i32>();
        assert_eq!(TypeSlot::from_signed(0, ty), TypeSlot::Concrete(ty));
        assert_eq!(TypeSlot::from_signed(1, ty), TypeSlot::ClassArg(0));
        assert_eq!(TypeSlot::from_signed(3, ty), TypeSlot::ClassArg(2));
        assert_eq!(TypeSlot::from_signed(-1, ty), TypeSlot::FuncArg(0));
        assert_eq!(TypeSlot::from_signed(-2, ty), TypeSlot::FuncArg(1));
        for i in [-3, -1, 0, 1, 4] {
            assert_eq!(TypeSlot::from_signed(i, ty).signed_index(), Some(i));
        }
        assert_eq!(TypeSlot::Any.signed_index(), None);
    }

    #[test]
    fn test_modes_on_concrete_spec() {
        let spec = TypeSpec::of_ref::<i32>();
        let value = TypeSignature::of::<i32>();
        let shared = TypeSignature::new(TypeIdentity::of_ref::<i32>());
        let float = TypeSignature::of::<f64>();

        assert!(spec.matches(&value, &[], &[], MatchMode::Loose));
        assert!(!spec.matches(&value, &[], &[], MatchMode::Qualified));
        assert!(spec.matches(&shared, &[], &[], MatchMode::Qualified));
        assert!(spec.matches(&value, &[], &[], MatchMode::Convertible));
        assert!(!spec.matches(&float, &[], &[], MatchMode::Loose));
        assert!(spec.matches(&float, &[], &[], MatchMode::Convertible));
    }

    #[test]
    fn test_class_slot_substitution() {
        let spec = TypeSpec::class_arg(0);
        let class_args = [TypeSignature::of::<String>()];

        assert!(spec.matches(&TypeSignature::of::<String>(), &class_args, &[], MatchMode::Qualified));
        assert!(!spec.matches(&TypeSignature::of::<i32>(), &class_args, &[], MatchMode::Convertible));
        assert_eq!(spec.apply_with(&class_args, &[]), TypeSignature::of::<String>());
    }

    #[test]
    fn test_func_slot_inside_concrete_params() {
        let spec = TypeSpec::of::<Wrapper>().with_params(vec![TypeSpec::func_arg(0)]);
        let func_args = [TypeSignature::of::<u8>()];

        assert!(spec.matches(&wrapper_of(TypeSignature::of::<u8>()), &[], &func_args, MatchMode::Convertible));
        assert!(!spec.matches(&TypeSignature::of::<Wrapper>(), &[], &func_args, MatchMode::Convertible));
        assert_eq!(
            spec.apply_with(&[], &func_args),
            wrapper_of(TypeSignature::of::<u8>())
        );
    }

    #[test]
    fn test_unbound_slots_only_match_in_template_mode() {
        let spec = TypeSpec::class_arg(0);
        let actual = TypeSignature::of::<i32>();
        assert!(!spec.matches(&actual, &[], &[], MatchMode::Convertible));
        assert!(spec.matches(&actual, &[], &[], MatchMode::Template));
        assert!(TypeSpec::any().matches(&actual, &[], &[], MatchMode::Template));
        assert!(!TypeSpec::any().matches(&actual, &[], &[], MatchMode::Qualified));
    }

    #[test]
    fn test_open_and_wildcard_detection() {
        assert!(!TypeSpec::of::<i32>().is_open());
        assert!(TypeSpec::of::<Wrapper>().with_params(vec![TypeSpec::class_arg(0)]).is_open());
        assert!(TypeSpec::of::<Wrapper>().with_params(vec![TypeSpec::any()]).has_wildcard());
        assert!(!TypeSpec::class_arg(0).has_wildcard());
    }

    #[test]
    fn test_display() {
        assert_eq!(wrapper_of(TypeSignature::of::<i32>()).to_string(), format!("{}<i32>", std::any::type_name::<Wrapper>()));
        assert_eq!(TypeSpec::class_arg(1).to_string(), "$class1");
    }
}
