//! Qualifier-aware type fingerprints

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use dashmap::DashMap;

use super::convert;
use super::hash::type_hash;

/// Interned names of types known only by their registered name
///
/// Raw identities are created once per distinct name and live for the
/// rest of the process, like the descriptors that refer to them.
static RAW_NAMES: LazyLock<DashMap<u64, &'static str>> = LazyLock::new(DashMap::new);

fn intern(name: &str) -> &'static str {
    let hash = type_hash(name);
    if let Some(existing) = RAW_NAMES.get(&hash) {
        return *existing;
    }
    *RAW_NAMES
        .entry(hash)
        .or_insert_with(|| Box::leak(name.to_owned().into_boxed_str()))
}

/// Structural fingerprint of a type plus its reference/const qualifiers
///
/// Two identities are equal when hash, reference-ness and const-ness all
/// match. Registry tables key on [`TypeIdentity::hash`] alone, so the
/// qualifiers only matter for parameter compatibility.
///
/// Qualifiers follow Rust borrows: [`TypeIdentity::of_ref`] is a shared
/// (const) reference and [`TypeIdentity::of_mut`] a mutable one.
#[derive(Clone, Copy)]
pub struct TypeIdentity {
    hash: u64,
    name: &'static str,
    is_ref: bool,
    is_const: bool,
}

impl TypeIdentity {
    /// Identity of a statically known type, taken by value
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        Self {
            hash: type_hash(name),
            name,
            is_ref: false,
            is_const: false,
        }
    }

    /// Identity of `&T`
    pub fn of_ref<T: ?Sized + 'static>() -> Self {
        Self {
            is_ref: true,
            is_const: true,
            ..Self::of::<T>()
        }
    }

    /// Identity of `&mut T`
    pub fn of_mut<T: ?Sized + 'static>() -> Self {
        Self {
            is_ref: true,
            ..Self::of::<T>()
        }
    }

    /// Identity of a type known only by name (virtual classes, namespaces, aliases)
    pub fn raw(name: &str) -> Self {
        let name = intern(name);
        Self {
            hash: type_hash(name),
            name,
            is_ref: false,
            is_const: false,
        }
    }

    /// The unset identity; never registered, never equal to a real type
    pub const fn null() -> Self {
        Self {
            hash: 0,
            name: "",
            is_ref: false,
            is_const: false,
        }
    }

    /// Identity carried by the canonical null value
    pub fn void() -> Self {
        Self::of::<()>()
    }

    pub fn is_null(&self) -> bool {
        self.hash == 0
    }

    pub fn is_void(&self) -> bool {
        self.hash == Self::void().hash
    }

    /// Fingerprint of the decayed name
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Decayed display name
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_ref(&self) -> bool {
        self.is_ref
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    pub fn with_ref(mut self, is_ref: bool) -> Self {
        self.is_ref = is_ref;
        self
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    /// Drop both qualifiers
    pub fn decay(self) -> Self {
        Self {
            is_ref: false,
            is_const: false,
            ..self
        }
    }

    /// Compare fingerprints, optionally ignoring qualifiers
    pub fn equal_to(&self, other: &TypeIdentity, ignore_qualifiers: bool) -> bool {
        if ignore_qualifiers {
            self.hash == other.hash
        } else {
            self == other
        }
    }

    /// Whether a value of this type may bind to a parameter of type `target`
    ///
    /// Identical fingerprints only need compatible qualifiers. Different
    /// fingerprints need an entry in the numeric conversion table, and the
    /// converted temporary can never bind to a mutable reference.
    pub fn can_be_applied_to(&self, target: &TypeIdentity) -> bool {
        if self.hash != target.hash {
            return !target.is_mutable_ref() && convert::can_convert(self, target);
        }
        self.qualifiers_bind_to(target)
    }

    fn is_mutable_ref(&self) -> bool {
        self.is_ref && !self.is_const
    }

    /// Values are always readable; only `&mut` formals are picky.
    fn qualifiers_bind_to(&self, target: &TypeIdentity) -> bool {
        if !target.is_mutable_ref() {
            return true;
        }
        self.is_mutable_ref()
    }

    /// Convert a value of this (numeric) type into a fresh value of `target`
    pub fn implicit_convert(
        &self,
        value: &dyn Any,
        target: &TypeIdentity,
    ) -> Option<Box<dyn Any + Send>> {
        convert::convert_value(value, self, target)
    }
}

impl PartialEq for TypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.is_ref == other.is_ref && self.is_const == other.is_const
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
        self.is_ref.hash(state);
        self.is_const.hash(state);
    }
}

impl PartialOrd for TypeIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.hash, self.is_ref, self.is_const).cmp(&(other.hash, other.is_ref, other.is_const))
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_ref, self.is_const) {
            (true, true) => write!(f, "&{}", self.name),
            (true, false) => write!(f, "&mut {}", self.name),
            (false, true) => write!(f, "const {}", self.name),
            (false, false) => f.write_str(self.name),
        }
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeIdentity({self} #{:016x})", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point;

    #[test]
    fn test_equality_includes_qualifiers() {
        assert_eq!(TypeIdentity::of::<i32>(), TypeIdentity::of::<i32>());
        assert_ne!(TypeIdentity::of::<i32>(), TypeIdentity::of_ref::<i32>());
        assert_ne!(TypeIdentity::of_ref::<i32>(), TypeIdentity::of_mut::<i32>());
        assert!(TypeIdentity::of::<i32>().equal_to(&TypeIdentity::of_mut::<i32>(), true));
        assert_ne!(TypeIdentity::of::<i32>(), TypeIdentity::of::<u32>());
    }

    #[test]
    fn test_raw_names_are_interned() {
        let a = TypeIdentity::raw("Namespace::Thing");
        let b = TypeIdentity::raw(&String::from("Namespace::Thing"));
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.name(), b.name()));
        assert_eq!(a.name(), "Namespace::Thing");
    }

    #[test]
    fn test_null_and_void() {
        assert!(TypeIdentity::null().is_null());
        assert!(!TypeIdentity::void().is_null());
        assert!(TypeIdentity::void().is_void());
        assert!(!TypeIdentity::of::<Point>().is_void());
    }

    #[test]
    fn test_value_parameter_accepts_any_qualifier() {
        let target = TypeIdentity::of::<Point>();
        assert!(TypeIdentity::of::<Point>().can_be_applied_to(&target));
        assert!(TypeIdentity::of_ref::<Point>().can_be_applied_to(&target));
        assert!(TypeIdentity::of_mut::<Point>().can_be_applied_to(&target));
    }

    #[test]
    fn test_shared_ref_parameter_accepts_any_qualifier() {
        let target = TypeIdentity::of_ref::<Point>();
        assert!(TypeIdentity::of::<Point>().can_be_applied_to(&target));
        assert!(TypeIdentity::of_mut::<Point>().can_be_applied_to(&target));
    }

    #[test]
    fn test_mutable_ref_parameter_rejects_const_and_temporaries() {
        let target = TypeIdentity::of_mut::<Point>();
        assert!(TypeIdentity::of_mut::<Point>().can_be_applied_to(&target));
        assert!(!TypeIdentity::of_ref::<Point>().can_be_applied_to(&target));
        assert!(!TypeIdentity::of::<Point>().can_be_applied_to(&target));
        assert!(!TypeIdentity::of::<i64>().can_be_applied_to(&TypeIdentity::of_mut::<i32>()));
    }

    #[test]
    fn test_numeric_kinds_convert_between_each_other() {
        assert!(TypeIdentity::of::<i32>().can_be_applied_to(&TypeIdentity::of::<f64>()));
        assert!(TypeIdentity::of::<u8>().can_be_applied_to(&TypeIdentity::of::<i64>()));
        assert!(!TypeIdentity::of::<String>().can_be_applied_to(&TypeIdentity::of::<i32>()));
        assert!(!TypeIdentity::of::<Point>().can_be_applied_to(&TypeIdentity::of::<i32>()));
    }

    #[test]
    fn test_display_qualifiers() {
        assert_eq!(TypeIdentity::of::<i32>().to_string(), "i32");
        assert_eq!(TypeIdentity::of_ref::<i32>().to_string(), "&i32");
        assert_eq!(TypeIdentity::of_mut::<i32>().to_string(), "&mut i32");
    }
}
