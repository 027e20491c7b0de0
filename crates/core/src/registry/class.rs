//! Per-type descriptors stored by the registry

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use slotmap::new_key_type;

use super::Registry;
use crate::auto::Capabilities;
use crate::error::ReflectResult;
use crate::object::{ObjectPtr, Projection, SharedObject};
use crate::types::{TypeIdentity, TypeSignature, TypeSpec};

new_key_type! {
    /// Handle for a registered method
    pub struct MethodKey;
}

/// Tag name to tag values
pub type TagList = BTreeMap<String, Vec<String>>;

/// Builds a fresh instance from constructor arguments
pub type ConstructorThunk =
    Arc<dyn Fn(&Registry, &[ObjectPtr]) -> ReflectResult<SharedObject> + Send + Sync>;

/// Produces a view of a field given the instance and its class arguments
pub type FieldAccessor =
    Arc<dyn Fn(&ObjectPtr, &[TypeSignature]) -> ReflectResult<ObjectPtr> + Send + Sync>;

/// Type-erased method body
pub type MethodThunk = Arc<dyn Fn(&CallInfo<'_>) -> ReflectResult<SharedObject> + Send + Sync>;

/// Everything a method body receives
pub struct CallInfo<'a> {
    pub registry: &'a Registry,
    /// Receiver, already projected to the declaring class; a typed null for static calls
    pub this: &'a ObjectPtr,
    /// Arguments, already converted to the declared parameter types
    pub args: &'a [ObjectPtr],
    pub class_args: &'a [TypeSignature],
    pub func_args: &'a [TypeSignature],
}

/// Name plus tags of a field or method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub tags: TagList,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: TagList::new(),
        }
    }

    /// Append values under a tag
    pub fn tag<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for MemberInfo {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MemberInfo {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<crate::meta::MetaMethod> for MemberInfo {
    fn from(meta: crate::meta::MetaMethod) -> Self {
        Self::new(meta.name())
    }
}

/// One declared base of a class
#[derive(Clone)]
pub(crate) struct ParentEdge {
    pub ty: TypeIdentity,
    pub cast: Projection,
}

/// Registry entry for one type
#[derive(Clone)]
pub struct ClassDescriptor {
    pub(crate) identity: TypeIdentity,
    pub(crate) alias_target: Option<TypeIdentity>,
    pub(crate) parents: Vec<ParentEdge>,
    pub(crate) tags: TagList,
    pub(crate) ctor: Option<ConstructorThunk>,
    pub(crate) capabilities: Capabilities,
}

impl ClassDescriptor {
    pub(crate) fn new(identity: TypeIdentity) -> Self {
        Self {
            identity: identity.decay(),
            alias_target: None,
            parents: Vec::new(),
            tags: TagList::new(),
            ctor: None,
            capabilities: Capabilities::empty(),
        }
    }

    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    pub fn name(&self) -> &'static str {
        self.identity.name()
    }

    pub fn alias_target(&self) -> Option<TypeIdentity> {
        self.alias_target
    }

    pub fn parents(&self) -> Vec<TypeIdentity> {
        self.parents.iter().map(|p| p.ty).collect()
    }

    pub fn tags(&self) -> &TagList {
        &self.tags
    }

    pub fn is_constructible(&self) -> bool {
        self.ctor.is_some()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("identity", &self.identity)
            .field("alias_target", &self.alias_target)
            .field("parents", &self.parents())
            .field("tags", &self.tags)
            .field("constructible", &self.is_constructible())
            .finish()
    }
}

/// Registry entry for one field
#[derive(Clone)]
pub struct FieldDescriptor {
    pub(crate) info: MemberInfo,
    pub(crate) ty: TypeSpec,
    pub(crate) accessor: FieldAccessor,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn tags(&self) -> &TagList {
        &self.info.tags
    }

    pub fn ty(&self) -> &TypeSpec {
        &self.ty
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.info.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// Declared shape of a method, without its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub info: MemberInfo,
    pub ret: TypeSpec,
    pub params: Vec<TypeSpec>,
    pub is_static: bool,
}

impl MethodDecl {
    pub fn new(info: impl Into<MemberInfo>, ret: TypeSpec, params: Vec<TypeSpec>) -> Self {
        Self {
            info: info.into(),
            ret,
            params,
            is_static: false,
        }
    }

    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Same return type and parameter list
    pub fn same_declaration(&self, other: &MethodDecl) -> bool {
        self.ret == other.ret && self.params == other.params
    }

    pub(crate) fn describe(&self, class: TypeIdentity) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!(
            "{} {}::{}({})",
            self.ret,
            class.name(),
            self.info.name,
            params.join(", ")
        )
    }
}

/// Registry entry for one method overload
#[derive(Clone)]
pub struct MethodDescriptor {
    pub(crate) class: TypeIdentity,
    pub(crate) decl: MethodDecl,
    pub(crate) thunk: MethodThunk,
}

impl MethodDescriptor {
    pub fn class(&self) -> TypeIdentity {
        self.class
    }

    pub fn decl(&self) -> &MethodDecl {
        &self.decl
    }

    pub fn name(&self) -> &str {
        &self.decl.info.name
    }
}

/// `ret Class::name(params)`
impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.decl.is_static { "static " } else { "" };
        write!(f, "{prefix}{}", self.decl.describe(self.class))
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodDescriptor({})", self.decl.describe(self.class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_info_tags() {
        let info = MemberInfo::new("speed")
            .tag("unit", ["m/s"])
            .tag("unit", vec![String::from("km/h")]);
        assert_eq!(info.name, "speed");
        assert_eq!(info.tags["unit"], vec!["m/s", "km/h"]);
    }

    #[test]
    fn test_same_declaration_ignores_name_and_tags() {
        let a = MethodDecl::new("f", TypeSpec::of::<i32>(), vec![TypeSpec::of::<u8>()]);
        let b = MethodDecl::new(MemberInfo::new("f").tag("k", ["v"]), TypeSpec::of::<i32>(), vec![TypeSpec::of::<u8>()]);
        let c = MethodDecl::new("f", TypeSpec::of::<i32>(), vec![TypeSpec::of::<u16>()]);
        assert!(a.same_declaration(&b));
        assert!(!a.same_declaration(&c));
    }

    #[test]
    fn test_describe() {
        let decl = MethodDecl::new("add", TypeSpec::of::<i32>(), vec![TypeSpec::of::<i32>(), TypeSpec::of_ref::<u8>()]);
        assert_eq!(decl.describe(TypeIdentity::raw("Calc")), "i32 Calc::add(i32, &u8)");
    }
}
