//! Namespaces: virtual classes named by a `::`-joined path
//!
//! Functions are attached to a namespace as static methods of its
//! identity, so they resolve through the ordinary invocation engine.

use std::fmt;
use std::sync::Arc;

use crate::bind::IntoFunction;
use crate::object::{ObjectPtr, SharedObject};
use crate::registry::{CallInfo, MemberInfo, MethodDecl, MethodKey, MethodThunk, Registry, TagList};
use crate::types::{TypeIdentity, TypeSpec};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace {
    space: TypeIdentity,
}

impl Namespace {
    /// The root namespace (empty path)
    pub fn global() -> Self {
        Self::new("")
    }

    pub fn new(path: &str) -> Self {
        Self {
            space: TypeIdentity::raw(path),
        }
    }

    pub fn path(&self) -> &'static str {
        self.space.name()
    }

    pub fn identity(&self) -> TypeIdentity {
        self.space
    }

    fn join(&self, name: &str) -> String {
        if self.path().is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.path(), name)
        }
    }

    /// A nested namespace
    pub fn namespace(&self, name: &str) -> Namespace {
        Namespace::new(&self.join(name))
    }

    /// Identity of a class declared in this namespace
    pub fn class_type(&self, name: &str) -> TypeIdentity {
        TypeIdentity::raw(&self.join(name))
    }

    /// Make the namespace itself a registered (virtual) class
    pub fn register(&self, registry: &Registry) -> TypeIdentity {
        let space = self.space;
        registry.register_virtual_class(
            self.path(),
            move |_: &Registry, _: &[ObjectPtr]| Ok(SharedObject::alias(ObjectPtr::typed_null(space))),
            TagList::new(),
        )
    }

    /// Attach a free function to this namespace
    pub fn add_function<M, F>(&self, registry: &Registry, info: impl Into<MemberInfo>, function: F) -> MethodKey
    where
        F: IntoFunction<M>,
    {
        registry.add_static_method(self.space, info, function)
    }

    pub fn invoke(&self, registry: &Registry, name: &str, args: &[ObjectPtr]) -> SharedObject {
        registry.invoke_static(self.space, name, args)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({:?})", self.path())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Reflect the namespace handle type itself
pub(crate) fn register(registry: &Registry) {
    let ty = registry.register_class::<Namespace>(TagList::new());
    if let Err(err) = registry.alias_class("Namespace", ty) {
        registry.report(err);
    }
    registry.add_static_method(ty, "global", Namespace::global);
    registry.add_method("namespace", |ns: &Namespace, name: String| ns.namespace(&name));
    registry.add_method("path", |ns: &Namespace| ns.path().to_string());
    registry.add_method("class_type", |ns: &Namespace, name: String| {
        ns.class_type(&name).name().to_string()
    });
    registry.add_method(crate::meta::MetaMethod::ToString, |ns: &Namespace| {
        format!("namespace {}", ns.path())
    });

    // the receiver is read out first so the call may land anywhere
    let invoke: MethodThunk = Arc::new(|call: &CallInfo<'_>| {
        let ns: Namespace = call.this.get()?;
        let mut i = 0;
        let name: String = crate::bind::take_arg(call.args, &mut i)?;
        let args: Vec<ObjectPtr> = crate::bind::take_arg(call.args, &mut i)?;
        Ok(ns.invoke(call.registry, &name, &args))
    });
    registry.add_method_raw(
        ty,
        MethodDecl::new(
            "Invoke",
            TypeSpec::any(),
            vec![TypeSpec::of::<String>(), TypeSpec::of::<Vec<ObjectPtr>>()],
        ),
        invoke,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let global = Namespace::global();
        assert_eq!(global.path(), "");
        let math = global.namespace("math");
        assert_eq!(math.path(), "math");
        assert_eq!(math.namespace("linear").path(), "math::linear");
        assert_eq!(math.class_type("Vec3"), TypeIdentity::raw("math::Vec3"));
    }

    #[test]
    fn test_functions_resolve_through_the_namespace() {
        let registry = Registry::new();
        let math = Namespace::new("math");
        math.register(&registry);
        math.add_function(&registry, "square", |x: i32| x * x);

        let four = SharedObject::new(4i32);
        let out = math.invoke(&registry, "square", &[four.as_ptr()]);
        assert_eq!(out.get::<i32>().unwrap(), 16);
        assert!(math.invoke(&registry, "cube", &[four.as_ptr()]).is_null());

        let handle = registry.new_by_name("math", &[]);
        assert_eq!(handle.identity(), math.identity());
    }

    #[test]
    fn test_reflected_namespace_handle() {
        let registry = Registry::new();
        register(&registry);
        let math = Namespace::new("tools");
        math.add_function(&registry, "twice", |x: i32| x * 2);

        let handle = SharedObject::new(math);
        let name = SharedObject::new(String::from("twice"));
        let three = SharedObject::new(3i32);
        let args = SharedObject::new(vec![three.as_ptr()]);
        let out = registry
            .call(&handle, "Invoke", &[name.as_ptr(), args.as_ptr()])
            .unwrap();
        assert_eq!(out.get::<i32>().unwrap(), 6);

        let global = registry
            .call_static(TypeIdentity::raw("Namespace"), "global", &[])
            .unwrap();
        assert_eq!(global.get::<Namespace>().unwrap(), Namespace::global());
    }
}
