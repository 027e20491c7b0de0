//! The registry's own control surface, registered on the registry type
//!
//! Lets code that only speaks reflection configure the registry: obtain
//! it through the static `Instance` method, then add fields and methods
//! or invoke members through ordinary reflected calls.

use std::fmt;
use std::sync::Arc;

use super::class::{CallInfo, FieldAccessor, MethodDecl, MethodThunk, TagList};
use super::Registry;
use crate::bind::take_arg;
use crate::error::ReflectResult;
use crate::object::{ObjectPtr, SharedObject};
use crate::types::{TypeIdentity, TypeSignature, TypeSpec};

/// A method body plus its declaration, passed around as a dynamic value
#[derive(Clone)]
pub struct DynMethod {
    pub params: Vec<TypeSpec>,
    pub ret: TypeSpec,
    pub thunk: MethodThunk,
}

impl DynMethod {
    pub fn new<F>(params: Vec<TypeSpec>, ret: TypeSpec, body: F) -> Self
    where
        F: Fn(&CallInfo<'_>) -> ReflectResult<SharedObject> + Send + Sync + 'static,
    {
        Self {
            params,
            ret,
            thunk: Arc::new(body),
        }
    }
}

impl fmt::Debug for DynMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynMethod")
            .field("params", &self.params)
            .field("ret", &self.ret)
            .finish()
    }
}

/// A field accessor passed around as a dynamic value
#[derive(Clone)]
pub struct DynField {
    pub ty: TypeSpec,
    pub accessor: FieldAccessor,
}

impl DynField {
    pub fn new<F>(ty: TypeSpec, accessor: F) -> Self
    where
        F: Fn(&ObjectPtr, &[TypeSignature]) -> ReflectResult<ObjectPtr> + Send + Sync + 'static,
    {
        Self {
            ty,
            accessor: Arc::new(accessor),
        }
    }
}

impl fmt::Debug for DynField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynField").field("ty", &self.ty).finish()
    }
}

/// The registry a call addresses; a static call addresses the calling one
fn receiver(call: &CallInfo<'_>) -> ReflectResult<Registry> {
    if call.this.is_null() {
        return Ok(call.registry.clone());
    }
    call.this.unwrap_shared().get::<Registry>()
}

fn export<F>(registry: &Registry, name: &str, params: Vec<TypeSpec>, ret: TypeSpec, body: F)
where
    F: Fn(&Registry, &[ObjectPtr]) -> ReflectResult<SharedObject> + Send + Sync + 'static,
{
    // the receiver is cloned out first so the body may call back into it
    let thunk: MethodThunk = Arc::new(move |call: &CallInfo<'_>| {
        let this = receiver(call)?;
        body(&this, call.args)
    });
    // static, so a typed-null receiver addresses the calling registry
    registry.add_method_raw(
        TypeIdentity::of::<Registry>(),
        MethodDecl::new(name, ret, params).into_static(),
        thunk,
    );
}

/// Register the registry type and its control surface
pub(crate) fn export_registry(registry: &Registry) {
    let ty = TypeIdentity::of::<Registry>();
    registry.register_class_with(
        ty,
        Arc::new(|registry: &Registry, _: &[ObjectPtr]| Ok(SharedObject::new(registry.clone()))),
        TagList::new(),
    );
    if let Err(err) = registry.alias_class("Registry", ty) {
        registry.report(err);
    }

    let instance: MethodThunk =
        Arc::new(|call: &CallInfo<'_>| Ok(SharedObject::new(call.registry.clone())));
    registry.add_method_raw(
        ty,
        MethodDecl::new("Instance", TypeSpec::of::<Registry>(), Vec::new()).into_static(),
        instance,
    );

    let string = TypeSpec::of::<String>;
    let args = TypeSpec::of::<Vec<ObjectPtr>>;

    export(
        registry,
        "AddField",
        vec![string(), string(), TypeSpec::of::<DynField>()],
        TypeSpec::void(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            let field: DynField = take_arg(argv, &mut i)?;
            this.add_field_raw(TypeIdentity::raw(&class), name, field.ty, field.accessor);
            Ok(SharedObject::null())
        },
    );
    export(
        registry,
        "AddStaticField",
        vec![string(), string(), TypeSpec::any()],
        TypeSpec::void(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            let value: SharedObject = take_arg(argv, &mut i)?;
            this.add_static_field(TypeIdentity::raw(&class), name, value);
            Ok(SharedObject::null())
        },
    );
    export(
        registry,
        "GetField",
        vec![TypeSpec::any(), string()],
        TypeSpec::any(),
        |this, argv| {
            let mut i = 0;
            let instance: ObjectPtr = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            Ok(SharedObject::alias(this.get_field(&instance.unwrap_shared(), &name)))
        },
    );
    export(
        registry,
        "GetStaticField",
        vec![string(), string()],
        TypeSpec::any(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            Ok(SharedObject::alias(this.get_static_field(TypeIdentity::raw(&class), &name)))
        },
    );
    export(
        registry,
        "AddMethod",
        vec![string(), string(), TypeSpec::of::<DynMethod>()],
        TypeSpec::void(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            let method: DynMethod = take_arg(argv, &mut i)?;
            let decl = MethodDecl::new(name, method.ret, method.params);
            this.add_method_raw(TypeIdentity::raw(&class), decl, method.thunk);
            Ok(SharedObject::null())
        },
    );
    export(
        registry,
        "AddStaticMethod",
        vec![string(), string(), TypeSpec::of::<DynMethod>()],
        TypeSpec::void(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            let method: DynMethod = take_arg(argv, &mut i)?;
            let decl = MethodDecl::new(name, method.ret, method.params).into_static();
            this.add_method_raw(TypeIdentity::raw(&class), decl, method.thunk);
            Ok(SharedObject::null())
        },
    );
    export(
        registry,
        "Invoke",
        vec![TypeSpec::any(), string(), args()],
        TypeSpec::any(),
        |this, argv| {
            let mut i = 0;
            let target: ObjectPtr = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            let call_args: Vec<ObjectPtr> = take_arg(argv, &mut i)?;
            Ok(this.invoke(&target.unwrap_shared(), &name, &call_args))
        },
    );
    export(
        registry,
        "InvokeStatic",
        vec![string(), string(), args()],
        TypeSpec::any(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let name: String = take_arg(argv, &mut i)?;
            let call_args: Vec<ObjectPtr> = take_arg(argv, &mut i)?;
            Ok(this.invoke_static(TypeIdentity::raw(&class), &name, &call_args))
        },
    );
    export(
        registry,
        "New",
        vec![string(), args()],
        TypeSpec::any(),
        |this, argv| {
            let mut i = 0;
            let class: String = take_arg(argv, &mut i)?;
            let call_args: Vec<ObjectPtr> = take_arg(argv, &mut i)?;
            Ok(this.new_by_name(&class, &call_args))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptrs(values: &[&SharedObject]) -> Vec<ObjectPtr> {
        values.iter().map(|v| v.as_ptr()).collect()
    }

    fn text(s: &str) -> SharedObject {
        SharedObject::new(s.to_string())
    }

    #[test]
    fn test_instance_is_the_calling_registry() {
        let registry = Registry::new();
        export_registry(&registry);
        let this = registry
            .call_static(TypeIdentity::of::<Registry>(), "Instance", &[])
            .unwrap();
        assert!(this.get::<Registry>().unwrap().ptr_eq(&registry));

        let by_name = registry.new_by_name("Registry", &[]);
        assert!(by_name.get::<Registry>().unwrap().ptr_eq(&registry));
    }

    #[test]
    fn test_configure_through_reflection() {
        let registry = Registry::new();
        export_registry(&registry);
        let this = registry
            .call_static(TypeIdentity::of::<Registry>(), "Instance", &[])
            .unwrap();

        // add a static field and read it back, all through reflected calls
        let (class, name, value) = (text("Settings"), text("limit"), SharedObject::new(5i32));
        registry
            .call(&this, "AddStaticField", &ptrs(&[&class, &name, &value]))
            .unwrap();
        let field = registry
            .call(&this, "GetStaticField", &ptrs(&[&class, &name]))
            .unwrap();
        assert_eq!(field.get::<i32>().unwrap(), 5);

        // add a static method and invoke it through InvokeStatic
        let method = SharedObject::new(DynMethod::new(
            vec![TypeSpec::of::<i32>()],
            TypeSpec::of::<i32>(),
            |call| Ok(SharedObject::new(call.args[0].get::<i32>()? * 2)),
        ));
        let method_name = text("double");
        registry
            .call(&this, "AddStaticMethod", &ptrs(&[&class, &method_name, &method]))
            .unwrap();
        let twenty_one = SharedObject::new(21i32);
        let call_args = SharedObject::new(vec![twenty_one.as_ptr()]);
        let out = registry
            .call(&this, "InvokeStatic", &ptrs(&[&class, &method_name, &call_args]))
            .unwrap();
        assert_eq!(out.get::<i32>().unwrap(), 42);
    }

    #[test]
    fn test_invoke_through_reflection() {
        let registry = Registry::new();
        export_registry(&registry);
        registry.add_static_method(TypeIdentity::raw("Math"), "inc", |x: i32| x + 1);
        let this = SharedObject::new(registry.clone());

        let forty_one = SharedObject::new(41i32);
        let call_args = SharedObject::new(vec![forty_one.as_ptr()]);
        let (class, name) = (text("Math"), text("inc"));
        let out = registry
            .call(&this, "InvokeStatic", &ptrs(&[&class, &name, &call_args]))
            .unwrap();
        assert_eq!(out.get::<i32>().unwrap(), 42);

        let missing = text("nope");
        let out = registry
            .call(&this, "InvokeStatic", &ptrs(&[&class, &missing, &call_args]))
            .unwrap();
        assert!(out.is_null());
        assert!(registry.diagnostics().last().is_some());
    }

    #[test]
    fn test_add_field_through_reflection() {
        #[derive(Default)]
        struct Counter {
            hits: u32,
        }

        fn hits(counter: &mut Counter) -> &mut u32 {
            &mut counter.hits
        }

        let registry = Registry::new();
        export_registry(&registry);
        registry.register_class::<Counter>(TagList::new());
        let class = text(TypeIdentity::of::<Counter>().name());
        let name = text("hits");
        let field = SharedObject::new(DynField::new(TypeSpec::of::<u32>(), |instance, _| {
            Ok(instance.project(
                &crate::object::Projection::field(hits),
                TypeSignature::of::<u32>(),
            ))
        }));
        let this = SharedObject::new(registry.clone());
        registry
            .call(&this, "AddField", &ptrs(&[&class, &name, &field]))
            .unwrap();

        let counter = registry.new_of::<Counter>(&[]);
        registry.get_field(&counter, "hits").set(7u32).unwrap();
        let view = registry.call(&this, "GetField", &ptrs(&[&counter, &name])).unwrap();
        assert_eq!(view.get::<u32>().unwrap(), 7);
    }
}
