//! Construction, field access and method invocation

use tracing::trace;

use super::class::MethodDescriptor;
use super::{inherit, resolve, CallInfo, Registry};
use crate::error::{ReflectError, ReflectResult};
use crate::meta::MetaMethod;
use crate::object::{ObjectPtr, SharedObject};
use crate::types::{can_convert, TypeIdentity, TypeSignature, TypeSpec};

/// Options for [`Registry::invoke_with`]
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// The call's own generic arguments
    pub func_args: Vec<TypeSignature>,
    /// Report a failed resolution on the diagnostics stream
    pub show_error: bool,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            func_args: Vec::new(),
            show_error: true,
        }
    }
}

impl InvokeOptions {
    pub fn silent() -> Self {
        Self {
            show_error: false,
            ..Self::default()
        }
    }

    pub fn with_func_args(mut self, func_args: Vec<TypeSignature>) -> Self {
        self.func_args = func_args;
        self
    }
}

/// Strip reference and const spellings from a class name
fn decay_name(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix("const ").unwrap_or(name);
    let name = name
        .strip_prefix("&mut ")
        .or_else(|| name.strip_prefix('&'))
        .unwrap_or(name);
    name.strip_suffix('&').unwrap_or(name).trim()
}

impl Registry {
    /// Construct an instance, failing loudly
    pub fn try_new(&self, ty: TypeIdentity, args: &[ObjectPtr]) -> ReflectResult<SharedObject> {
        let ctor = {
            let tables = self.tables().read();
            let canonical = inherit::resolve_alias(&tables, ty)?;
            tables
                .classes
                .get(&canonical.hash())
                .and_then(|class| class.ctor.clone())
        }
        .ok_or_else(|| ReflectError::UnregisteredClass(ty.name().to_string()))?;
        trace!("constructing {}", ty.name());
        ctor(self, args)
    }

    /// Construct an instance; null plus a diagnostic on failure
    pub fn new_object(&self, ty: TypeIdentity, args: &[ObjectPtr]) -> SharedObject {
        self.soft(self.try_new(ty, args))
    }

    /// Construct a `T` through its registered constructor
    pub fn new_of<T: 'static>(&self, args: &[ObjectPtr]) -> SharedObject {
        self.new_object(TypeIdentity::of::<T>(), args)
    }

    /// Construct by registered name; `const ` and `&` spellings are ignored
    pub fn try_new_by_name(&self, name: &str, args: &[ObjectPtr]) -> ReflectResult<SharedObject> {
        self.try_new(TypeIdentity::raw(decay_name(name)), args)
    }

    pub fn new_by_name(&self, name: &str, args: &[ObjectPtr]) -> SharedObject {
        self.soft(self.try_new_by_name(name, args))
    }

    /// Construct and attach generic arguments to the instance
    pub fn new_generic(
        &self,
        ty: TypeIdentity,
        args: &[ObjectPtr],
        generic_args: Vec<TypeSignature>,
    ) -> SharedObject {
        let mut obj = self.new_object(ty, args);
        if !obj.is_null() {
            obj.add_template_args(generic_args);
        }
        obj
    }

    pub(crate) fn run_ctor(&self, obj: &ObjectPtr, args: &[ObjectPtr]) -> ReflectResult<()> {
        match self.call(obj, MetaMethod::Ctor.name(), args) {
            Ok(_) => Ok(()),
            Err(ReflectError::MethodNotFound { .. } | ReflectError::NoMatchingOverload { .. })
                if args.is_empty() =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Make the slot behind `obj` run `__dtor` when its last owner drops
    pub(crate) fn attach_finalizer(&self, obj: &SharedObject) {
        let registry = self.downgrade();
        obj.set_finalizer(Box::new(move |value: &ObjectPtr| {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            match registry.call(value, MetaMethod::Dtor.name(), &[]) {
                Ok(_) | Err(ReflectError::MethodNotFound { .. }) => {}
                Err(err) => registry.report(err),
            }
        }));
    }

    /// Whether `name` resolves anywhere in the hierarchy of `ty`
    pub fn has_method(&self, ty: TypeIdentity, name: &str) -> bool {
        let tables = self.tables().read();
        inherit::walk(&tables, ty, |hash| tables.overload_keys(hash, name).map(|_| ())).is_some()
    }

    /// View of a field, found through the inheritance walk
    pub fn try_get_field(&self, instance: &ObjectPtr, name: &str) -> ReflectResult<ObjectPtr> {
        let (field, cast) = {
            let tables = self.tables().read();
            inherit::walk(&tables, instance.identity(), |hash| {
                tables
                    .fields
                    .get(&hash)
                    .and_then(|by_name| by_name.get(name))
                    .cloned()
            })
        }
        .ok_or_else(|| ReflectError::FieldNotFound {
            class: instance.identity().name().to_string(),
            field: name.to_string(),
        })?;
        let receiver = match &cast {
            Some(cast) => instance.project(cast, instance.ty().clone()),
            None => instance.clone(),
        };
        (field.accessor)(&receiver, &instance.ty().args)
    }

    /// View of a field; null plus a diagnostic when missing
    pub fn get_field(&self, instance: &ObjectPtr, name: &str) -> ObjectPtr {
        match self.try_get_field(instance, name) {
            Ok(field) => field,
            Err(err) => {
                self.report(err);
                ObjectPtr::null()
            }
        }
    }

    pub fn get_static_field(&self, ty: TypeIdentity, name: &str) -> ObjectPtr {
        self.get_field(&ObjectPtr::typed_null(ty), name)
    }

    /// Resolve and invoke a method, failing loudly
    pub fn call(&self, target: &ObjectPtr, name: &str, args: &[ObjectPtr]) -> ReflectResult<SharedObject> {
        self.call_generic(target, name, args, &[])
    }

    /// Resolve and invoke a method with the call's own generic arguments
    ///
    /// A receiver without a value (a static call) only reaches methods
    /// registered as static; an instance may call either kind.
    pub fn call_generic(
        &self,
        target: &ObjectPtr,
        name: &str,
        args: &[ObjectPtr],
        func_args: &[TypeSignature],
    ) -> ReflectResult<SharedObject> {
        let arg_types: Vec<TypeSignature> = args.iter().map(|arg| arg.ty().clone()).collect();
        let class_args = target.ty().args.clone();
        let found = {
            let tables = self.tables().read();
            resolve::find_method(&tables, target.identity(), name, &arg_types, &class_args, func_args)?
        };
        let method = found.method;
        if target.is_null() && !method.decl.is_static {
            return Err(ReflectError::NotStatic {
                class: method.class.name().to_string(),
                method: name.to_string(),
            });
        }

        let receiver = match &found.cast {
            Some(cast) => target.project(cast, TypeSignature::with_args(method.class, class_args.clone())),
            None => target.clone(),
        };
        let holders = convert_args(args, &method.decl.params, &class_args, func_args)?;
        let converted: Vec<ObjectPtr> = holders.iter().map(SharedObject::as_ptr).collect();

        let info = CallInfo {
            registry: self,
            this: &receiver,
            args: &converted,
            class_args: &class_args,
            func_args,
        };
        let result = (method.thunk)(&info)?;
        Ok(self.finish_result(&method, &class_args, func_args, result))
    }

    fn finish_result(
        &self,
        method: &MethodDescriptor,
        class_args: &[TypeSignature],
        func_args: &[TypeSignature],
        mut result: SharedObject,
    ) -> SharedObject {
        if result.is_null() {
            return result;
        }
        if method.decl.ret.is_open() {
            let applied = method.decl.ret.apply_with(class_args, func_args);
            if !applied.base.is_null() {
                let base = result.ty().base;
                result = result.retyped(applied.qualified(base.is_ref(), base.is_const()));
            }
        }
        if result.is_owned()
            && !result.has_finalizer()
            && self.has_method(result.identity(), MetaMethod::Dtor.name())
        {
            self.attach_finalizer(&result);
        }
        result
    }

    /// Invoke a method; null plus a diagnostic on failure
    pub fn invoke(&self, target: &ObjectPtr, name: &str, args: &[ObjectPtr]) -> SharedObject {
        self.invoke_with(target, name, args, &InvokeOptions::default())
    }

    pub fn invoke_with(
        &self,
        target: &ObjectPtr,
        name: &str,
        args: &[ObjectPtr],
        options: &InvokeOptions,
    ) -> SharedObject {
        match self.call_generic(target, name, args, &options.func_args) {
            Ok(result) => result,
            Err(err) => {
                if options.show_error {
                    self.report(err);
                }
                SharedObject::null()
            }
        }
    }

    /// Invoke without reporting failures
    pub fn try_invoke(&self, target: &ObjectPtr, name: &str, args: &[ObjectPtr]) -> SharedObject {
        self.invoke_with(target, name, args, &InvokeOptions::silent())
    }

    /// Invoke a static method of `ty`, failing loudly
    pub fn call_static(&self, ty: TypeIdentity, name: &str, args: &[ObjectPtr]) -> ReflectResult<SharedObject> {
        self.call(&ObjectPtr::typed_null(ty), name, args)
    }

    pub fn invoke_static(&self, ty: TypeIdentity, name: &str, args: &[ObjectPtr]) -> SharedObject {
        self.invoke(&ObjectPtr::typed_null(ty), name, args)
    }

    /// Dispatch an operator to its metamethod
    pub fn operate(&self, target: &ObjectPtr, op: MetaMethod, args: &[ObjectPtr]) -> SharedObject {
        self.invoke(target, op.name(), args)
    }

    pub fn try_operate(&self, target: &ObjectPtr, op: MetaMethod, args: &[ObjectPtr]) -> ReflectResult<SharedObject> {
        self.call(target, op.name(), args)
    }

    /// Print a value through its `__tostring` metamethod
    ///
    /// The null value and views whose owner is gone print as `null`.
    pub fn try_stringify(&self, value: &ObjectPtr) -> ReflectResult<String> {
        if (value.is_null() && value.is_void()) || (!value.is_null() && !value.is_alive()) {
            return Ok("null".to_string());
        }
        self.call(value, MetaMethod::ToString.name(), &[])?.get::<String>()
    }

    /// Print a value; unprintable values render as `<type>` with a diagnostic
    pub fn stringify(&self, value: &ObjectPtr) -> String {
        match self.try_stringify(value) {
            Ok(text) => text,
            Err(err) => {
                self.report(format_args!("unable to print {}: {}", value.ty(), err));
                format!("<{}>", value.ty())
            }
        }
    }

    /// Deep copy through `__copy`
    pub fn copy(&self, value: &ObjectPtr) -> ReflectResult<SharedObject> {
        self.call(value, MetaMethod::Copy.name(), &[])
    }

    /// Walk a value through its `__begin`/`__end` cursors
    ///
    /// Cursors are compared with `__ne`, dereferenced with
    /// `__indirection` and advanced with `__inc`.
    pub fn for_each(
        &self,
        value: &ObjectPtr,
        mut f: impl FnMut(&ObjectPtr) -> ReflectResult<()>,
    ) -> ReflectResult<()> {
        let cursor = self.call(value, MetaMethod::Begin.name(), &[])?;
        let end = self.call(value, MetaMethod::End.name(), &[])?;
        loop {
            let more = self
                .call(&cursor, MetaMethod::Ne.name(), &[end.as_ptr()])?
                .get::<bool>()?;
            if !more {
                return Ok(());
            }
            let item = self.call(&cursor, MetaMethod::Deref.name(), &[])?;
            f(&item)?;
            self.call(&cursor, MetaMethod::Inc.name(), &[])?;
        }
    }

    fn soft(&self, result: ReflectResult<SharedObject>) -> SharedObject {
        match result {
            Ok(obj) => obj,
            Err(err) => {
                self.report(err);
                SharedObject::null()
            }
        }
    }
}

/// Materialize numeric conversions for arguments whose type differs from
/// the matched parameter
fn convert_args(
    args: &[ObjectPtr],
    params: &[TypeSpec],
    class_args: &[TypeSignature],
    func_args: &[TypeSignature],
) -> ReflectResult<Vec<SharedObject>> {
    args.iter()
        .zip(params)
        .map(|(arg, param)| {
            if param.has_wildcard() {
                return Ok(SharedObject::alias(arg.clone()));
            }
            let formal = param.apply_with(class_args, func_args).base;
            let actual = arg.identity();
            if formal.is_null() || formal.hash() == actual.hash() || !can_convert(&actual, &formal) {
                return Ok(SharedObject::alias(arg.clone()));
            }
            let boxed = arg
                .with_any(|value| actual.implicit_convert(value, &formal))?
                .ok_or_else(|| ReflectError::ConversionFailed {
                    from: actual.to_string(),
                    to: formal.to_string(),
                })?;
            trace!("converted argument {} -> {}", actual, formal);
            Ok(SharedObject::from_boxed(TypeSignature::new(formal.decay()), boxed))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_name() {
        assert_eq!(decay_name("Point"), "Point");
        assert_eq!(decay_name("const Point&"), "Point");
        assert_eq!(decay_name("&mut Point"), "Point");
        assert_eq!(decay_name("&Point"), "Point");
        assert_eq!(decay_name(" Point "), "Point");
    }

    #[test]
    fn test_invoke_options() {
        assert!(InvokeOptions::default().show_error);
        assert!(!InvokeOptions::silent().show_error);
        let opts = InvokeOptions::default().with_func_args(vec![TypeSignature::of::<u8>()]);
        assert_eq!(opts.func_args.len(), 1);
    }
}
