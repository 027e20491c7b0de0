//! Registration of classes, aliases, bases, fields and methods

use std::any::Any;
use std::sync::Arc;

use tracing::{debug, warn};

use super::class::{
    ClassDescriptor, ConstructorThunk, FieldAccessor, FieldDescriptor, MemberInfo, MethodDecl,
    MethodDescriptor, MethodKey, MethodThunk, ParentEdge, TagList,
};
use super::{inherit, Registry, Tables};
use crate::auto::Capabilities;
use crate::bind::{take_arg, IntoFunction, IntoMethod};
use crate::error::{ReflectError, ReflectResult};
use crate::object::{ObjectPtr, Projection, SharedObject};
use crate::registry::CallInfo;
use crate::types::{TypeIdentity, TypeSignature, TypeSpec};

fn ensure_class(tables: &mut Tables, ty: TypeIdentity) -> &mut ClassDescriptor {
    tables
        .classes
        .entry(ty.hash())
        .or_insert_with(|| ClassDescriptor::new(ty))
}

fn merge_tags(into: &mut TagList, tags: TagList) {
    for (key, values) in tags {
        into.entry(key).or_default().extend(values);
    }
}

impl Registry {
    /// Register a native class
    ///
    /// Its constructor default-constructs a `T`, then runs the reflected
    /// `__ctor` with the supplied arguments when one is registered.
    pub fn register_class<T: Any + Default + Send>(&self, tags: TagList) -> TypeIdentity {
        let ty = TypeIdentity::of::<T>();
        let ctor: ConstructorThunk = Arc::new(|registry: &Registry, args: &[ObjectPtr]| {
            let obj = SharedObject::new(T::default());
            registry.attach_finalizer(&obj);
            registry.run_ctor(&obj, args)?;
            Ok(obj)
        });
        self.register_class_with(ty, ctor, tags);
        ty
    }

    /// Register a native class and make it constructible under `name`
    pub fn register_class_as<T: Any + Default + Send>(
        &self,
        name: &str,
        tags: TagList,
    ) -> TypeIdentity {
        let ty = self.register_class::<T>(tags);
        if name != ty.name() {
            if let Err(err) = self.alias_class(name, ty) {
                self.report(err);
            }
        }
        ty
    }

    /// Register a class under an explicit identity and constructor
    pub fn register_class_with(&self, ty: TypeIdentity, ctor: ConstructorThunk, tags: TagList) {
        let previous = {
            let mut tables = self.tables().write();
            let class = ensure_class(&mut tables, ty);
            merge_tags(&mut class.tags, tags);
            class.ctor.replace(ctor)
        };
        drop(previous);
        debug!("Registered class: {}", ty.name());
    }

    /// Register a class that exists only by name
    pub fn register_virtual_class<F>(&self, name: &str, ctor: F, tags: TagList) -> TypeIdentity
    where
        F: Fn(&Registry, &[ObjectPtr]) -> ReflectResult<SharedObject> + Send + Sync + 'static,
    {
        let ty = TypeIdentity::raw(name);
        self.register_class_with(ty, Arc::new(ctor), tags);
        ty
    }

    /// Redirect `alias` to `target`
    ///
    /// Chains are followed at lookup time. An alias that would close a
    /// loop is rejected with [`ReflectError::AliasCycle`].
    pub fn alias_class(&self, alias: &str, target: TypeIdentity) -> ReflectResult<()> {
        let alias_ty = TypeIdentity::raw(alias);
        let mut tables = self.tables().write();
        if inherit::alias_chain_contains(&tables, target, alias_ty) {
            return Err(ReflectError::AliasCycle(alias.to_string()));
        }
        ensure_class(&mut tables, alias_ty).alias_target = Some(target.decay());
        debug!("Registered alias: {} -> {}", alias, target.name());
        Ok(())
    }

    /// Declare `B` as a base of `D`, reached through `cast`
    pub fn declare_inheritance<D: Any, B: Any>(&self, cast: fn(&mut D) -> &mut B) {
        self.declare_inheritance_raw(
            TypeIdentity::of::<D>(),
            TypeIdentity::of::<B>(),
            Projection::field(cast),
        );
    }

    /// Declare a base with an arbitrary cast
    pub fn declare_inheritance_raw(&self, derived: TypeIdentity, base: TypeIdentity, cast: Projection) {
        let mut tables = self.tables().write();
        ensure_class(&mut tables, derived).parents.push(ParentEdge {
            ty: base.decay(),
            cast,
        });
        debug!("Registered inheritance: {} : {}", derived.name(), base.name());
    }

    /// Declare a base between classes that share one representation
    pub fn declare_virtual_inheritance(&self, derived: TypeIdentity, base: TypeIdentity) {
        self.declare_inheritance_raw(derived, base, Projection::identity());
    }

    pub(crate) fn add_capabilities(&self, ty: TypeIdentity, capabilities: Capabilities) {
        let mut tables = self.tables().write();
        ensure_class(&mut tables, ty).capabilities |= capabilities;
    }

    /// Register a field of `T` reached through `get`
    pub fn add_field<T: Any, F: Any>(&self, info: impl Into<MemberInfo>, get: fn(&mut T) -> &mut F) {
        let projection = Projection::field(get);
        let accessor: FieldAccessor = Arc::new(move |instance: &ObjectPtr, _: &[TypeSignature]| {
            Ok(instance.project(&projection, TypeSignature::of::<F>()))
        });
        self.add_field_raw(TypeIdentity::of::<T>(), info, TypeSpec::of::<F>(), accessor);
    }

    /// Register a field with an explicit accessor
    pub fn add_field_raw(
        &self,
        class: TypeIdentity,
        info: impl Into<MemberInfo>,
        ty: TypeSpec,
        accessor: FieldAccessor,
    ) {
        let info = info.into();
        debug!("Registered field: {}::{}", class.name(), info.name);
        let previous = self.tables().write().fields.entry(class.hash()).or_default().insert(
            info.name.clone(),
            FieldDescriptor { info, ty, accessor },
        );
        // a replaced static field may finalize into the registry
        drop(previous);
    }

    /// Register a field shared by every instance of `class`
    pub fn add_static_field(&self, class: TypeIdentity, info: impl Into<MemberInfo>, value: SharedObject) {
        let ty = TypeSpec::from(value.ty());
        let accessor: FieldAccessor =
            Arc::new(move |_: &ObjectPtr, _: &[TypeSignature]| Ok(value.as_ptr()));
        self.add_field_raw(class, info, ty, accessor);
    }

    /// Register a method of `T`
    pub fn add_method<T, M, F>(&self, info: impl Into<MemberInfo>, method: F) -> MethodKey
    where
        T: Any,
        F: IntoMethod<T, M>,
    {
        let decl = MethodDecl::new(info, F::ret(), F::params());
        self.add_method_raw(TypeIdentity::of::<T>(), decl, method.into_thunk())
    }

    /// Register a method of `T` that returns a view into the receiver
    ///
    /// The result aliases the receiver's storage; writes through it land
    /// in the receiver.
    pub fn add_method_ref<T, A, R, F>(&self, info: impl Into<MemberInfo>, get: F) -> MethodKey
    where
        T: Any,
        A: Any + Clone + Send + Sync,
        R: Any,
        F: for<'a> Fn(&'a mut T, A) -> Option<&'a mut R> + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let thunk: MethodThunk = Arc::new(move |call: &CallInfo<'_>| {
            let mut index = 0;
            let arg: A = take_arg(call.args, &mut index)?;
            let get = get.clone();
            let projection = Projection::new(move |value| {
                value
                    .downcast_mut::<T>()
                    .and_then(|this| (*get)(this, arg.clone()))
                    .map(|part| part as &mut dyn Any)
            });
            let view = call
                .this
                .project(&projection, TypeSignature::new(TypeIdentity::of_mut::<R>()));
            Ok(SharedObject::alias(view))
        });
        let decl = MethodDecl::new(
            info,
            TypeSpec::of_mut::<R>(),
            vec![crate::bind::arg_spec::<A>()],
        );
        self.add_method_raw(TypeIdentity::of::<T>(), decl, thunk)
    }

    /// Register a free function as a static method of `class`
    pub fn add_static_method<M, F>(
        &self,
        class: TypeIdentity,
        info: impl Into<MemberInfo>,
        function: F,
    ) -> MethodKey
    where
        F: IntoFunction<M>,
    {
        let decl = MethodDecl::new(info, F::ret(), F::params()).into_static();
        self.add_method_raw(class, decl, function.into_thunk())
    }

    /// Register a method body under an explicit declaration
    ///
    /// A declaration identical to an existing overload is reported as a
    /// duplicate and still appended; resolution keeps picking the earlier one.
    pub fn add_method_raw(&self, class: TypeIdentity, decl: MethodDecl, thunk: MethodThunk) -> MethodKey {
        self.insert_method(class, decl, thunk, false)
    }

    /// Like [`Registry::add_method_raw`], but replaces an identical overload
    pub fn override_method_raw(&self, class: TypeIdentity, decl: MethodDecl, thunk: MethodThunk) -> MethodKey {
        self.insert_method(class, decl, thunk, true)
    }

    fn insert_method(
        &self,
        class: TypeIdentity,
        decl: MethodDecl,
        thunk: MethodThunk,
        override_previous: bool,
    ) -> MethodKey {
        let class = class.decay();
        let name = decl.info.name.clone();
        let mut duplicate = None;
        let mut replaced = None;
        let key = {
            let mut tables = self.tables().write();
            let Tables {
                methods, overloads, ..
            } = &mut *tables;
            let keys = overloads
                .entry(class.hash())
                .or_default()
                .entry(name.clone())
                .or_default();

            let existing = keys
                .iter()
                .copied()
                .find(|key| methods.get(*key).is_some_and(|m| m.decl.same_declaration(&decl)));

            match existing {
                Some(key) if override_previous => {
                    debug!("Overrode method: {}", decl.describe(class));
                    if let Some(slot) = methods.get_mut(key) {
                        replaced = Some(std::mem::replace(slot, MethodDescriptor { class, decl, thunk }));
                    }
                    key
                }
                found => {
                    if found.is_some() {
                        duplicate = Some(decl.describe(class));
                    } else {
                        debug!("Registered method: {}", decl.describe(class));
                    }
                    let key = methods.insert(MethodDescriptor { class, decl, thunk });
                    keys.push(key);
                    key
                }
            }
        };
        drop(replaced);

        if let Some(signature) = duplicate {
            warn!("Duplicate method registration: {}", signature);
            self.report(ReflectError::DuplicateMethod { signature });
        }
        key
    }
}
