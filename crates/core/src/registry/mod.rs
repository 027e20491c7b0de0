//! Class registry and invocation engine
//!
//! The registry owns, per type, a class descriptor, a field table and
//! the overload sets of its methods. Registration fills the tables;
//! lookups walk the inheritance graph breadth-first and resolve overloads
//! against runtime argument types.
//!
//! Table locks are only held while reading or writing descriptors. Method
//! bodies, constructors and field accessors always run unlocked, so they
//! may freely call back into the registry.

mod class;
mod diagnostics;
mod export;
mod inherit;
mod invoke;
mod register;
mod resolve;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use slotmap::SlotMap;

pub use class::{
    CallInfo, ClassDescriptor, ConstructorThunk, FieldAccessor, FieldDescriptor, MemberInfo,
    MethodDecl, MethodDescriptor, MethodKey, MethodThunk, TagList,
};
pub use diagnostics::Diagnostics;
pub use export::{DynField, DynMethod};
pub use invoke::InvokeOptions;

use crate::auto::Capabilities;
use crate::config::ReflectConfig;
use crate::types::TypeIdentity;

pub(crate) use class::ParentEdge;
pub(crate) use export::export_registry;

#[derive(Default)]
pub(crate) struct Tables {
    classes: HashMap<u64, ClassDescriptor>,
    fields: HashMap<u64, HashMap<String, FieldDescriptor>>,
    methods: SlotMap<MethodKey, MethodDescriptor>,
    overloads: HashMap<u64, HashMap<String, Vec<MethodKey>>>,
}

impl Tables {
    fn overload_keys(&self, class: u64, name: &str) -> Option<&[MethodKey]> {
        self.overloads
            .get(&class)
            .and_then(|by_name| by_name.get(name))
            .map(Vec::as_slice)
    }
}

struct Inner {
    tables: RwLock<Tables>,
    config: RwLock<ReflectConfig>,
    diagnostics: Diagnostics,
}

/// Handle to a reflection registry
///
/// Cheap to clone; all clones share the same tables. Build a fresh one
/// per test, or install a process-wide one through [`crate::global`].
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

/// Non-owning registry handle, used by finalizers
#[derive(Clone)]
pub(crate) struct WeakRegistry {
    inner: Weak<Inner>,
}

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Option<Registry> {
        self.inner.upgrade().map(|inner| Registry { inner })
    }
}

impl Registry {
    /// An empty registry with the default config
    pub fn new() -> Self {
        Self::with_config(ReflectConfig::default())
    }

    pub fn with_config(config: ReflectConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                config: RwLock::new(config),
                diagnostics: Diagnostics::new(),
            }),
        }
    }

    /// A registry preloaded with the built-in types
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::builtins::init(&registry);
        registry
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn tables(&self) -> &RwLock<Tables> {
        &self.inner.tables
    }

    /// Snapshot of the current config
    pub fn config(&self) -> ReflectConfig {
        self.inner.config.read().clone()
    }

    pub fn set_config(&self, config: ReflectConfig) {
        *self.inner.config.write() = config;
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// Write to the error stream
    pub fn report(&self, message: impl fmt::Display) {
        let config = self.inner.config.read();
        self.inner.diagnostics.report(&config, message);
    }

    /// Whether both handles refer to the same registry
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether a descriptor exists under this identity (aliases included)
    pub fn has_class(&self, ty: TypeIdentity) -> bool {
        self.tables().read().classes.contains_key(&ty.hash())
    }

    /// Descriptor at the end of the alias chain
    pub fn class(&self, ty: TypeIdentity) -> Option<ClassDescriptor> {
        let tables = self.tables().read();
        let canonical = inherit::resolve_alias(&tables, ty).ok()?;
        tables.classes.get(&canonical.hash()).cloned()
    }

    /// Names of every registered class and alias, sorted
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .tables()
            .read()
            .classes
            .values()
            .map(ClassDescriptor::name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Overloads declared directly on a class (not inherited), in registration order
    pub fn methods_of(&self, ty: TypeIdentity) -> Vec<MethodDescriptor> {
        let tables = self.tables().read();
        let Some(by_name) = tables.overloads.get(&ty.hash()) else {
            return Vec::new();
        };
        let mut names: Vec<&String> = by_name.keys().collect();
        names.sort();
        names
            .into_iter()
            .flat_map(|name| by_name[name].iter())
            .filter_map(|key| tables.methods.get(*key).cloned())
            .collect()
    }

    /// Fields declared directly on a class, sorted by name
    pub fn fields_of(&self, ty: TypeIdentity) -> Vec<FieldDescriptor> {
        let tables = self.tables().read();
        let mut fields: Vec<_> = tables
            .fields
            .get(&ty.hash())
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default();
        fields.sort_by(|a: &FieldDescriptor, b| a.name().cmp(b.name()));
        fields
    }

    /// Stored descriptor for a method key
    pub fn method_info(&self, key: MethodKey) -> Option<MethodDescriptor> {
        self.tables().read().methods.get(key).cloned()
    }

    /// Capability groups recorded by auto-registration
    pub fn capabilities(&self, ty: TypeIdentity) -> Capabilities {
        self.class(ty)
            .map(|class| class.capabilities)
            .unwrap_or_else(Capabilities::empty)
    }

    /// Tags of a class
    pub fn class_tags(&self, ty: TypeIdentity) -> Option<TagList> {
        self.class(ty).map(|class| class.tags)
    }

    /// Tags of a field, found through the inheritance walk
    pub fn field_tags(&self, ty: TypeIdentity, name: &str) -> Option<TagList> {
        let tables = self.tables().read();
        inherit::walk(&tables, ty, |hash| {
            tables
                .fields
                .get(&hash)
                .and_then(|by_name| by_name.get(name))
                .map(|field| field.info.tags.clone())
        })
        .map(|(tags, _)| tags)
    }

    /// Tags of a method
    ///
    /// Without argument types the first overload found wins; with them the
    /// overload that resolution would pick.
    pub fn method_tags(
        &self,
        ty: TypeIdentity,
        name: &str,
        args: Option<&[crate::types::TypeSignature]>,
    ) -> Option<TagList> {
        let tables = self.tables().read();
        let key = match args {
            Some(args) => resolve::find_method(&tables, ty, name, args, &[], &[])
                .ok()
                .map(|found| found.key),
            None => inherit::walk(&tables, ty, |hash| {
                tables.overload_keys(hash, name).and_then(|keys| keys.first().copied())
            })
            .map(|(key, _)| key),
        }?;
        tables.methods.get(key).map(|m| m.decl.info.tags.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables().read();
        f.debug_struct("Registry")
            .field("classes", &tables.classes.len())
            .field("methods", &tables.methods.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::object::{ObjectPtr, SharedObject};

    #[derive(Debug, Default, Clone)]
    struct Probe;

    #[test]
    fn test_overload_choice_is_stable() {
        let registry = Registry::new();
        registry.register_class::<Probe>(TagList::new());
        registry.add_method("pick", |_: &Probe, _: ObjectPtr| "any".to_string());
        registry.add_method("pick", |_: &Probe, _: i32| "i32".to_string());
        registry.add_method("pick", |_: &Probe, _: f64| "f64".to_string());

        let probe = SharedObject::new(Probe);
        let pick = |arg: SharedObject| {
            registry
                .call(&probe, "pick", &[arg.as_ptr()])
                .unwrap()
                .get::<String>()
                .unwrap()
        };
        for _ in 0..3 {
            assert_eq!(pick(SharedObject::new(1i32)), "i32");
            assert_eq!(pick(SharedObject::new(1.0f64)), "f64");
            // both numeric overloads convert; the earlier one wins
            assert_eq!(pick(SharedObject::new(1.0f32)), "i32");
            assert_eq!(pick(SharedObject::new(String::from("s"))), "any");
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Deep {
        f: i32,
    }

    #[derive(Debug, Default, Clone)]
    struct Base1 {
        deep: Deep,
        g: i32,
    }

    #[derive(Debug, Default, Clone)]
    struct Base2 {
        f: i32,
        g: i32,
    }

    #[derive(Debug, Default, Clone)]
    struct Derived {
        b1: Base1,
        b2: Base2,
    }

    fn deep_f(v: &mut Deep) -> &mut i32 {
        &mut v.f
    }
    fn base1_g(v: &mut Base1) -> &mut i32 {
        &mut v.g
    }
    fn base1_deep(v: &mut Base1) -> &mut Deep {
        &mut v.deep
    }
    fn base2_f(v: &mut Base2) -> &mut i32 {
        &mut v.f
    }
    fn base2_g(v: &mut Base2) -> &mut i32 {
        &mut v.g
    }
    fn derived_b1(v: &mut Derived) -> &mut Base1 {
        &mut v.b1
    }
    fn derived_b2(v: &mut Derived) -> &mut Base2 {
        &mut v.b2
    }

    #[test]
    fn test_shallowest_member_wins() {
        let registry = Registry::new();
        registry.register_class::<Derived>(TagList::new());
        registry.declare_inheritance::<Derived, Base1>(derived_b1);
        registry.declare_inheritance::<Derived, Base2>(derived_b2);
        registry.declare_inheritance::<Base1, Deep>(base1_deep);
        registry.add_field("f", deep_f);
        registry.add_field("g", base1_g);
        registry.add_field("f", base2_f);
        registry.add_field("g", base2_g);

        let obj = registry.new_of::<Derived>(&[]);
        registry.get_field(&obj, "f").set(7i32).unwrap();
        registry.get_field(&obj, "g").set(9i32).unwrap();

        let value = obj.get::<Derived>().unwrap();
        assert_eq!(value.b2.f, 7);
        assert_eq!(value.b1.deep.f, 0);
        assert_eq!(value.b1.g, 9);
        assert_eq!(value.b2.g, 0);
    }

    #[test]
    fn test_alias_chain_constructs_target() {
        let registry = Registry::new();
        registry.alias_class("A", TypeIdentity::raw("B")).unwrap();
        registry.alias_class("B", TypeIdentity::of::<Probe>()).unwrap();
        registry.register_class::<Probe>(TagList::new());

        let made = registry.new_by_name("A", &[]);
        assert!(made.is::<Probe>());

        let err = registry.alias_class("B", TypeIdentity::raw("A"));
        assert!(matches!(err, Err(crate::error::ReflectError::AliasCycle(_))));
    }

    macro_rules! accepts_every_kind {
        ($registry:expr, $target:ty; $($source:ty),*) => {
            $(
                for sample in [0 as $source, 1 as $source] {
                    let arg = SharedObject::new(sample);
                    let out = $registry.call_static(
                        TypeIdentity::raw("conv"),
                        std::any::type_name::<$target>(),
                        &[arg.as_ptr()],
                    );
                    assert_eq!(out.unwrap().get::<$target>().unwrap(), sample as $target);
                }
            )*
        };
    }

    #[test]
    fn test_numeric_arguments_convert() {
        let registry = Registry::new();
        let conv = TypeIdentity::raw("conv");
        registry.add_static_method(conv, "f64", |x: f64| x);
        registry.add_static_method(conv, "i8", |x: i8| x);
        registry.add_static_method(conv, "u64", |x: u64| x);

        accepts_every_kind!(registry, f64; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32);
        accepts_every_kind!(registry, i8; i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
        accepts_every_kind!(registry, u64; i8, i16, i32, i64, isize, u8, u16, u32, usize, f32, f64);

        let minus_one = SharedObject::new(-1i32);
        let out = registry.call_static(conv, "f64", &[minus_one.as_ptr()]).unwrap();
        assert_eq!(out.get::<f64>().unwrap(), -1.0);
    }

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Default)]
    struct Tracked;

    #[test]
    fn test_destructor_runs_once_after_last_copy() {
        let registry = Registry::new();
        registry.register_class::<Tracked>(TagList::new());
        registry.add_method(crate::meta::MetaMethod::Dtor, |_: &mut Tracked| {
            DROPS.fetch_add(1, Ordering::SeqCst);
        });

        let original = registry.new_of::<Tracked>(&[]);
        let copies: Vec<SharedObject> = (0..5).map(|_| original.clone()).collect();
        assert_eq!(original.use_count(), 6);
        drop(original);
        for copy in copies {
            assert_eq!(DROPS.load(Ordering::SeqCst), 0);
            drop(copy);
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_field_views_write_through() {
        let registry = Registry::new();
        registry.register_class::<Base2>(TagList::new());
        registry.add_field("f", base2_f);

        let obj = registry.new_of::<Base2>(&[]);
        registry.get_field(&obj, "f").set(11i32).unwrap();
        assert_eq!(registry.get_field(&obj, "f").get::<i32>().unwrap(), 11);
        assert_eq!(obj.get::<Base2>().unwrap().f, 11);
    }

    #[test]
    fn test_missing_member_is_soft() {
        let registry = Registry::new();
        registry.register_class::<Probe>(TagList::new());
        registry.add_method("ok", |_: &Probe| 1i32);
        let probe = SharedObject::new(Probe);

        assert!(registry.invoke(&probe, "nope", &[]).is_null());
        assert!(registry.diagnostics().last().unwrap().contains("nope"));
        assert!(registry.get_field(&probe, "nope").is_null());
        assert!(registry.try_invoke(&probe, "nope", &[]).is_null());

        assert_eq!(registry.invoke(&probe, "ok", &[]).get::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_is_flagged_and_first_wins() {
        let registry = Registry::new();
        registry.add_method("v", |_: &Probe| 1i32);
        registry.add_method("v", |_: &Probe| 2i32);
        let last = registry.diagnostics().last().unwrap();
        assert!(last.contains("same type of function already registered"));

        let probe = SharedObject::new(Probe);
        assert_eq!(registry.invoke(&probe, "v", &[]).get::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_static_calls_only_reach_static_methods() {
        let registry = Registry::new();
        let ty = registry.register_class::<Probe>(TagList::new());
        registry.add_method("member", |_: &Probe| 1i32);
        registry.add_static_method(ty, "shared", || 2i32);

        assert!(matches!(
            registry.call_static(ty, "member", &[]),
            Err(crate::error::ReflectError::NotStatic { .. })
        ));
        assert!(registry.invoke_static(ty, "member", &[]).is_null());
        assert_eq!(registry.invoke_static(ty, "shared", &[]).get::<i32>().unwrap(), 2);

        let probe = SharedObject::new(Probe);
        assert_eq!(registry.invoke(&probe, "member", &[]).get::<i32>().unwrap(), 1);
        assert_eq!(registry.invoke(&probe, "shared", &[]).get::<i32>().unwrap(), 2);
    }

    #[test]
    fn test_method_keys_address_descriptors() {
        let registry = Registry::new();
        let key = registry.add_method("v", |_: &Probe, _: i32| 1i32);
        let method = registry.method_info(key).unwrap();
        assert_eq!(method.name(), "v");
        assert_eq!(method.class(), TypeIdentity::of::<Probe>());
    }

    #[derive(Default)]
    struct Holder {
        items: Vec<SharedObject>,
    }

    fn holder_registry() -> Registry {
        use crate::error::ReflectError;
        use crate::types::TypeSpec;

        let registry = Registry::with_builtins();
        let ty = registry.register_class::<Holder>(TagList::new());
        registry.add_method_raw(
            ty,
            MethodDecl::new("put", TypeSpec::void(), vec![TypeSpec::class_arg(0)]),
            Arc::new(|call: &CallInfo<'_>| {
                let item = call.args[0].to_shared();
                call.this.with_mut(|holder: &mut Holder| holder.items.push(item))?;
                Ok(SharedObject::null())
            }),
        );
        registry.add_method_raw(
            ty,
            MethodDecl::new("first", TypeSpec::class_arg(0), Vec::new()),
            Arc::new(|call: &CallInfo<'_>| {
                call.this
                    .with(|holder: &Holder| holder.items.first().cloned().unwrap_or_default())
            }),
        );
        registry.add_method_raw(
            ty,
            MethodDecl::new("make", TypeSpec::func_arg(0), Vec::new()),
            Arc::new(|call: &CallInfo<'_>| {
                let target = call.func_args.first().ok_or(ReflectError::NullValue)?;
                Ok(call.registry.new_object(target.base, &[]))
            }),
        );
        registry.add_method_raw(
            ty,
            MethodDecl::new("same", TypeSpec::func_arg(0), vec![TypeSpec::func_arg(0)]),
            Arc::new(|call: &CallInfo<'_>| Ok(call.args[0].to_shared())),
        );
        registry
    }

    #[test]
    fn test_class_args_bind_parameters_and_results() {
        use crate::error::ReflectError;
        use crate::types::TypeSignature;

        let registry = holder_registry();
        let holder = registry.new_generic(
            TypeIdentity::of::<Holder>(),
            &[],
            vec![TypeSignature::of::<i32>()],
        );
        assert_eq!(holder.ty().args, vec![TypeSignature::of::<i32>()]);

        let seven = SharedObject::new(7i32);
        assert!(registry.call(&holder, "put", &[seven.as_ptr()]).is_ok());
        let wide = SharedObject::new(7i64);
        assert!(matches!(
            registry.call(&holder, "put", &[wide.as_ptr()]),
            Err(ReflectError::NoMatchingOverload { .. })
        ));

        let first = registry.call(&holder, "first", &[]).unwrap();
        assert!(first.is::<i32>());
        assert_eq!(first.get::<i32>().unwrap(), 7);

        // Without class arguments the slot is open
        let open = registry.new_of::<Holder>(&[]);
        let text = SharedObject::new(String::from("any"));
        assert!(registry.call(&open, "put", &[text.as_ptr()]).is_ok());
    }

    #[test]
    fn test_func_args_bind_parameters_and_results() {
        use crate::types::TypeSignature;

        let registry = holder_registry();
        let holder = registry.new_of::<Holder>(&[]);
        let options = InvokeOptions::default().with_func_args(vec![TypeSignature::of::<f64>()]);

        let made = registry.invoke_with(&holder, "make", &[], &options);
        assert!(made.is::<f64>());
        assert_eq!(made.get::<f64>().unwrap(), 0.0);

        let made = registry
            .call_generic(&holder, "make", &[], &[TypeSignature::of::<u8>()])
            .unwrap();
        assert!(made.is::<u8>());

        let half = SharedObject::new(0.5f64);
        let same = registry.invoke_with(&holder, "same", &[half.as_ptr()], &options);
        assert_eq!(same.get::<f64>().unwrap(), 0.5);

        let text = SharedObject::new(String::from("x"));
        assert!(registry
            .invoke_with(&holder, "same", &[text.as_ptr()], &options)
            .is_null());
        assert!(registry
            .diagnostics()
            .last()
            .is_some_and(|line| line.contains("no matching method found")));
    }
}
