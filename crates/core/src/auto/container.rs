//! Sequence and string-keyed map registration

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::cursor::{self, Cursor};
use super::Capabilities;
use crate::bind::{arg_spec, take_arg};
use crate::format;
use crate::meta::MetaMethod;
use crate::object::{ObjectPtr, Projection, SharedObject};
use crate::registry::{CallInfo, MethodDecl, MethodThunk, Registry, TagList};
use crate::types::{TypeIdentity, TypeSignature, TypeSpec};

type Map<V> = BTreeMap<String, V>;

fn element_view<V: Any>(container: &ObjectPtr, index: usize) -> ObjectPtr {
    let projection = Projection::new(move |value| {
        value
            .downcast_mut::<Vec<V>>()
            .and_then(|items| items.get_mut(index))
            .map(|item| item as &mut dyn Any)
    });
    container.project(&projection, TypeSignature::new(TypeIdentity::of_mut::<V>()))
}

fn entry_view<V: Any>(container: &ObjectPtr, key: String) -> ObjectPtr {
    let projection = Projection::new(move |value| {
        value
            .downcast_mut::<Map<V>>()
            .and_then(|entries| entries.get_mut(&key))
            .map(|item| item as &mut dyn Any)
    });
    container.project(&projection, TypeSignature::new(TypeIdentity::of_mut::<V>()))
}

fn raw<F>(registry: &Registry, class: TypeIdentity, name: MetaMethod, ret: TypeSpec, params: Vec<TypeSpec>, body: F)
where
    F: Fn(&CallInfo<'_>) -> crate::error::ReflectResult<SharedObject> + Send + Sync + 'static,
{
    let thunk: MethodThunk = Arc::new(body);
    registry.add_method_raw(class, MethodDecl::new(name, ret, params), thunk);
}

/// Register `Vec<V>` with its container methods, cursors and printer
pub fn register_vec<V>(registry: &Registry) -> TypeIdentity
where
    V: Any + Clone + Send + Sync,
{
    let ty = registry.register_class::<Vec<V>>(TagList::new());
    cursor::register(registry);

    registry.add_method("push_back", |v: &mut Vec<V>, item: V| v.push(item));
    registry.add_method("pop_back", |v: &mut Vec<V>| {
        v.pop();
    });
    registry.add_method("size", |v: &Vec<V>| v.len());
    registry.add_method("clear", |v: &mut Vec<V>| v.clear());
    registry.add_method("erase", |v: &mut Vec<V>, index: usize| {
        if index < v.len() {
            v.remove(index);
            true
        } else {
            false
        }
    });
    registry.add_method(MetaMethod::Copy, |v: &Vec<V>| v.clone());
    registry.add_method_ref::<Vec<V>, usize, V, _>(MetaMethod::Index, |v, index| v.get_mut(index));
    registry.add_method_ref::<Vec<V>, usize, V, _>("at", |v, index| v.get_mut(index));

    raw(registry, ty, MetaMethod::Begin, TypeSpec::of::<Cursor>(), Vec::new(), |call| {
        Ok(SharedObject::new(Cursor::new(call.this.clone(), None, 0)))
    });
    raw(registry, ty, MetaMethod::End, TypeSpec::of::<Cursor>(), Vec::new(), |call| {
        let len = call.this.with(|v: &Vec<V>| v.len())?;
        Ok(SharedObject::new(Cursor::new(call.this.clone(), None, len)))
    });
    raw(registry, ty, MetaMethod::ToString, TypeSpec::of::<String>(), Vec::new(), |call| {
        let len = call.this.with(|v: &Vec<V>| v.len())?;
        let items = (0..len).map(|i| format::element(call.registry, &element_view::<V>(call.this, i)));
        Ok(SharedObject::new(format::sequence(items)))
    });

    registry.add_capabilities(
        ty,
        Capabilities::CONTAINER | Capabilities::INDEX | Capabilities::ITERATE | Capabilities::COPY | Capabilities::DISPLAY,
    );
    ty
}

/// Register `BTreeMap<String, V>` with its container methods, cursors and printer
///
/// Indexing a missing key inserts a default value first.
pub fn register_map<V>(registry: &Registry) -> TypeIdentity
where
    V: Any + Clone + Default + Send + Sync,
{
    let ty = registry.register_class::<Map<V>>(TagList::new());
    cursor::register(registry);

    registry.add_method("insert", |m: &mut Map<V>, key: String, value: V| {
        m.insert(key, value);
    });
    registry.add_method("erase", |m: &mut Map<V>, key: String| m.remove(&key).is_some());
    registry.add_method("contains", |m: &Map<V>, key: String| m.contains_key(&key));
    registry.add_method("size", |m: &Map<V>| m.len());
    registry.add_method("keys", |m: &Map<V>| m.keys().cloned().collect::<Vec<String>>());
    registry.add_method("clear", |m: &mut Map<V>| m.clear());
    registry.add_method(MetaMethod::Copy, |m: &Map<V>| m.clone());
    registry.add_method_ref::<Map<V>, String, V, _>("find", |m, key| m.get_mut(&key));

    raw(
        registry,
        ty,
        MetaMethod::Index,
        TypeSpec::of_mut::<V>(),
        vec![arg_spec::<String>()],
        |call| {
            let mut i = 0;
            let key: String = take_arg(call.args, &mut i)?;
            call.this.with_mut(|m: &mut Map<V>| {
                m.entry(key.clone()).or_default();
            })?;
            Ok(SharedObject::alias(entry_view::<V>(call.this, key)))
        },
    );
    raw(registry, ty, MetaMethod::Begin, TypeSpec::of::<Cursor>(), Vec::new(), |call| {
        let keys: Arc<[String]> = call.this.with(|m: &Map<V>| m.keys().cloned().collect())?;
        Ok(SharedObject::new(Cursor::new(call.this.clone(), Some(keys), 0)))
    });
    raw(registry, ty, MetaMethod::End, TypeSpec::of::<Cursor>(), Vec::new(), |call| {
        let keys: Arc<[String]> = call.this.with(|m: &Map<V>| m.keys().cloned().collect())?;
        let len = keys.len();
        Ok(SharedObject::new(Cursor::new(call.this.clone(), Some(keys), len)))
    });
    raw(registry, ty, MetaMethod::ToString, TypeSpec::of::<String>(), Vec::new(), |call| {
        let keys: Vec<String> = call.this.with(|m: &Map<V>| m.keys().cloned().collect())?;
        let config = call.registry.config();
        let entries = keys.into_iter().map(|key| {
            let value = format::element(call.registry, &entry_view::<V>(call.this, key.clone()));
            (key, value)
        });
        Ok(SharedObject::new(format::mapping(entries, &config.json)))
    });

    registry.add_capabilities(
        ty,
        Capabilities::CONTAINER | Capabilities::INDEX | Capabilities::ITERATE | Capabilities::COPY | Capabilities::DISPLAY,
    );
    ty
}
