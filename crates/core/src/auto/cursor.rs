//! Cursors over registered containers

use std::sync::Arc;

use crate::bind::take_arg;
use crate::meta::MetaMethod;
use crate::object::{ObjectPtr, SharedObject};
use crate::registry::{CallInfo, MethodDecl, MethodThunk, Registry, TagList};
use crate::types::{TypeIdentity, TypeSpec};

/// A position inside a container
///
/// Sequences are walked by index. Maps are walked over a snapshot of
/// their keys taken when the cursor was created.
#[derive(Clone, Default)]
pub struct Cursor {
    container: ObjectPtr,
    keys: Option<Arc<[String]>>,
    position: usize,
}

impl Cursor {
    pub fn new(container: ObjectPtr, keys: Option<Arc<[String]>>, position: usize) -> Self {
        Self {
            container,
            keys,
            position,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Key under the cursor, for map cursors
    pub fn key(&self) -> Option<&str> {
        self.keys
            .as_ref()
            .and_then(|keys| keys.get(self.position))
            .map(String::as_str)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn retreat(&mut self) {
        self.position = self.position.saturating_sub(1);
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("container", self.container.ty())
            .field("position", &self.position)
            .finish()
    }
}

fn indirection(call: &CallInfo<'_>) -> crate::error::ReflectResult<SharedObject> {
    let cursor: Cursor = call.this.get()?;
    let index = match cursor.key() {
        Some(key) => SharedObject::new(key.to_string()),
        None => SharedObject::new(cursor.position),
    };
    call.registry
        .call(&cursor.container, MetaMethod::Index.name(), &[index.as_ptr()])
}

/// Register the cursor class once per registry
pub(crate) fn register(registry: &Registry) {
    let ty = TypeIdentity::of::<Cursor>();
    if registry.has_class(ty) {
        return;
    }
    registry.register_class::<Cursor>(TagList::new());

    registry.add_method(MetaMethod::Ne, |a: &Cursor, b: Cursor| a.position != b.position);
    registry.add_method(MetaMethod::Eq, |a: &Cursor, b: Cursor| a.position == b.position);
    registry.add_method(MetaMethod::Inc, |c: &mut Cursor| {
        c.advance();
        c.clone()
    });
    registry.add_method(MetaMethod::Inc, |c: &mut Cursor, _: i32| {
        let old = c.clone();
        c.advance();
        old
    });
    registry.add_method(MetaMethod::Dec, |c: &mut Cursor| {
        c.retreat();
        c.clone()
    });
    registry.add_method(MetaMethod::Dec, |c: &mut Cursor, _: i32| {
        let old = c.clone();
        c.retreat();
        old
    });
    registry.add_method("key", |c: &Cursor| c.key().unwrap_or_default().to_string());
    registry.add_method(MetaMethod::ToString, |c: &Cursor| format!("<cursor {}>", c.position));

    let deref: MethodThunk = Arc::new(indirection);
    registry.add_method_raw(
        ty,
        MethodDecl::new(MetaMethod::Deref, TypeSpec::any(), Vec::new()),
        deref,
    );
    // `advance(n)` moves several steps at once
    let advance: MethodThunk = Arc::new(|call: &CallInfo<'_>| {
        let mut i = 0;
        let steps: usize = take_arg(call.args, &mut i)?;
        call.this.with_mut(|c: &mut Cursor| c.position += steps)?;
        Ok(SharedObject::null())
    });
    registry.add_method_raw(
        ty,
        MethodDecl::new("advance", TypeSpec::void(), vec![TypeSpec::of::<usize>()]),
        advance,
    );
}
